//! FILENAME: crosstab-session/src/lib.rs
//! Crosstab session controller.
//!
//! Owns the inputs of one interactive crosstab (catalog, records, field
//! assignment, filters) plus its expand/collapse state, and recomputes the
//! engine output on demand after each mutation.

pub mod logging;
pub mod error;
pub mod config;
pub mod source;
pub mod types;
pub mod session;

pub use config::SessionConfig;
pub use error::SessionError;
pub use session::CrosstabSession;
pub use source::{catalog_from_json_str, records_from_json, records_from_json_str, scalar_from_json};
pub use types::{FieldUniqueValuesResponse, FilterChange, MoveFieldRequest};
