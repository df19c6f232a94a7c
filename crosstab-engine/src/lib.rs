//! FILENAME: crosstab-engine/src/lib.rs
//! Cross-tabulation (pivot) engine over flat tagged records.
//!
//! Layers:
//! - `definition`: Field catalog and field assignment (what the crosstab IS)
//! - `cache`: Typed records resolved once per pass (HOW we compute)
//! - `filter`: Allowed-value filters applied before grouping
//! - `engine`: Column hierarchy, row tree and cell aggregation (HOW we calculate)
//! - `view`: Expand state and visible rows for the renderer (WHAT we display)

pub mod definition;
pub mod cache;
pub mod filter;
pub mod engine;
pub mod view;

pub use definition::*;
pub use cache::*;
pub use filter::*;
pub use view::*;
pub use engine::{
    aggregate_records, calculate_crosstab, chart_series, drill_down,
    CellTotals, ChartEntry, ChartValue, ColumnAxis, ColumnGroup, ColumnLeaf,
    ColumnLeafKey, ColumnNode, CrosstabPass, DrillDownResult, EngineOptions,
    GroupId, GroupNode, HeaderCell, RowTree,
};
