//! FILENAME: crosstab-session/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field assigned more than once: {0}")]
    DuplicateField(String),

    #[error("Invalid records payload: {0}")]
    InvalidRecords(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
