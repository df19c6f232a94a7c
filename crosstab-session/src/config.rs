//! FILENAME: crosstab-session/src/config.rs
//! Session configuration: labels, separators and the optional log file.

use std::path::{Path, PathBuf};

use crosstab_engine::EngineOptions;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Settings for one crosstab session. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Joins a column tuple into its group id.
    pub column_separator: String,

    /// Joins a row tuple into a chart key.
    pub chart_key_separator: String,

    /// Name of the single column group when no column field is assigned.
    pub total_column_label: String,

    pub grand_total_label: String,

    pub subtotal_prefix: String,

    pub detail_suffix: String,

    pub flat_row_prefix: String,

    /// When set, the unified log file is opened here on session creation.
    pub log_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let options = EngineOptions::default();
        SessionConfig {
            column_separator: options.column_separator,
            chart_key_separator: options.chart_key_separator,
            total_column_label: options.total_column_label,
            grand_total_label: options.grand_total_label,
            subtotal_prefix: options.subtotal_prefix,
            detail_suffix: options.detail_suffix,
            flat_row_prefix: options.flat_row_prefix,
            log_file: None,
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let text = std::fs::read_to_string(path)?;
        SessionConfig::from_json_str(&text)
    }

    /// The label/separator subset handed to the engine.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            column_separator: self.column_separator.clone(),
            chart_key_separator: self.chart_key_separator.clone(),
            total_column_label: self.total_column_label.clone(),
            grand_total_label: self.grand_total_label.clone(),
            subtotal_prefix: self.subtotal_prefix.clone(),
            detail_suffix: self.detail_suffix.clone(),
            flat_row_prefix: self.flat_row_prefix.clone(),
        }
    }
}
