//! FILENAME: crosstab-session/src/types.rs
use crosstab_engine::{Area, FieldId};
use serde::{Deserialize, Serialize};

/// Request to move a field into an area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveFieldRequest {
    pub field_id: FieldId,
    /// Destination area; `available` unassigns the field.
    pub target: Area,
    /// Insert position in the destination area (appends when absent).
    pub position: Option<usize>,
}

/// Distinct values of a field, for filter dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUniqueValuesResponse {
    pub field_id: FieldId,
    pub values: Vec<String>,
    pub count: usize,
}

/// One edit of the filter set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FilterChange {
    Allow { field_id: FieldId, value: String },
    Remove { field_id: FieldId, value: String },
    ClearField { field_id: FieldId },
    ClearAll,
}
