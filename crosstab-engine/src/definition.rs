//! FILENAME: crosstab-engine/src/definition.rs
//! Crosstab Definition - The field catalog and the field assignment.
//!
//! This module contains the types that DESCRIBE a crosstab:
//! - Which fields exist and whether they group (dimension) or sum (measure)
//! - Which fields the user placed in the Rows, Columns and Values areas
//!
//! These structures are plain serializable snapshots of user intent. Nothing
//! here touches record data.

use serde::{Deserialize, Serialize};

/// Identifier of a field, as used as the key in every record.
pub type FieldId = String;

// ============================================================================
// FIELD DEFINITIONS
// ============================================================================

/// Whether a field is used for grouping or for summing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Dimension,
    Measure,
}

/// A field of the source data as exposed by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Unique identifier (record key).
    pub id: FieldId,

    /// Display name.
    pub name: String,

    /// Dimension or measure.
    #[serde(alias = "type")]
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(id: impl Into<FieldId>, name: impl Into<String>, kind: FieldKind) -> Self {
        FieldSpec {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }

    pub fn dimension(id: impl Into<FieldId>, name: impl Into<String>) -> Self {
        FieldSpec::new(id, name, FieldKind::Dimension)
    }

    pub fn measure(id: impl Into<FieldId>, name: impl Into<String>) -> Self {
        FieldSpec::new(id, name, FieldKind::Measure)
    }

    pub fn is_measure(&self) -> bool {
        self.kind == FieldKind::Measure
    }
}

// ============================================================================
// FIELD CATALOG (CLASSIFIER)
// ============================================================================

/// The catalog split by field kind, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPartition {
    pub dimensions: Vec<FieldSpec>,
    pub measures: Vec<FieldSpec>,
}

/// The full set of fields known to the data source.
/// Field ids are unique within a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldCatalog {
    fields: Vec<FieldSpec>,
}

impl FieldCatalog {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        FieldCatalog { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks up a field by id.
    pub fn get(&self, id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Partitions the catalog into dimensions and measures.
    pub fn classify(&self) -> FieldPartition {
        let (measures, dimensions): (Vec<FieldSpec>, Vec<FieldSpec>) =
            self.fields.iter().cloned().partition(FieldSpec::is_measure);
        FieldPartition {
            dimensions,
            measures,
        }
    }

    /// Returns the catalog fields that are not placed in any area.
    pub fn unused(&self, assignment: &Assignment) -> Vec<FieldSpec> {
        self.fields
            .iter()
            .filter(|f| assignment.area_of(&f.id).is_none())
            .cloned()
            .collect()
    }
}

// ============================================================================
// ASSIGNMENT
// ============================================================================

/// The areas a field can be dropped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    Rows,
    Columns,
    Values,
    /// The pool of unused fields. Moving a field here unassigns it.
    Available,
}

/// The user's field placement. Order matters: the first row/column field is
/// the outermost grouping level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(default)]
    pub row_fields: Vec<FieldSpec>,

    #[serde(default)]
    pub column_fields: Vec<FieldSpec>,

    #[serde(default)]
    pub value_fields: Vec<FieldSpec>,
}

impl Assignment {
    pub fn new(
        row_fields: Vec<FieldSpec>,
        column_fields: Vec<FieldSpec>,
        value_fields: Vec<FieldSpec>,
    ) -> Self {
        Assignment {
            row_fields,
            column_fields,
            value_fields,
        }
    }

    /// True when no field is assigned to any area.
    pub fn is_empty(&self) -> bool {
        self.row_fields.is_empty() && self.column_fields.is_empty() && self.value_fields.is_empty()
    }

    /// The fields of one area. `Available` has no backing list.
    pub fn fields_in(&self, area: Area) -> &[FieldSpec] {
        match area {
            Area::Rows => &self.row_fields,
            Area::Columns => &self.column_fields,
            Area::Values => &self.value_fields,
            Area::Available => &[],
        }
    }

    fn fields_in_mut(&mut self, area: Area) -> Option<&mut Vec<FieldSpec>> {
        match area {
            Area::Rows => Some(&mut self.row_fields),
            Area::Columns => Some(&mut self.column_fields),
            Area::Values => Some(&mut self.value_fields),
            Area::Available => None,
        }
    }

    /// Iterates over every assigned field: rows, then columns, then values.
    pub fn assigned(&self) -> impl Iterator<Item = &FieldSpec> {
        self.row_fields
            .iter()
            .chain(self.column_fields.iter())
            .chain(self.value_fields.iter())
    }

    /// Returns the area holding the field, if any.
    pub fn area_of(&self, id: &str) -> Option<Area> {
        [Area::Rows, Area::Columns, Area::Values]
            .into_iter()
            .find(|&area| self.fields_in(area).iter().any(|f| f.id == id))
    }

    /// Returns the first field id that occurs more than once across all areas.
    pub fn first_duplicate(&self) -> Option<&FieldId> {
        let mut seen = rustc_hash::FxHashSet::default();
        self.assigned()
            .map(|f| &f.id)
            .find(|id| !seen.insert(*id))
    }

    /// Removes a field from whichever area holds it.
    /// Returns the area and position it was removed from.
    pub fn remove_field(&mut self, id: &str) -> Option<(Area, usize)> {
        for area in [Area::Rows, Area::Columns, Area::Values] {
            if let Some(list) = self.fields_in_mut(area) {
                if let Some(pos) = list.iter().position(|f| f.id == id) {
                    list.remove(pos);
                    return Some((area, pos));
                }
            }
        }
        None
    }

    /// Moves a field into `target` at `position`, removing it from its
    /// current area first. Positions past the end append. Moving to
    /// `Area::Available` only removes the field.
    pub fn move_field(&mut self, field: FieldSpec, target: Area, position: Option<usize>) {
        self.remove_field(&field.id);

        if let Some(list) = self.fields_in_mut(target) {
            let position = position.unwrap_or(list.len()).min(list.len());
            list.insert(position, field);
        }
    }

    /// Restores the placement to `defaults`.
    pub fn reset(&mut self, defaults: &Assignment) {
        self.clone_from(defaults);
    }

    /// Display header for the row label column: row field names joined by " / ",
    /// or "Data" when there are no row fields.
    pub fn row_header_label(&self) -> String {
        if self.row_fields.is_empty() {
            "Data".to_string()
        } else {
            self.row_fields
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(" / ")
        }
    }
}
