//! FILENAME: crosstab-engine/src/filter.rs
//! Value filters applied to the record set before any grouping.
//!
//! A filter maps a field id to the set of allowed stringified values. A
//! record passes when, for every filtered field, its value label is allowed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::cache::Record;
use crate::definition::{Assignment, FieldId, FieldSpec};

/// Allowed values per field. Fields without an entry impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet {
    allowed: BTreeMap<FieldId, BTreeSet<String>>,
}

impl FilterSet {
    pub fn new() -> Self {
        FilterSet::default()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Fields that currently carry a constraint, in id order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldId> {
        self.allowed.keys()
    }

    pub fn allowed_values(&self, field: &str) -> Option<&BTreeSet<String>> {
        self.allowed.get(field)
    }

    /// Replaces the allowed set of a field. An empty set rejects every record.
    pub fn set_allowed(&mut self, field: impl Into<FieldId>, values: BTreeSet<String>) {
        self.allowed.insert(field.into(), values);
    }

    /// Adds one allowed value to a field.
    pub fn allow(&mut self, field: impl Into<FieldId>, value: impl Into<String>) {
        self.allowed
            .entry(field.into())
            .or_default()
            .insert(value.into());
    }

    /// Removes one allowed value. The field's entry is dropped once it holds
    /// no values, which lifts the constraint.
    pub fn remove_value(&mut self, field: &str, value: &str) {
        if let Some(values) = self.allowed.get_mut(field) {
            values.remove(value);
            if values.is_empty() {
                self.allowed.remove(field);
            }
        }
    }

    pub fn clear_field(&mut self, field: &str) {
        self.allowed.remove(field);
    }

    pub fn clear(&mut self) {
        self.allowed.clear();
    }

    /// True when the record passes every field constraint.
    pub fn matches(&self, record: &Record) -> bool {
        self.allowed
            .iter()
            .all(|(field, values)| values.contains(&record.get(field).label()))
    }

    /// Returns the indices of the passing records, in source order.
    pub fn apply(&self, records: &[Record]) -> Vec<usize> {
        if self.allowed.is_empty() {
            return (0..records.len()).collect();
        }
        records
            .iter()
            .enumerate()
            .filter(|(_, record)| self.matches(record))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Sorted, de-duplicated, non-empty value labels of `field` across `records`.
pub fn distinct_values(records: &[Record], field: &str) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get(field).label())
        .filter(|label| !label.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The assigned fields offered for filtering: rows, columns, then values,
/// each field once.
pub fn active_filter_fields(assignment: &Assignment) -> Vec<FieldSpec> {
    let mut seen: rustc_hash::FxHashSet<FieldId> = rustc_hash::FxHashSet::default();
    assignment
        .assigned()
        .filter(|f| seen.insert(f.id.clone()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record::new().with("sedes", "LA PAZ").with("mes", 1.0),
            Record::new().with("sedes", "TARIJA").with("mes", 2.0),
            Record::new().with("sedes", "LA PAZ").with("mes", 0.0),
            Record::new().with("mes", 2.0),
        ]
    }

    #[test]
    fn test_empty_filter_is_identity() {
        let records = records();
        assert_eq!(FilterSet::new().apply(&records), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_filter_keeps_allowed_values() {
        let mut filters = FilterSet::new();
        filters.allow("sedes", "LA PAZ");
        assert_eq!(filters.apply(&records()), vec![0, 2]);

        filters.allow("mes", "0");
        assert_eq!(filters.apply(&records()), vec![2]);
    }

    #[test]
    fn test_missing_value_matches_empty_string() {
        let mut filters = FilterSet::new();
        filters.allow("sedes", "");
        assert_eq!(filters.apply(&records()), vec![3]);
    }

    #[test]
    fn test_empty_allowed_set_rejects_everything() {
        let mut filters = FilterSet::new();
        filters.set_allowed("sedes", BTreeSet::new());
        assert!(filters.apply(&records()).is_empty());
    }

    #[test]
    fn test_remove_last_value_lifts_constraint() {
        let mut filters = FilterSet::new();
        filters.allow("sedes", "TARIJA");
        filters.remove_value("sedes", "TARIJA");
        assert!(filters.is_empty());
        assert_eq!(filters.apply(&records()).len(), 4);
    }

    #[test]
    fn test_distinct_values_sorted_non_empty() {
        assert_eq!(distinct_values(&records(), "sedes"), vec!["LA PAZ", "TARIJA"]);
        assert_eq!(distinct_values(&records(), "mes"), vec!["0", "1", "2"]);
        assert!(distinct_values(&records(), "provincia").is_empty());
    }

    #[test]
    fn test_active_filter_fields_order() {
        let assignment = Assignment::new(
            vec![FieldSpec::dimension("sedes", "Sedes")],
            vec![FieldSpec::dimension("mes", "Mes")],
            vec![FieldSpec::measure("totalg", "Total")],
        );
        let ids: Vec<String> = active_filter_fields(&assignment)
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec!["sedes", "mes", "totalg"]);
    }
}
