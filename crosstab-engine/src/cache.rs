//! FILENAME: crosstab-engine/src/cache.rs
//! Crosstab Cache - Typed records and the per-pass resolved representation.
//!
//! Records arrive as loosely typed field maps. The cache resolves every
//! record against the current assignment exactly once per pass:
//! - Row dimension values (normalized group values)
//! - Column dimension labels
//! - Measure values coerced to numbers
//!
//! Builders and the aggregator only read the cache, never the raw records.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::definition::{Assignment, FieldId};

/// Inline capacity for per-level key vectors. Most crosstabs nest at most four deep.
pub type KeyPath<T> = SmallVec<[T; 4]>;

// ============================================================================
// SCALAR VALUES
// ============================================================================

/// A single field value of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Number(f64),
    Text(String),
    Missing,
}

static MISSING: ScalarValue = ScalarValue::Missing;

impl ScalarValue {
    pub fn text(s: impl Into<String>) -> Self {
        ScalarValue::Text(s.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, ScalarValue::Missing)
    }

    /// The display string of the value. Missing values render as "".
    pub fn label(&self) -> String {
        match self {
            ScalarValue::Number(n) => format_number(*n),
            ScalarValue::Text(s) => s.clone(),
            ScalarValue::Missing => String::new(),
        }
    }

    /// The value used as a grouping key: missing becomes the empty string.
    pub fn as_dimension(&self) -> ScalarValue {
        match self {
            ScalarValue::Missing => ScalarValue::Text(String::new()),
            other => other.clone(),
        }
    }

    /// Numeric contribution of the value as a measure.
    /// Text is parsed by its leading numeric prefix; anything unparseable,
    /// missing or NaN contributes 0.
    pub fn as_measure(&self) -> f64 {
        let n = match self {
            ScalarValue::Number(n) => *n,
            ScalarValue::Text(s) => parse_float_prefix(s).unwrap_or(0.0),
            ScalarValue::Missing => 0.0,
        };
        if n.is_nan() {
            0.0
        } else {
            n
        }
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Number(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Number(value as f64)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Text(value)
    }
}

/// Formats a number the way it is shown in labels and filter values:
/// integral values without a fractional part.
pub fn format_number(n: f64) -> String {
    if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

/// Parses the longest leading decimal literal of `s` (after leading
/// whitespace): optional sign, digits, optional fraction, optional exponent,
/// or `Infinity`. Returns None when no digits are found.
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        let negative = bytes.first() == Some(&b'-');
        return Some(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

// ============================================================================
// RECORD
// ============================================================================

/// An immutable mapping from field id to value. Absent fields read as Missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: FxHashMap<FieldId, ScalarValue>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<FieldId>, value: impl Into<ScalarValue>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<FieldId>, value: impl Into<ScalarValue>) {
        self.values.insert(field.into(), value.into());
    }

    /// Reads a field. Unknown fields yield `ScalarValue::Missing`.
    pub fn get(&self, field: &str) -> &ScalarValue {
        self.values.get(field).unwrap_or(&MISSING)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<FieldId>, V: Into<ScalarValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ============================================================================
// CACHED RECORD
// ============================================================================

/// A record resolved against one assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRecord {
    /// Index of the record in the source slice handed to the pass.
    pub source_index: usize,

    /// Row dimension values, one per row field (missing normalized to "").
    pub row_values: KeyPath<ScalarValue>,

    /// Row dimension labels, one per row field.
    pub row_key: KeyPath<String>,

    /// Column dimension labels, one per column field.
    pub column_key: KeyPath<String>,

    /// Measure values, one per value field, already coerced.
    pub measures: KeyPath<f64>,
}

// ============================================================================
// MAIN CACHE STRUCT
// ============================================================================

/// The per-pass cache: the filtered records resolved against the assignment.
/// Rebuilt from scratch on every pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrosstabCache {
    records: Vec<CachedRecord>,
    row_field_ids: Vec<FieldId>,
    column_field_ids: Vec<FieldId>,
    measure_ids: Vec<FieldId>,
}

impl CrosstabCache {
    /// Resolves the records at `selection` (indices into `records`, in order).
    pub fn build(records: &[Record], selection: &[usize], assignment: &Assignment) -> Self {
        let row_field_ids: Vec<FieldId> =
            assignment.row_fields.iter().map(|f| f.id.clone()).collect();
        let column_field_ids: Vec<FieldId> =
            assignment.column_fields.iter().map(|f| f.id.clone()).collect();
        let measure_ids: Vec<FieldId> =
            assignment.value_fields.iter().map(|f| f.id.clone()).collect();

        let mut cached = Vec::with_capacity(selection.len());
        for &source_index in selection {
            let Some(record) = records.get(source_index) else {
                continue;
            };

            let row_values: KeyPath<ScalarValue> = row_field_ids
                .iter()
                .map(|id| record.get(id).as_dimension())
                .collect();
            let row_key = row_values.iter().map(ScalarValue::label).collect();
            let column_key = column_field_ids
                .iter()
                .map(|id| record.get(id).label())
                .collect();
            let measures = measure_ids
                .iter()
                .map(|id| record.get(id).as_measure())
                .collect();

            cached.push(CachedRecord {
                source_index,
                row_values,
                row_key,
                column_key,
                measures,
            });
        }

        CrosstabCache {
            records: cached,
            row_field_ids,
            column_field_ids,
            measure_ids,
        }
    }

    /// Resolves every record, in order.
    pub fn build_all(records: &[Record], assignment: &Assignment) -> Self {
        let selection: Vec<usize> = (0..records.len()).collect();
        CrosstabCache::build(records, &selection, assignment)
    }

    pub fn records(&self) -> &[CachedRecord] {
        &self.records
    }

    pub fn record(&self, position: usize) -> Option<&CachedRecord> {
        self.records.get(position)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn row_field_ids(&self) -> &[FieldId] {
        &self.row_field_ids
    }

    pub fn column_field_ids(&self) -> &[FieldId] {
        &self.column_field_ids
    }

    pub fn measure_ids(&self) -> &[FieldId] {
        &self.measure_ids
    }

    pub fn measure_count(&self) -> usize {
        self.measure_ids.len()
    }
}
