//! FILENAME: crosstab-engine/src/view.rs
//! Crosstab View - Render-ready output of a computation pass.
//!
//! The view layer owns the expand/collapse state and flattens the row tree
//! into an ordered list of visible rows:
//! - a group header per visible group
//! - children (or detail rows) and a subtotal under each expanded group
//! - one grand-total row at the end

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::engine::{
    aggregate_records, CellTotals, ColumnAxis, ColumnLeafKey, CrosstabPass, GroupId, HeaderCell,
};

// ============================================================================
// EXPAND STATE
// ============================================================================

/// The set of expanded group ids. Every group starts collapsed.
/// Ids derive from value paths, so the state survives data and filter changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpandState {
    expanded: BTreeSet<GroupId>,
}

impl ExpandState {
    pub fn new() -> Self {
        ExpandState::default()
    }

    pub fn is_expanded(&self, id: &GroupId) -> bool {
        self.expanded.contains(id)
    }

    pub fn expand(&mut self, id: GroupId) {
        self.expanded.insert(id);
    }

    pub fn collapse(&mut self, id: &GroupId) {
        self.expanded.remove(id);
    }

    /// Flips a group present in `pass`. Unknown ids are ignored.
    /// Returns whether the state changed.
    pub fn toggle(&mut self, pass: &CrosstabPass, id: &GroupId) -> bool {
        if id.is_root() || !pass.rows.contains(id) {
            return false;
        }
        if !self.expanded.remove(id) {
            self.expanded.insert(id.clone());
        }
        true
    }

    /// Expands every group of the pass that has content.
    pub fn expand_all(&mut self, pass: &CrosstabPass) {
        for node in pass.rows.nodes().iter().skip(1) {
            if node.has_content() {
                self.expanded.insert(node.id.clone());
            }
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupId> {
        self.expanded.iter()
    }
}

// ============================================================================
// VISIBLE ROWS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowKind {
    GroupHeader,
    Detail,
    Subtotal,
    GrandTotal,
}

/// One materialized row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibleRow {
    /// Stable while the value path is unchanged.
    pub id: String,
    pub kind: RowKind,
    pub depth: usize,
    pub label: String,

    /// Aligned with `CrosstabTable::columns.leaves()`.
    pub cells: CellTotals,

    pub expandable: bool,
    pub expanded: bool,

    /// The group a header, subtotal or detail row belongs to.
    pub group: Option<GroupId>,

    /// Index into the source records for detail rows.
    pub source_record: Option<usize>,
}

/// The render-ready crosstab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosstabTable {
    pub columns: ColumnAxis,
    pub rows: Vec<VisibleRow>,

    /// Header of the row label column.
    pub row_header: String,
}

impl CrosstabTable {
    pub fn header_rows(&self) -> Vec<Vec<HeaderCell>> {
        self.columns.header_rows()
    }

    pub fn grand_total(&self) -> Option<&VisibleRow> {
        self.rows.iter().rev().find(|r| r.kind == RowKind::GrandTotal)
    }

    pub fn row(&self, id: &str) -> Option<&VisibleRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Cell of `row` under the leaf with the given accessor.
    ///
    /// Accessors are flat strings and can collide: tuple "a_g" with measure
    /// "total" and tuple "a" with measure "g_total" both read "a_g_total".
    /// The first leaf in column order wins; use `cell_by_key` when tuple
    /// values or measure ids may contain the separator.
    pub fn cell(&self, row: &VisibleRow, accessor: &str) -> Option<f64> {
        self.columns
            .leaf_by_accessor(accessor)
            .map(|leaf| row.cells.get(leaf))
    }

    /// Cell of `row` under the leaf addressed by column tuple and measure.
    pub fn cell_by_key(&self, row: &VisibleRow, key: &ColumnLeafKey) -> Option<f64> {
        self.columns.leaf_by_key(key).map(|leaf| row.cells.get(leaf))
    }
}

/// Outcome of materialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CrosstabOutput {
    /// No field is assigned; the renderer shows its empty-state message.
    NoFields,
    Table(CrosstabTable),
}

impl CrosstabOutput {
    pub fn table(&self) -> Option<&CrosstabTable> {
        match self {
            CrosstabOutput::Table(table) => Some(table),
            CrosstabOutput::NoFields => None,
        }
    }
}

// ============================================================================
// MATERIALIZER
// ============================================================================

/// Flattens the pass into visible rows under the given expand state.
pub fn materialize(pass: &CrosstabPass, expand_state: &ExpandState) -> CrosstabOutput {
    if pass.no_fields {
        return CrosstabOutput::NoFields;
    }

    let mut rows = Vec::new();
    if pass.rows.is_flat() {
        for position in &pass.rows.root().records {
            rows.push(detail_row(pass, *position, None, 0, |n| {
                format!("{} {}", pass.options.flat_row_prefix, n)
            }));
        }
    } else {
        for &child in &pass.rows.root().children {
            emit_group(pass, expand_state, child, &mut rows);
        }
    }

    rows.push(VisibleRow {
        id: "grand-total".to_string(),
        kind: RowKind::GrandTotal,
        depth: 0,
        label: pass.options.grand_total_label.clone(),
        cells: pass.grand_totals().clone(),
        expandable: false,
        expanded: false,
        group: None,
        source_record: None,
    });

    CrosstabOutput::Table(CrosstabTable {
        columns: pass.columns.clone(),
        rows,
        row_header: pass.row_header.clone(),
    })
}

fn emit_group(pass: &CrosstabPass, expand_state: &ExpandState, index: usize, out: &mut Vec<VisibleRow>) {
    let tree = &pass.rows;
    let Some(node) = tree.node(index) else {
        return;
    };
    let level = node.level().unwrap_or_default();
    let expandable = node.has_content();
    let expanded = expandable && expand_state.is_expanded(&node.id);

    out.push(VisibleRow {
        id: node.id.to_string(),
        kind: RowKind::GroupHeader,
        depth: level,
        label: node.label.clone(),
        cells: node.cell_totals.clone(),
        expandable,
        expanded,
        group: Some(node.id.clone()),
        source_record: None,
    });

    if !expanded {
        return;
    }

    if tree.is_deepest(index) {
        for &position in &node.records {
            out.push(detail_row(pass, position, Some(&node.id), level + 1, |_| {
                format!("{} - {}", node.label, pass.options.detail_suffix)
            }));
        }
    } else {
        for &child in &node.children {
            emit_group(pass, expand_state, child, out);
        }
    }

    out.push(VisibleRow {
        id: format!("{}#subtotal", node.id),
        kind: RowKind::Subtotal,
        depth: level + 1,
        label: format!("{} {}", pass.options.subtotal_prefix, node.label),
        cells: node.cell_totals.clone(),
        expandable: false,
        expanded: false,
        group: Some(node.id.clone()),
        source_record: None,
    });
}

/// A single-record row. `label` receives the 1-based position of the record.
fn detail_row(
    pass: &CrosstabPass,
    position: usize,
    group: Option<&GroupId>,
    depth: usize,
    label: impl FnOnce(usize) -> String,
) -> VisibleRow {
    let source = pass
        .cache
        .record(position)
        .map(|r| r.source_index)
        .unwrap_or(position);
    let id = match group {
        Some(group) => format!("{}#record:{}", group, source),
        None => format!("record:{}", source),
    };

    VisibleRow {
        id,
        kind: RowKind::Detail,
        depth,
        label: label(position + 1),
        cells: aggregate_records(&pass.cache, &pass.columns, &[position]),
        expandable: false,
        expanded: false,
        group: group.cloned(),
        source_record: Some(source),
    }
}
