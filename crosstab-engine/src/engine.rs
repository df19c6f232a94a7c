//! FILENAME: crosstab-engine/src/engine.rs
//! Crosstab Engine - Builds the axis structures and aggregates cells.
//!
//! A computation pass takes records, an Assignment and a FilterSet and
//! produces everything the view layer needs:
//! 1. Filter the records and resolve them into a CrosstabCache
//! 2. Build the column hierarchy (trie of column tuples, sorted per level)
//! 3. Build the row grouping tree (arena of GroupNodes, sorted per level)
//! 4. Aggregate measures into cells for every row node and column leaf
//!
//! Every structure is rebuilt from scratch on each pass. Nodes live in arenas
//! and reference each other by index.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cache::{CrosstabCache, KeyPath, Record, ScalarValue};
use crate::definition::{Assignment, FieldId, FieldSpec};
use crate::filter::FilterSet;
use crate::view::{materialize, CrosstabOutput, ExpandState};

// ============================================================================
// OPTIONS
// ============================================================================

/// Labels and separators used when building keys and rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Joins a column tuple into its group id.
    pub column_separator: String,

    /// Joins a row tuple into a chart key.
    pub chart_key_separator: String,

    /// Name of the synthetic column group used when no column field is assigned.
    pub total_column_label: String,

    pub grand_total_label: String,

    /// Subtotal rows are labelled "<prefix> <value>".
    pub subtotal_prefix: String,

    /// Detail rows are labelled "<value> - <suffix>".
    pub detail_suffix: String,

    /// Ungrouped rows are labelled "<prefix> <n>".
    pub flat_row_prefix: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            column_separator: " | ".to_string(),
            chart_key_separator: " - ".to_string(),
            total_column_label: "Total".to_string(),
            grand_total_label: "Grand Total".to_string(),
            subtotal_prefix: "Subtotal".to_string(),
            detail_suffix: "Detail".to_string(),
            flat_row_prefix: "Row".to_string(),
        }
    }
}

// ============================================================================
// COLUMN HIERARCHY
// ============================================================================

/// A node of the column header trie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnNode {
    /// Column values from the outermost level down to this node.
    pub path: KeyPath<String>,

    pub label: String,

    /// 0 = outermost column field.
    pub depth: usize,

    /// Child node indices, sorted by label.
    pub children: Vec<usize>,

    /// True at the deepest column level (or for the synthetic total group).
    pub is_leaf_group: bool,

    /// Number of leaf columns this header cell covers.
    pub span: usize,

    /// Index into `ColumnAxis::groups` for leaf groups.
    pub group: Option<usize>,
}

/// A distinct column tuple. Holds one leaf per measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnGroup {
    /// The tuple joined by the column separator.
    pub id: String,
    pub path: KeyPath<String>,
    pub first_leaf: usize,
    pub leaf_count: usize,
}

/// Structured address of a column leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnLeafKey {
    pub path: KeyPath<String>,
    pub measure_id: FieldId,
}

/// One physical data column: a (column tuple, measure) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLeaf {
    pub key: ColumnLeafKey,

    /// "<tuple>_<measureId>", or the bare measure id for the total group.
    pub accessor: String,

    pub group: usize,
    pub measure_index: usize,
    pub measure_name: String,

    /// Always 1.
    pub span: usize,
}

/// One cell of a multi-row column header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderCell {
    pub label: String,
    pub span: usize,
}

/// The built column hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnAxis {
    nodes: Vec<ColumnNode>,
    roots: Vec<usize>,
    groups: Vec<ColumnGroup>,
    leaves: Vec<ColumnLeaf>,
    measure_count: usize,
    /// Column group of each cached record, by cache position.
    record_groups: Vec<usize>,
    has_column_fields: bool,
}

impl ColumnAxis {
    /// Builds the hierarchy from the resolved column keys of the cache.
    pub fn build(cache: &CrosstabCache, value_fields: &[FieldSpec], options: &EngineOptions) -> Self {
        let level_count = cache.column_field_ids().len();
        let mut axis = ColumnAxis {
            measure_count: value_fields.len(),
            has_column_fields: level_count > 0,
            ..ColumnAxis::default()
        };

        if level_count == 0 {
            axis.nodes.push(ColumnNode {
                path: KeyPath::new(),
                label: options.total_column_label.clone(),
                depth: 0,
                children: Vec::new(),
                is_leaf_group: true,
                span: 0,
                group: Some(0),
            });
            axis.roots.push(0);
            axis.groups.push(ColumnGroup {
                id: options.total_column_label.clone(),
                path: KeyPath::new(),
                first_leaf: 0,
                leaf_count: 0,
            });
            axis.record_groups = vec![0; cache.len()];
            axis.finish(value_fields, options);
            return axis;
        }

        // Insert every tuple into the trie.
        let mut index: FxHashMap<(Option<usize>, String), usize> = FxHashMap::default();
        let mut record_nodes = Vec::with_capacity(cache.len());

        for record in cache.records() {
            let mut parent: Option<usize> = None;
            for (depth, label) in record.column_key.iter().enumerate() {
                let key = (parent, label.clone());
                let node = match index.get(&key) {
                    Some(&node) => node,
                    None => {
                        let node = axis.nodes.len();
                        let mut path: KeyPath<String> = match parent {
                            Some(p) => axis.nodes[p].path.clone(),
                            None => KeyPath::new(),
                        };
                        path.push(label.clone());
                        axis.nodes.push(ColumnNode {
                            path,
                            label: label.clone(),
                            depth,
                            children: Vec::new(),
                            is_leaf_group: depth + 1 == level_count,
                            span: 0,
                            group: None,
                        });
                        match parent {
                            Some(p) => axis.nodes[p].children.push(node),
                            None => axis.roots.push(node),
                        }
                        index.insert(key, node);
                        node
                    }
                };
                parent = Some(node);
            }
            record_nodes.push(parent.unwrap_or_default());
        }

        // Sort every level by label.
        let nodes = &axis.nodes;
        axis.roots.sort_by(|&a, &b| nodes[a].label.cmp(&nodes[b].label));
        let mut sorted_children: Vec<Vec<usize>> = Vec::with_capacity(axis.nodes.len());
        for node in &axis.nodes {
            let mut children = node.children.clone();
            children.sort_by(|&a, &b| nodes[a].label.cmp(&nodes[b].label));
            sorted_children.push(children);
        }
        for (node, children) in axis.nodes.iter_mut().zip(sorted_children) {
            node.children = children;
        }

        // Number leaf groups in sorted depth-first order.
        let mut stack: Vec<usize> = axis.roots.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if axis.nodes[node].is_leaf_group {
                let group = axis.groups.len();
                let path = axis.nodes[node].path.clone();
                axis.groups.push(ColumnGroup {
                    id: path.join(options.column_separator.as_str()),
                    path,
                    first_leaf: 0,
                    leaf_count: 0,
                });
                axis.nodes[node].group = Some(group);
            } else {
                stack.extend(axis.nodes[node].children.iter().rev());
            }
        }

        axis.record_groups = record_nodes
            .into_iter()
            .map(|node| axis.nodes[node].group.unwrap_or_default())
            .collect();

        axis.finish(value_fields, options);
        axis
    }

    /// Creates the leaves of every group and computes spans bottom-up.
    fn finish(&mut self, value_fields: &[FieldSpec], options: &EngineOptions) {
        for (group_index, group) in self.groups.iter_mut().enumerate() {
            group.first_leaf = self.leaves.len();
            group.leaf_count = value_fields.len();
            for (measure_index, measure) in value_fields.iter().enumerate() {
                let accessor = if self.has_column_fields {
                    format!("{}_{}", group.path.join(options.column_separator.as_str()), measure.id)
                } else {
                    measure.id.clone()
                };
                self.leaves.push(ColumnLeaf {
                    key: ColumnLeafKey {
                        path: group.path.clone(),
                        measure_id: measure.id.clone(),
                    },
                    accessor,
                    group: group_index,
                    measure_index,
                    measure_name: measure.name.clone(),
                    span: 1,
                });
            }
        }

        // Children always have larger indices than their parent.
        for node in (0..self.nodes.len()).rev() {
            let span = if self.nodes[node].is_leaf_group {
                self.measure_count
            } else {
                self.nodes[node]
                    .children
                    .iter()
                    .map(|&child| self.nodes[child].span)
                    .sum()
            };
            self.nodes[node].span = span;
        }
    }

    pub fn nodes(&self) -> &[ColumnNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&ColumnNode> {
        self.nodes.get(index)
    }

    /// Outermost header nodes, sorted by label.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn groups(&self) -> &[ColumnGroup] {
        &self.groups
    }

    pub fn leaves(&self) -> &[ColumnLeaf] {
        &self.leaves
    }

    pub fn measure_count(&self) -> usize {
        self.measure_count
    }

    /// Column group of the record at `position` in the cache.
    pub fn record_group(&self, position: usize) -> Option<usize> {
        self.record_groups.get(position).copied()
    }

    pub fn leaf_by_accessor(&self, accessor: &str) -> Option<usize> {
        self.leaves.iter().position(|leaf| leaf.accessor == accessor)
    }

    pub fn leaf_by_key(&self, key: &ColumnLeafKey) -> Option<usize> {
        self.leaves.iter().position(|leaf| &leaf.key == key)
    }

    /// Multi-row column header: one row per column level, then a row of
    /// measure names. Cells appear in leaf order.
    pub fn header_rows(&self) -> Vec<Vec<HeaderCell>> {
        let mut rows: Vec<Vec<HeaderCell>> = Vec::new();
        let mut level: Vec<usize> = self.roots.clone();

        while !level.is_empty() {
            rows.push(
                level
                    .iter()
                    .map(|&n| HeaderCell {
                        label: self.nodes[n].label.clone(),
                        span: self.nodes[n].span,
                    })
                    .collect(),
            );
            level = level
                .iter()
                .flat_map(|&n| self.nodes[n].children.iter().copied())
                .collect();
        }

        rows.push(
            self.leaves
                .iter()
                .map(|leaf| HeaderCell {
                    label: leaf.measure_name.clone(),
                    span: leaf.span,
                })
                .collect(),
        );
        rows
    }
}

// ============================================================================
// CELL TOTALS
// ============================================================================

/// Sums aligned with `ColumnAxis::leaves`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellTotals(Vec<f64>);

impl CellTotals {
    pub fn zeros(leaf_count: usize) -> Self {
        CellTotals(vec![0.0; leaf_count])
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, leaf: usize) -> f64 {
        self.0.get(leaf).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds one cached record's measures into the cells of its column group.
    fn add_record(&mut self, axis: &ColumnAxis, cache: &CrosstabCache, position: usize) {
        let (Some(record), Some(group)) = (cache.record(position), axis.record_group(position))
        else {
            return;
        };
        let base = group * axis.measure_count();
        for (m, value) in record.measures.iter().enumerate() {
            if let Some(cell) = self.0.get_mut(base + m) {
                *cell += value;
            }
        }
    }
}

/// Sums the records at `positions` (cache positions), in the given order.
pub fn aggregate_records(cache: &CrosstabCache, axis: &ColumnAxis, positions: &[usize]) -> CellTotals {
    let mut totals = CellTotals::zeros(axis.leaves().len());
    for &position in positions {
        totals.add_record(axis, cache, position);
    }
    totals
}

// ============================================================================
// ROW GROUPING TREE
// ============================================================================

/// Stable identifier of a row group, derived from its value path.
/// Segments are "field=value" joined by '/', with '\\', '/' and '=' escaped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn root() -> Self {
        GroupId("*".to_string())
    }

    pub fn from_path<'a>(segments: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let parts: Vec<String> = segments
            .into_iter()
            .map(|(field, value)| format!("{}={}", escape_segment(field), escape_segment(value)))
            .collect();
        if parts.is_empty() {
            GroupId::root()
        } else {
            GroupId(parts.join("/"))
        }
    }

    fn child(&self, field: &str, value: &str) -> Self {
        let segment = format!("{}={}", escape_segment(field), escape_segment(value));
        if self.is_root() {
            GroupId(segment)
        } else {
            GroupId(format!("{}/{}", self.0, segment))
        }
    }

    pub fn is_root(&self) -> bool {
        self.0 == "*"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(value: &str) -> Self {
        GroupId(value.to_string())
    }
}

fn escape_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '/' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Index of the synthetic root in `RowTree::nodes`.
pub const ROOT: usize = 0;

/// One value-level of the row grouping tree. The root stands for all records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub id: GroupId,

    /// Row values from the outermost level down to this node.
    pub path: KeyPath<ScalarValue>,

    /// The value of this level (Missing for the root).
    pub value: ScalarValue,

    pub label: String,

    /// 0 for the root, 1 for the outermost row field.
    pub depth: usize,

    pub parent: Option<usize>,

    /// Child node indices, sorted by label.
    pub children: Vec<usize>,

    /// Cache positions of the attached records. Only the deepest level (or
    /// the root when there are no row fields) holds records.
    pub records: Vec<usize>,

    /// Number of records in the subtree.
    pub record_count: usize,

    pub cell_totals: CellTotals,
}

impl GroupNode {
    /// Row field level of the node; None for the root.
    pub fn level(&self) -> Option<usize> {
        self.depth.checked_sub(1)
    }

    pub fn has_content(&self) -> bool {
        !self.children.is_empty() || !self.records.is_empty()
    }
}

/// Arena-backed row grouping tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RowTreeParts")]
pub struct RowTree {
    nodes: Vec<GroupNode>,
    level_count: usize,
    /// Deepest node holding each cache position.
    record_nodes: Vec<usize>,
    #[serde(skip)]
    ids: FxHashMap<GroupId, usize>,
}

/// Serialized form of a RowTree. The id index is rebuilt from the nodes.
#[derive(Deserialize)]
struct RowTreeParts {
    nodes: Vec<GroupNode>,
    level_count: usize,
    record_nodes: Vec<usize>,
}

impl From<RowTreeParts> for RowTree {
    fn from(parts: RowTreeParts) -> Self {
        let ids = parts
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();
        RowTree {
            nodes: parts.nodes,
            level_count: parts.level_count,
            record_nodes: parts.record_nodes,
            ids,
        }
    }
}

impl RowTree {
    /// Groups the cached records by their row keys and aggregates every node.
    pub fn build(cache: &CrosstabCache, axis: &ColumnAxis) -> Self {
        let level_count = cache.row_field_ids().len();
        let mut tree = RowTree {
            nodes: vec![GroupNode {
                id: GroupId::root(),
                path: KeyPath::new(),
                value: ScalarValue::Missing,
                label: String::new(),
                depth: 0,
                parent: None,
                children: Vec::new(),
                records: Vec::new(),
                record_count: 0,
                cell_totals: CellTotals::zeros(axis.leaves().len()),
            }],
            level_count,
            record_nodes: Vec::with_capacity(cache.len()),
            ids: FxHashMap::default(),
        };
        tree.ids.insert(GroupId::root(), ROOT);

        let mut index: FxHashMap<(usize, String), usize> = FxHashMap::default();

        for (position, record) in cache.records().iter().enumerate() {
            let mut current = ROOT;
            for (level, (label, value)) in record.row_key.iter().zip(&record.row_values).enumerate() {
                let key = (current, label.clone());
                current = match index.get(&key) {
                    Some(&node) => node,
                    None => {
                        let field = &cache.row_field_ids()[level];
                        let node = tree.push_child(current, field, value, label, axis);
                        index.insert(key, node);
                        node
                    }
                };
            }
            tree.nodes[current].records.push(position);
            tree.record_nodes.push(current);
        }

        tree.sort_children();
        tree.aggregate(cache, axis);
        tree
    }

    fn push_child(
        &mut self,
        parent: usize,
        field: &str,
        value: &ScalarValue,
        label: &str,
        axis: &ColumnAxis,
    ) -> usize {
        let node = self.nodes.len();
        let mut path = self.nodes[parent].path.clone();
        path.push(value.clone());
        let id = self.nodes[parent].id.child(field, label);
        self.ids.insert(id.clone(), node);
        self.nodes.push(GroupNode {
            id,
            path,
            value: value.clone(),
            label: label.to_string(),
            depth: self.nodes[parent].depth + 1,
            parent: Some(parent),
            children: Vec::new(),
            records: Vec::new(),
            record_count: 0,
            cell_totals: CellTotals::zeros(axis.leaves().len()),
        });
        self.nodes[parent].children.push(node);
        node
    }

    fn sort_children(&mut self) {
        let order: Vec<Vec<usize>> = self
            .nodes
            .iter()
            .map(|node| {
                let mut children = node.children.clone();
                children.sort_by(|&a, &b| self.nodes[a].label.cmp(&self.nodes[b].label));
                children
            })
            .collect();
        for (node, children) in self.nodes.iter_mut().zip(order) {
            node.children = children;
        }
    }

    /// Adds every record, in source order, to each node on its path. Each
    /// node's totals therefore equal a direct sum over its subtree records.
    fn aggregate(&mut self, cache: &CrosstabCache, axis: &ColumnAxis) {
        for position in 0..self.record_nodes.len() {
            let mut current = Some(self.record_nodes[position]);
            while let Some(node) = current {
                let entry = &mut self.nodes[node];
                entry.cell_totals.add_record(axis, cache, position);
                entry.record_count += 1;
                current = entry.parent;
            }
        }
    }

    pub fn root(&self) -> &GroupNode {
        &self.nodes[ROOT]
    }

    pub fn nodes(&self) -> &[GroupNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&GroupNode> {
        self.nodes.get(index)
    }

    /// Number of row fields the tree was grouped by.
    pub fn level_count(&self) -> usize {
        self.level_count
    }

    pub fn is_flat(&self) -> bool {
        self.level_count == 0
    }

    pub fn find(&self, id: &GroupId) -> Option<usize> {
        self.ids.get(id).copied()
    }

    pub fn contains(&self, id: &GroupId) -> bool {
        self.ids.contains_key(id)
    }

    /// True when `node` is at the deepest row field level.
    pub fn is_deepest(&self, node: usize) -> bool {
        self.nodes
            .get(node)
            .and_then(GroupNode::level)
            .is_some_and(|level| level + 1 == self.level_count)
    }

    /// Cache positions of every record below `node`, in source order.
    pub fn subtree_records(&self, node: usize) -> Vec<usize> {
        (0..self.record_nodes.len())
            .filter(|&position| self.is_within(self.record_nodes[position], node))
            .collect()
    }

    fn is_within(&self, mut node: usize, ancestor: usize) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }
}

// ============================================================================
// CHART SERIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartValue {
    pub measure_id: FieldId,
    pub value: f64,
}

/// One row tuple with its measures summed across all column groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartEntry {
    pub key: String,
    pub values: Vec<ChartValue>,
}

/// Reduced per-row-tuple aggregate, in first-seen order. Empty when there
/// are no row fields or no measures.
///
/// Measures use the same coercion as the table cells: text contributes its
/// leading numeric prefix, so "7 apples" adds 7 here too. Chart and table
/// totals for a row tuple always agree.
pub fn chart_series(cache: &CrosstabCache, options: &EngineOptions) -> Vec<ChartEntry> {
    if cache.row_field_ids().is_empty() || cache.measure_ids().is_empty() {
        return Vec::new();
    }

    let mut entries: Vec<ChartEntry> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();

    for record in cache.records() {
        let key = record.row_key.join(options.chart_key_separator.as_str());
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            entries.push(ChartEntry {
                key,
                values: cache
                    .measure_ids()
                    .iter()
                    .map(|id| ChartValue {
                        measure_id: id.clone(),
                        value: 0.0,
                    })
                    .collect(),
            });
            entries.len() - 1
        });
        for (value, measure) in entries[slot].values.iter_mut().zip(&record.measures) {
            value.value += measure;
        }
    }
    entries
}

// ============================================================================
// DRILL DOWN
// ============================================================================

/// The source records behind one row group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillDownResult {
    pub group_id: GroupId,

    /// Indices into the record slice the pass was built from, in source order.
    pub source_rows: Vec<usize>,

    pub total_count: usize,
    pub is_truncated: bool,
    pub max_records: usize,
}

/// Lists the records of a group's subtree, up to `max_records`.
/// Returns None when the group does not exist.
pub fn drill_down(
    tree: &RowTree,
    cache: &CrosstabCache,
    group_id: &GroupId,
    max_records: usize,
) -> Option<DrillDownResult> {
    let node = tree.find(group_id)?;
    let positions = tree.subtree_records(node);
    let total_count = positions.len();

    let source_rows = positions
        .into_iter()
        .take(max_records)
        .filter_map(|p| cache.record(p).map(|r| r.source_index))
        .collect();

    Some(DrillDownResult {
        group_id: group_id.clone(),
        source_rows,
        total_count,
        is_truncated: total_count > max_records,
        max_records,
    })
}

// ============================================================================
// COMPUTATION PASS
// ============================================================================

/// All structures of one computation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosstabPass {
    pub cache: CrosstabCache,
    pub columns: ColumnAxis,
    pub rows: RowTree,
    pub options: EngineOptions,
    pub row_header: String,

    /// No field is assigned to any area.
    pub no_fields: bool,
}

impl CrosstabPass {
    pub fn build(
        records: &[Record],
        assignment: &Assignment,
        filters: &FilterSet,
        options: &EngineOptions,
    ) -> Self {
        let selection = filters.apply(records);
        let cache = CrosstabCache::build(records, &selection, assignment);
        let columns = ColumnAxis::build(&cache, &assignment.value_fields, options);
        let rows = RowTree::build(&cache, &columns);

        CrosstabPass {
            cache,
            columns,
            rows,
            options: options.clone(),
            row_header: assignment.row_header_label(),
            no_fields: assignment.is_empty(),
        }
    }

    /// Cells of the grand total (all filtered records).
    pub fn grand_totals(&self) -> &CellTotals {
        &self.rows.root().cell_totals
    }

    pub fn chart_series(&self) -> Vec<ChartEntry> {
        chart_series(&self.cache, &self.options)
    }

    pub fn drill_down(&self, group_id: &GroupId, max_records: usize) -> Option<DrillDownResult> {
        drill_down(&self.rows, &self.cache, group_id, max_records)
    }
}

/// Runs a full pass and materializes the visible rows.
pub fn calculate_crosstab(
    records: &[Record],
    assignment: &Assignment,
    filters: &FilterSet,
    expand_state: &ExpandState,
    options: &EngineOptions,
) -> CrosstabOutput {
    let pass = CrosstabPass::build(records, assignment, filters, options);
    materialize(&pass, expand_state)
}
