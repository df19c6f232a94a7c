//! FILENAME: crosstab-session/src/session.rs
//! The crosstab session: owns one pivot's inputs and its expand state.
//!
//! Every mutation bumps the session version and drops the memoized output.
//! Changes to records, assignment or filters also drop the memoized pass;
//! expand/collapse only re-materializes.

use std::time::Instant;

use crosstab_engine::{
    active_filter_fields, distinct_values, materialize, Assignment, ChartEntry, CrosstabOutput,
    CrosstabPass, DrillDownResult, EngineOptions, ExpandState, FieldCatalog, FieldPartition,
    FieldSpec, FilterSet, GroupId, Record,
};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::logging;
use crate::source::records_from_json_str;
use crate::types::{FieldUniqueValuesResponse, FilterChange, MoveFieldRequest};
use crate::{log_debug, log_enter, log_error, log_exit, log_info, log_perf, log_warn};

#[derive(Debug)]
pub struct CrosstabSession {
    config: SessionConfig,
    options: EngineOptions,
    catalog: FieldCatalog,
    records: Vec<Record>,
    assignment: Assignment,
    default_assignment: Assignment,
    filters: FilterSet,
    expand_state: ExpandState,
    version: u64,
    pass: Option<CrosstabPass>,
    output: Option<CrosstabOutput>,
}

impl CrosstabSession {
    /// Creates an empty session over `catalog`. Opens the log file when the
    /// config names one.
    pub fn new(config: SessionConfig, catalog: FieldCatalog) -> Result<Self, SessionError> {
        if let Some(ref path) = config.log_file {
            if let Err(e) = logging::init_log_file(path) {
                log_error!("SESSION", "init_log_file failed path={}: {}", path.display(), e);
                return Err(e);
            }
        }
        log_info!("SESSION", "new session fields={}", catalog.len());

        Ok(CrosstabSession {
            options: config.engine_options(),
            config,
            catalog,
            records: Vec::new(),
            assignment: Assignment::default(),
            default_assignment: Assignment::default(),
            filters: FilterSet::new(),
            expand_state: ExpandState::new(),
            version: 0,
            pass: None,
            output: None,
        })
    }

    /// Sets the assignment restored by `reset_assignment` and applies it.
    pub fn with_default_assignment(mut self, assignment: Assignment) -> Result<Self, SessionError> {
        self.validate_assignment(&assignment)?;
        self.default_assignment = assignment.clone();
        self.assignment = assignment;
        self.invalidate();
        Ok(self)
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn expand_state(&self) -> &ExpandState {
        &self.expand_state
    }

    /// Incremented by every mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    // ========================================================================
    // FIELD ASSIGNMENT
    // ========================================================================

    /// Fails when a field is not in the catalog or is placed twice.
    pub fn validate_assignment(&self, assignment: &Assignment) -> Result<(), SessionError> {
        if let Some(field) = assignment.assigned().find(|f| !self.catalog.contains(&f.id)) {
            return Err(SessionError::UnknownField(field.id.clone()));
        }
        if let Some(id) = assignment.first_duplicate() {
            return Err(SessionError::DuplicateField(id.clone()));
        }
        Ok(())
    }

    pub fn set_assignment(&mut self, assignment: Assignment) -> Result<(), SessionError> {
        log_info!(
            "SESSION",
            "set_assignment rows={} cols={} values={}",
            assignment.row_fields.len(),
            assignment.column_fields.len(),
            assignment.value_fields.len()
        );
        if let Err(e) = self.validate_assignment(&assignment) {
            log_warn!("SESSION", "set_assignment rejected: {}", e);
            return Err(e);
        }
        self.assignment = assignment;
        self.invalidate();
        Ok(())
    }

    /// Moves a catalog field into an area, removing it from its current one.
    pub fn move_field(&mut self, request: &MoveFieldRequest) -> Result<(), SessionError> {
        log_info!(
            "SESSION",
            "move_field field={} target={:?} position={:?}",
            request.field_id,
            request.target,
            request.position
        );
        let field = self
            .catalog
            .get(&request.field_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownField(request.field_id.clone()))?;

        self.assignment.move_field(field, request.target, request.position);
        self.invalidate();
        Ok(())
    }

    pub fn reset_assignment(&mut self) {
        log_info!("SESSION", "reset_assignment");
        self.assignment.reset(&self.default_assignment);
        self.invalidate();
    }

    pub fn unused_fields(&self) -> Vec<FieldSpec> {
        self.catalog.unused(&self.assignment)
    }

    pub fn field_partition(&self) -> FieldPartition {
        self.catalog.classify()
    }

    // ========================================================================
    // RECORDS
    // ========================================================================

    pub fn set_records(&mut self, records: Vec<Record>) {
        log_info!("SESSION", "set_records count={}", records.len());
        self.records = records;
        self.invalidate();
    }

    /// Replaces the records with a JSON array of objects. Returns the count.
    pub fn load_records_json(&mut self, json: &str) -> Result<usize, SessionError> {
        log_enter!("SESSION", "load_records_json", "bytes={}", json.len());
        let records = match records_from_json_str(json) {
            Ok(records) => records,
            Err(e) => {
                log_error!("SESSION", "load_records_json failed: {}", e);
                return Err(e);
            }
        };
        let count = records.len();
        self.set_records(records);
        log_exit!("SESSION", "load_records_json", "count={}", count);
        Ok(count)
    }

    // ========================================================================
    // FILTERS
    // ========================================================================

    pub fn set_filters(&mut self, filters: FilterSet) -> Result<(), SessionError> {
        if let Some(field) = filters.fields().find(|id| !self.catalog.contains(id)) {
            return Err(SessionError::UnknownField(field.clone()));
        }
        log_info!("FILTER", "set_filters fields={}", filters.fields().count());
        self.filters = filters;
        self.invalidate();
        Ok(())
    }

    pub fn apply_filter_change(&mut self, change: FilterChange) -> Result<(), SessionError> {
        log_info!("FILTER", "apply_filter_change {:?}", change);
        match change {
            FilterChange::Allow { field_id, value } => {
                self.require_field(&field_id)?;
                self.filters.allow(field_id, value);
            }
            FilterChange::Remove { field_id, value } => {
                self.require_field(&field_id)?;
                self.filters.remove_value(&field_id, &value);
            }
            FilterChange::ClearField { field_id } => {
                self.require_field(&field_id)?;
                self.filters.clear_field(&field_id);
            }
            FilterChange::ClearAll => self.filters.clear(),
        }
        self.invalidate();
        Ok(())
    }

    /// Distinct non-empty values of a field over all records.
    pub fn distinct_values(&self, field_id: &str) -> Result<FieldUniqueValuesResponse, SessionError> {
        self.require_field(field_id)?;
        let values = distinct_values(&self.records, field_id);
        log_debug!("FILTER", "distinct_values field={} count={}", field_id, values.len());
        Ok(FieldUniqueValuesResponse {
            field_id: field_id.to_string(),
            count: values.len(),
            values,
        })
    }

    /// Assigned fields a filter UI offers.
    pub fn filter_fields(&self) -> Vec<FieldSpec> {
        active_filter_fields(&self.assignment)
    }

    fn require_field(&self, field_id: &str) -> Result<(), SessionError> {
        if self.catalog.contains(field_id) {
            Ok(())
        } else {
            Err(SessionError::UnknownField(field_id.to_string()))
        }
    }

    // ========================================================================
    // EXPAND / COLLAPSE
    // ========================================================================

    /// Flips a group. Unknown ids are a no-op; returns whether anything changed.
    pub fn toggle_group(&mut self, id: &GroupId) -> bool {
        let pass = self.take_pass();
        let changed = self.expand_state.toggle(&pass, id);
        self.pass = Some(pass);

        log_info!("SESSION", "toggle_group id={} changed={}", id, changed);
        if changed {
            self.invalidate_view();
        }
        changed
    }

    pub fn expand_all(&mut self) {
        let pass = self.take_pass();
        self.expand_state.expand_all(&pass);
        self.pass = Some(pass);
        log_info!("SESSION", "expand_all expanded={}", self.expand_state.len());
        self.invalidate_view();
    }

    pub fn collapse_all(&mut self) {
        log_info!("SESSION", "collapse_all");
        self.expand_state.collapse_all();
        self.invalidate_view();
    }

    // ========================================================================
    // OUTPUTS
    // ========================================================================

    /// The materialized crosstab. Recomputed only after a mutation.
    pub fn view(&mut self) -> &CrosstabOutput {
        let output = match self.output.take() {
            Some(output) => output,
            None => {
                let t_total = Instant::now();
                let pass = self.take_pass();

                let t0 = Instant::now();
                let output = materialize(&pass, &self.expand_state);
                let materialize_ms = t0.elapsed().as_secs_f64() * 1000.0;
                self.pass = Some(pass);

                let rows = output.table().map(|t| t.rows.len()).unwrap_or(0);
                log_perf!(
                    "CROSSTAB",
                    "view version={} rows={} | materialize={:.1}ms TOTAL={:.1}ms",
                    self.version,
                    rows,
                    materialize_ms,
                    t_total.elapsed().as_secs_f64() * 1000.0
                );
                output
            }
        };
        self.output.insert(output)
    }

    /// Per-row-tuple aggregate for the chart.
    pub fn chart_series(&mut self) -> Vec<ChartEntry> {
        let pass = self.take_pass();
        let series = pass.chart_series();
        self.pass = Some(pass);
        series
    }

    /// Source records behind a group. None when the group does not exist.
    pub fn drill_down(&mut self, id: &GroupId, max_records: usize) -> Option<DrillDownResult> {
        let pass = self.take_pass();
        let result = pass.drill_down(id, max_records);
        self.pass = Some(pass);

        log_debug!(
            "CROSSTAB",
            "drill_down id={} found={}",
            id,
            result.as_ref().map(|r| r.total_count).unwrap_or(0)
        );
        result
    }

    // ========================================================================
    // MEMOIZATION
    // ========================================================================

    /// Takes the memoized pass, building it first when missing.
    fn take_pass(&mut self) -> CrosstabPass {
        self.pass.take().unwrap_or_else(|| self.build_pass())
    }

    fn build_pass(&self) -> CrosstabPass {
        let t0 = Instant::now();
        let pass = CrosstabPass::build(&self.records, &self.assignment, &self.filters, &self.options);
        log_perf!(
            "CROSSTAB",
            "build_pass version={} records={} filtered={} groups={} leaves={} | calc={:.1}ms",
            self.version,
            self.records.len(),
            pass.cache.len(),
            pass.rows.nodes().len().saturating_sub(1),
            pass.columns.leaves().len(),
            t0.elapsed().as_secs_f64() * 1000.0
        );
        pass
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }

    fn invalidate(&mut self) {
        self.pass = None;
        self.invalidate_view();
    }

    fn invalidate_view(&mut self) {
        self.output = None;
        self.bump_version();
    }
}
