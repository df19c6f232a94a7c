//! FILENAME: tests/test_session.rs
//! Integration tests for session commands: assignment, filters, expand state.

mod common;

use common::{assert_cell, HealthFormsFixture, TestHarness};
use crosstab_engine::{Area, Assignment, FieldSpec, FilterSet, GroupId, RowKind};
use crosstab_session::{
    logging, CrosstabSession, FilterChange, SessionConfig, SessionError,
};

// ============================================================================
// ASSIGNMENT VALIDATION
// ============================================================================

#[test]
fn test_set_assignment_rejects_unknown_field() {
    let mut harness = TestHarness::with_health_forms();
    let version = harness.session.version();
    let assignment = Assignment::new(
        vec![FieldSpec::dimension("red_establ", "Red de Establecimiento")],
        vec![],
        vec![],
    );
    let err = harness.session.set_assignment(assignment).unwrap_err();
    assert!(matches!(err, SessionError::UnknownField(ref id) if id == "red_establ"));
    assert_eq!(harness.session.version(), version);
    assert_eq!(harness.session.assignment(), &HealthFormsFixture::default_assignment());
}

#[test]
fn test_set_assignment_rejects_duplicates() {
    let mut harness = TestHarness::with_health_forms();
    let sedes = HealthFormsFixture::field("sedes");
    let err = harness
        .session
        .set_assignment(Assignment::new(vec![sedes.clone()], vec![sedes], vec![]))
        .unwrap_err();
    assert!(matches!(err, SessionError::DuplicateField(ref id) if id == "sedes"));
}

#[test]
fn test_move_field_reorders_levels() {
    let mut harness = TestHarness::with_health_forms();
    harness.move_field("mes", Area::Rows, Some(0));
    let rows: Vec<String> = harness
        .session
        .assignment()
        .row_fields
        .iter()
        .map(|f| f.id.clone())
        .collect();
    assert_eq!(rows, vec!["mes", "sedes"]);

    let table = harness.table();
    let labels: Vec<&str> = table.rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["1", "2", "3", "Grand Total"]);
    assert_eq!(table.row_header, "Mes / Sedes/Departamento");
}

#[test]
fn test_unused_and_partition() {
    let harness = TestHarness::with_health_forms();
    let unused: Vec<String> = harness.session.unused_fields().into_iter().map(|f| f.id).collect();
    assert_eq!(unused.len(), 9);
    assert!(!unused.contains(&"sedes".to_string()));

    let partition = harness.session.field_partition();
    assert_eq!(partition.dimensions.len(), 9);
    assert_eq!(partition.measures.len(), 3);
}

// ============================================================================
// FILTERS
// ============================================================================

#[test]
fn test_filter_changes_recompute_totals() {
    let mut harness = TestHarness::with_health_forms();
    harness
        .session
        .apply_filter_change(FilterChange::Allow {
            field_id: "formulario".to_string(),
            value: "VIGILANCIA EPIDEMIOLÓGICA".to_string(),
        })
        .unwrap();

    let table = harness.table();
    assert_eq!(table.rows.len(), 4);
    let grand = table.grand_total().unwrap();
    assert_cell(&table, grand, "VIGILANCIA EPIDEMIOLÓGICA_totalg", 13.0);
    assert_eq!(table.columns.leaves().len(), 1);

    harness
        .session
        .apply_filter_change(FilterChange::Remove {
            field_id: "formulario".to_string(),
            value: "VIGILANCIA EPIDEMIOLÓGICA".to_string(),
        })
        .unwrap();
    assert!(harness.session.filters().is_empty());
    assert_eq!(harness.table().rows.len(), 6);
}

#[test]
fn test_filter_on_unknown_field_rejected() {
    let mut harness = TestHarness::with_health_forms();
    let err = harness
        .session
        .apply_filter_change(FilterChange::ClearField {
            field_id: "nivel".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, SessionError::UnknownField(_)));

    let mut filters = FilterSet::new();
    filters.allow("nivel", "1");
    assert!(harness.session.set_filters(filters).is_err());
}

#[test]
fn test_filter_change_json_shape() {
    let change: FilterChange =
        serde_json::from_str(r#"{ "action": "allow", "field_id": "sedes", "value": "TARIJA" }"#)
            .unwrap();
    assert_eq!(
        change,
        FilterChange::Allow {
            field_id: "sedes".to_string(),
            value: "TARIJA".to_string()
        }
    );
    let clear: FilterChange = serde_json::from_str(r#"{ "action": "clear_all" }"#).unwrap();
    assert_eq!(clear, FilterChange::ClearAll);
}

#[test]
fn test_distinct_values_for_dropdowns() {
    let harness = TestHarness::with_health_forms();
    let response = harness.session.distinct_values("provincia").unwrap();
    assert_eq!(
        response.values,
        vec!["ANDRÉS IBÁÑEZ", "CERCADO", "MURILLO", "OROPEZA"]
    );
    assert_eq!(response.count, 4);
    assert!(harness.session.distinct_values("subvariable").unwrap().values.is_empty());
    assert!(harness.session.distinct_values("nope").is_err());

    let filter_fields: Vec<String> =
        harness.session.filter_fields().into_iter().map(|f| f.id).collect();
    assert_eq!(filter_fields, vec!["sedes", "formulario", "totalg"]);
}

// ============================================================================
// EXPAND STATE
// ============================================================================

#[test]
fn test_expand_state_survives_filter_change() {
    let mut harness = TestHarness::with_health_forms();
    assert!(harness.toggle("sedes=LA PAZ"));

    harness
        .session
        .apply_filter_change(FilterChange::Allow {
            field_id: "mes".to_string(),
            value: "1".to_string(),
        })
        .unwrap();
    let table = harness.table();
    let la_paz = table.row("sedes=LA PAZ").unwrap();
    assert!(la_paz.expanded);
    assert!(table.row("sedes=LA PAZ#subtotal").is_some());
}

#[test]
fn test_toggle_stale_group_is_noop() {
    let mut harness = TestHarness::with_health_forms();
    let before = harness.row_ids();
    let version = harness.session.version();

    assert!(!harness.toggle("sedes=ORURO"));
    assert_eq!(harness.session.version(), version);
    assert_eq!(harness.row_ids(), before);
}

#[test]
fn test_expand_all_collapse_all() {
    let mut harness = TestHarness::with_health_forms();
    let collapsed = harness.row_ids();

    harness.session.expand_all();
    let table = harness.table();
    assert_eq!(table.rows.len(), 16);
    assert!(table
        .rows
        .iter()
        .filter(|r| r.kind == RowKind::GroupHeader)
        .all(|r| r.expanded));

    harness.session.collapse_all();
    assert_eq!(harness.row_ids(), collapsed);
}

// ============================================================================
// CHART / DRILL DOWN
// ============================================================================

#[test]
fn test_chart_series_per_row_tuple() {
    let mut harness = TestHarness::with_health_forms();
    harness.move_field("mes", Area::Rows, None);
    let series = harness.session.chart_series();
    let keys: Vec<&str> = series.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["CHUQUISACA - 1", "LA PAZ - 1", "SANTA CRUZ - 2", "COCHABAMBA - 2", "TARIJA - 3"]
    );
    assert_eq!(series[3].values[0].value, 23.0);

    harness.move_field("totalg", Area::Available, None);
    assert!(harness.session.chart_series().is_empty());
}

#[test]
fn test_drill_down_group() {
    let mut harness = TestHarness::with_health_forms();
    harness.move_field("sedes", Area::Available, None);
    harness.move_field("formulario", Area::Rows, None);

    let result = harness
        .session
        .drill_down(&GroupId::from_path([("formulario", "VIGILANCIA EPIDEMIOLÓGICA")]), 100)
        .unwrap();
    assert_eq!(result.source_rows, vec![0, 1, 2]);
    assert_eq!(result.total_count, 3);
    assert!(!result.is_truncated);

    assert!(harness
        .session
        .drill_down(&GroupId::from("formulario=NONE"), 100)
        .is_none());
}

// ============================================================================
// INGESTION / CONFIG / LOGGING
// ============================================================================

#[test]
fn test_load_records_json() {
    let mut harness = TestHarness::new();
    harness
        .session
        .set_assignment(HealthFormsFixture::default_assignment())
        .unwrap();
    let count = harness
        .session
        .load_records_json(
            r#"[
                { "sedes": "ORURO", "formulario": "EQUIPAMIENTO", "totalg": "4" },
                { "sedes": "ORURO", "formulario": null, "totalg": 6 },
                { "sedes": "PANDO", "totalg": "n/a" }
            ]"#,
        )
        .unwrap();
    assert_eq!(count, 3);

    let table = harness.table();
    let groups: Vec<&str> = table.columns.groups().iter().map(|g| g.id.as_str()).collect();
    assert_eq!(groups, vec!["", "EQUIPAMIENTO"]);
    let grand = table.grand_total().unwrap();
    assert_cell(&table, grand, "EQUIPAMIENTO_totalg", 4.0);
    assert_cell(&table, grand, "_totalg", 6.0);

    assert!(matches!(
        harness.session.load_records_json(r#"{ "sedes": "ORURO" }"#),
        Err(SessionError::InvalidRecords(_))
    ));
}

#[test]
fn test_config_file_labels_and_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("logs").join("crosstab.log");
    let config_path = dir.path().join("config.json");
    std::fs::write(
        &config_path,
        format!(
            r#"{{ "grand_total_label": "TOTAL GENERAL", "detail_suffix": "Detalle", "log_file": {} }}"#,
            serde_json::to_string(&log_path).unwrap()
        ),
    )
    .unwrap();

    let config = SessionConfig::load(&config_path).unwrap();
    let mut session = CrosstabSession::new(config, HealthFormsFixture::catalog())
        .unwrap()
        .with_default_assignment(HealthFormsFixture::default_assignment())
        .unwrap();
    session.set_records(HealthFormsFixture::records());
    session.toggle_group(&GroupId::from("sedes=TARIJA"));

    let table = session.view().table().cloned().unwrap();
    assert_eq!(table.grand_total().unwrap().label, "TOTAL GENERAL");
    assert!(table.rows.iter().any(|r| r.label == "TARIJA - Detalle"));

    assert!(session.load_records_json(r#"{ "sedes": "ORURO" }"#).is_err());
    assert_eq!(session.load_records_json("[]").unwrap(), 0);

    assert_eq!(logging::log_path(), Some(log_path.clone()));
    logging::close_log_file();

    let contents = std::fs::read_to_string(&log_path).unwrap();
    assert!(contents.contains("|I|SESSION|set_records count=5"));
    assert!(contents.contains("|P|CROSSTAB|view"));
    assert!(contents.contains("|D|SESSION|ENTER load_records_json bytes=20"));
    assert!(contents.contains("|E|SESSION|load_records_json failed: "));
    assert!(contents.contains("|D|SESSION|EXIT load_records_json count=0"));
    assert!(contents.lines().all(|line| line.split('|').count() >= 4));
}

#[test]
fn test_unopenable_log_file_fails_session() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();

    let config = SessionConfig {
        log_file: Some(blocker.join("crosstab.log")),
        ..SessionConfig::default()
    };
    let err = CrosstabSession::new(config, HealthFormsFixture::catalog()).unwrap_err();
    assert!(matches!(err, SessionError::Io(_)));
}

#[test]
fn test_missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SessionConfig::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, SessionError::Io(_)));
}
