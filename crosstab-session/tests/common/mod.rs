//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for crosstab session integration tests.

#![allow(dead_code)]

use crosstab_engine::{
    Area, Assignment, CrosstabTable, FieldCatalog, FieldSpec, GroupId, Record, VisibleRow,
};
use crosstab_session::{CrosstabSession, MoveFieldRequest, SessionConfig};

/// Test harness wrapping one session.
pub struct TestHarness {
    pub session: CrosstabSession,
}

impl TestHarness {
    /// Session over the health-form catalog with no records and no fields.
    pub fn new() -> Self {
        TestHarness {
            session: CrosstabSession::new(SessionConfig::default(), HealthFormsFixture::catalog())
                .expect("session"),
        }
    }

    /// The five health-form facts, rows=[sedes], columns=[formulario], values=[totalg].
    pub fn with_health_forms() -> Self {
        let mut harness = TestHarness {
            session: CrosstabSession::new(SessionConfig::default(), HealthFormsFixture::catalog())
                .expect("session")
                .with_default_assignment(HealthFormsFixture::default_assignment())
                .expect("default assignment"),
        };
        harness.session.set_records(HealthFormsFixture::records());
        harness
    }

    pub fn move_field(&mut self, field_id: &str, target: Area, position: Option<usize>) {
        self.session
            .move_field(&MoveFieldRequest {
                field_id: field_id.to_string(),
                target,
                position,
            })
            .expect("move field");
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        self.session.toggle_group(&GroupId::from(id))
    }

    /// The current table; panics on the no-fields sentinel.
    pub fn table(&mut self) -> CrosstabTable {
        self.session
            .view()
            .table()
            .cloned()
            .expect("expected a table")
    }

    pub fn row_ids(&mut self) -> Vec<String> {
        self.table().rows.into_iter().map(|r| r.id).collect()
    }
}

/// The sample health-form facts.
pub struct HealthFormsFixture;

impl HealthFormsFixture {
    pub fn catalog() -> FieldCatalog {
        FieldCatalog::new(vec![
            FieldSpec::dimension("gestion", "Gestión"),
            FieldSpec::dimension("mes", "Mes"),
            FieldSpec::dimension("sedes", "Sedes/Departamento"),
            FieldSpec::dimension("provincia", "Provincia"),
            FieldSpec::dimension("municipio", "Municipio"),
            FieldSpec::dimension("establecimiento", "Establecimiento"),
            FieldSpec::dimension("formulario", "Formulario"),
            FieldSpec::dimension("variable", "Variable"),
            FieldSpec::dimension("subvariable", "Subvariable"),
            FieldSpec::measure("totalv", "Total Varones"),
            FieldSpec::measure("totalm", "Total Mujeres"),
            FieldSpec::measure("totalg", "Total General"),
        ])
    }

    pub fn field(id: &str) -> FieldSpec {
        Self::catalog().get(id).cloned().expect("fixture field")
    }

    pub fn default_assignment() -> Assignment {
        Assignment::new(
            vec![Self::field("sedes")],
            vec![Self::field("formulario")],
            vec![Self::field("totalg")],
        )
    }

    /// (mes, sedes, provincia, formulario, variable, totalv, totalm, totalg)
    pub fn data() -> Vec<(&'static str, &'static str, &'static str, &'static str, &'static str, f64, f64, f64)> {
        vec![
            ("1", "CHUQUISACA", "OROPEZA", "VIGILANCIA EPIDEMIOLÓGICA", "COVID-19", 2.0, 0.0, 2.0),
            ("1", "LA PAZ", "MURILLO", "VIGILANCIA EPIDEMIOLÓGICA", "DENGUE", 5.0, 3.0, 8.0),
            ("2", "SANTA CRUZ", "ANDRÉS IBÁÑEZ", "VIGILANCIA EPIDEMIOLÓGICA", "MALARIA", 1.0, 2.0, 3.0),
            ("2", "COCHABAMBA", "CERCADO", "RECURSOS HUMANOS", "PERSONAL MÉDICO", 15.0, 8.0, 23.0),
            ("3", "TARIJA", "CERCADO", "EQUIPAMIENTO", "EQUIPOS MÉDICOS", 2.0, 1.0, 3.0),
        ]
    }

    pub fn records() -> Vec<Record> {
        Self::data()
            .into_iter()
            .map(|(mes, sedes, provincia, formulario, variable, totalv, totalm, totalg)| {
                Record::new()
                    .with("gestion", "2024")
                    .with("mes", mes)
                    .with("sedes", sedes)
                    .with("provincia", provincia)
                    .with("formulario", formulario)
                    .with("variable", variable)
                    .with("totalv", totalv)
                    .with("totalm", totalm)
                    .with("totalg", totalg)
            })
            .collect()
    }
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

/// Assert that a row carries `expected` under the leaf with `accessor`.
pub fn assert_cell(table: &CrosstabTable, row: &VisibleRow, accessor: &str, expected: f64) {
    match table.cell(row, accessor) {
        Some(n) => assert!(
            (n - expected).abs() < 0.001,
            "Row '{}' at '{}' expected {} but got {}",
            row.id, accessor, expected, n
        ),
        None => panic!("Row '{}' has no column '{}'", row.id, accessor),
    }
}
