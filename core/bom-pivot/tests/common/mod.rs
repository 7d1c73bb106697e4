//! FILENAME: tests/common/mod.rs
//! Fixtures and helpers for bom-pivot integration tests.

#![allow(dead_code)]

use bom_hierarchy::{FactRecord, Hierarchy, HierarchyConfig, Record};
use bom_pivot::{DimensionRegistry, PivotSession, ValueField};

/// A small bill-of-materials dataset.
///
/// - `le`: WORLD -> {AMERICAS -> {BRAZIL, USA}, EUROPE -> {FRANCE, GERMANY}}
/// - `cost_element`: two path roots, so a master root is synthesized
/// - `material_type`: flat codes with descriptions
pub struct BomFixture;

impl BomFixture {
    pub fn le_rows() -> Vec<(&'static str, &'static str)> {
        vec![
            ("FR01", "WORLD//EUROPE//FRANCE"),
            ("DE01", "WORLD//EUROPE//GERMANY"),
            ("US01", "WORLD//AMERICAS//USA"),
            ("BR01", "WORLD//AMERICAS//BRAZIL"),
        ]
    }

    pub fn cost_element_rows() -> Vec<(&'static str, &'static str)> {
        vec![
            ("5100", "DIRECT//MATERIAL//5100"),
            ("5200", "DIRECT//LABOR//5200"),
            ("6100", "OVERHEAD//ENERGY//6100"),
        ]
    }

    pub fn material_type_rows() -> Vec<(&'static str, &'static str)> {
        vec![
            ("ROH", "Raw material"),
            ("HALB", "Semi-finished"),
            ("FERT", "Finished"),
        ]
    }

    /// (LE, COST_ELEMENT, COMPONENT_MATERIAL_TYPE, COST_UNIT, QTY_UNIT)
    pub fn fact_rows() -> Vec<(&'static str, &'static str, &'static str, f64, f64)> {
        vec![
            ("FR01", "5100", "ROH", 100.0, 10.0),
            ("FR01", "5200", "HALB", 40.0, 2.0),
            ("DE01", "5100", "ROH", 80.0, 8.0),
            ("DE01", "6100", "FERT", 25.0, 1.0),
            ("US01", "5100", "HALB", 60.0, 6.0),
            ("US01", "5200", "ROH", 30.0, 3.0),
            ("BR01", "6100", "FERT", 15.0, 1.5),
            ("BR01", "5100", "ROH", 50.0, 5.0),
        ]
    }

    pub const COST_TOTAL: f64 = 400.0;
    pub const QTY_TOTAL: f64 = 36.5;

    pub fn le_records() -> Vec<Record> {
        Self::le_rows()
            .into_iter()
            .map(|(code, path)| Record::new().with("LE", code).with("PATH", path))
            .collect()
    }

    pub fn cost_element_records() -> Vec<Record> {
        Self::cost_element_rows()
            .into_iter()
            .map(|(code, path)| Record::new().with("COST_ELEMENT", code).with("PATH", path))
            .collect()
    }

    pub fn material_type_records() -> Vec<Record> {
        Self::material_type_rows()
            .into_iter()
            .map(|(code, desc)| {
                Record::new()
                    .with("MATERIAL_TYPE", code)
                    .with("MATERIAL_TYPE_DESC", desc)
            })
            .collect()
    }

    pub fn facts() -> Vec<FactRecord> {
        Self::fact_rows()
            .into_iter()
            .map(|(le, ce, mt, cost, qty)| {
                Record::new()
                    .with("LE", le)
                    .with("COST_ELEMENT", ce)
                    .with("COMPONENT_MATERIAL_TYPE", mt)
                    .with("COST_UNIT", cost)
                    .with("QTY_UNIT", qty)
            })
            .collect()
    }

    pub fn le_config() -> HierarchyConfig {
        HierarchyConfig::new("le", "LE")
    }

    pub fn cost_element_config() -> HierarchyConfig {
        HierarchyConfig::new("cost_element", "COST_ELEMENT")
    }

    pub fn material_type_config() -> HierarchyConfig {
        HierarchyConfig::new("material_type", "MATERIAL_TYPE").with_label_field("MATERIAL_TYPE_DESC")
    }

    /// All three dimensions, built and indexed.
    pub fn registry() -> DimensionRegistry {
        let mut registry = DimensionRegistry::new();
        registry.load(&Self::le_records(), &Self::le_config());
        registry.load(&Self::cost_element_records(), &Self::cost_element_config());
        registry.load(&Self::material_type_records(), &Self::material_type_config());
        registry
    }

    /// A session with every dimension and the facts loaded, summing both
    /// measures and with no axis fields yet.
    pub fn session() -> PivotSession {
        let mut session = PivotSession::default();
        session
            .load_dimension(&Self::le_records(), &Self::le_config())
            .expect("le loads");
        session
            .load_dimension(&Self::cost_element_records(), &Self::cost_element_config())
            .expect("cost_element loads");
        session
            .load_dimension(&Self::material_type_records(), &Self::material_type_config())
            .expect("material_type loads");
        session.load_facts(Self::facts());
        session.set_value_fields(vec![ValueField::sum("COST_UNIT"), ValueField::sum("QTY_UNIT")]);
        session
    }
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

/// Assert two aggregates are equal up to float rounding.
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

/// (id, label, level) of every node in display order.
pub fn node_tuples(hierarchy: &Hierarchy) -> Vec<(String, String, usize)> {
    hierarchy
        .preorder()
        .into_iter()
        .map(|idx| {
            let node = hierarchy.node(idx);
            (node.id.clone(), node.label.clone(), node.level)
        })
        .collect()
}
