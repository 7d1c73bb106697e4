//! FILENAME: core/bom-pivot/src/session.rs
//! Pivot session - the state a renderer talks to.
//!
//! Holds the loaded dimensions and facts, the expansion store and the current
//! definition. Every field or expansion change bumps the definition version;
//! `rebuild` recomputes the whole matrix and supersedes the previous one.

use std::sync::Arc;

use bom_hierarchy::{DimensionRecord, FactRecord, Hierarchy, HierarchyConfig};
use log::{debug, info};

use crate::definition::{EngineConfig, PivotDefinition, ValueField, Zone};
use crate::engine::{calculate_pivot, drill_down};
use crate::error::PivotError;
use crate::expansion::ExpansionStore;
use crate::mapping::FieldMapping;
use crate::registry::DimensionRegistry;
use crate::view::{AxisCombination, DrillDownResult, PivotMatrix};

#[derive(Debug, Clone)]
pub struct PivotSession {
    config: EngineConfig,
    mapping: FieldMapping,
    registry: DimensionRegistry,
    facts: Arc<[FactRecord]>,
    store: ExpansionStore,
    definition: PivotDefinition,
    matrix: Option<PivotMatrix>,
}

impl Default for PivotSession {
    fn default() -> Self {
        PivotSession::with_config_unchecked(EngineConfig::default())
    }
}

impl PivotSession {
    pub fn new(config: EngineConfig) -> Result<Self, PivotError> {
        config.validate()?;
        Ok(PivotSession::with_config_unchecked(config))
    }

    fn with_config_unchecked(config: EngineConfig) -> Self {
        PivotSession {
            mapping: FieldMapping::from_config(&config),
            config,
            registry: DimensionRegistry::new(),
            facts: Arc::from(Vec::new()),
            store: ExpansionStore::new(),
            definition: PivotDefinition::new(),
            matrix: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn registry(&self) -> &DimensionRegistry {
        &self.registry
    }

    pub fn expansion(&self) -> &ExpansionStore {
        &self.store
    }

    pub fn definition(&self) -> &PivotDefinition {
        &self.definition
    }

    pub fn facts(&self) -> &Arc<[FactRecord]> {
        &self.facts
    }

    // ------------------------------------------------------------------------
    // Data loads
    // ------------------------------------------------------------------------

    /// Builds and indexes one dimension, replacing any previous version.
    pub fn load_dimension(
        &mut self,
        records: &[DimensionRecord],
        config: &HierarchyConfig,
    ) -> Result<Arc<Hierarchy>, PivotError> {
        config.validate()?;
        self.registry.load(records, config);
        self.refresh_mirror(&config.dimension, Zone::Row);
        self.matrix = None;
        self.definition.bump_version();
        self.registry.require(&config.dimension).map(Arc::clone)
    }

    /// Replaces the fact table. A fresh load starts with everything collapsed.
    pub fn load_facts(&mut self, records: Vec<FactRecord>) {
        info!(target: "pivot", "loaded facts count={}", records.len());
        self.facts = Arc::from(records);
        self.store.clear();
        let dimensions: Vec<String> = self.registry.dimensions().into_iter().map(String::from).collect();
        for dimension in &dimensions {
            self.refresh_mirror(dimension, Zone::Row);
        }
        self.matrix = None;
        self.definition.bump_version();
    }

    // ------------------------------------------------------------------------
    // Field changes
    // ------------------------------------------------------------------------

    pub fn set_row_fields(&mut self, fields: Vec<String>) {
        debug!(target: "pivot", "set_row_fields fields={:?}", fields);
        self.definition.row_fields = fields;
        self.definition.bump_version();
    }

    pub fn set_column_fields(&mut self, fields: Vec<String>) {
        debug!(target: "pivot", "set_column_fields fields={:?}", fields);
        self.definition.column_fields = fields;
        self.definition.bump_version();
    }

    pub fn set_value_fields(&mut self, fields: Vec<ValueField>) {
        debug!(target: "pivot", "set_value_fields count={}", fields.len());
        self.definition.value_fields = fields;
        self.definition.bump_version();
    }

    /// Replaces the whole definition, keeping the version monotonic.
    pub fn set_definition(&mut self, mut definition: PivotDefinition) {
        definition.version = self.definition.version + 1;
        self.definition = definition;
    }

    // ------------------------------------------------------------------------
    // Expansion
    // ------------------------------------------------------------------------

    pub fn set_expanded(&mut self, dimension: &str, zone: Zone, node_id: &str, expanded: bool) -> Result<(), PivotError> {
        self.registry.node(dimension, node_id)?;
        self.store.set_expanded(dimension, zone, node_id, expanded);
        self.refresh_mirror(dimension, zone);
        self.definition.bump_version();
        Ok(())
    }

    /// Flips a node and returns its new state.
    pub fn toggle(&mut self, dimension: &str, zone: Zone, node_id: &str) -> Result<bool, PivotError> {
        self.registry.node(dimension, node_id)?;
        let expanded = self.store.toggle(dimension, zone, node_id);
        self.refresh_mirror(dimension, zone);
        self.definition.bump_version();
        Ok(expanded)
    }

    pub fn expand_all(&mut self, dimension: &str, zone: Zone) -> Result<(), PivotError> {
        let hierarchy = Arc::clone(self.registry.require(dimension)?);
        self.store.expand_all(dimension, zone, &hierarchy);
        self.refresh_mirror(dimension, zone);
        self.definition.bump_version();
        Ok(())
    }

    pub fn expand_to_level(&mut self, dimension: &str, zone: Zone, level: usize) -> Result<(), PivotError> {
        let hierarchy = Arc::clone(self.registry.require(dimension)?);
        self.store.expand_to_level(dimension, zone, &hierarchy, level);
        self.refresh_mirror(dimension, zone);
        self.definition.bump_version();
        Ok(())
    }

    pub fn collapse_all(&mut self, dimension: &str, zone: Zone) -> Result<(), PivotError> {
        self.registry.require(dimension)?;
        self.store.collapse_all(dimension, zone);
        self.refresh_mirror(dimension, zone);
        self.definition.bump_version();
        Ok(())
    }

    /// Copies the zone's state onto the node-level `expanded` flags.
    fn refresh_mirror(&mut self, dimension: &str, zone: Zone) {
        let store = &self.store;
        self.registry
            .apply_expansion(dimension, |id| store.is_expanded(dimension, zone, id));
    }

    // ------------------------------------------------------------------------
    // Calculation
    // ------------------------------------------------------------------------

    /// Recomputes the matrix from scratch.
    pub fn rebuild(&mut self) -> &PivotMatrix {
        let matrix = calculate_pivot(&self.definition, &self.registry, &self.store, &self.facts, &self.config);
        self.matrix.insert(matrix)
    }

    /// The last built matrix.
    pub fn matrix(&self) -> Option<&PivotMatrix> {
        self.matrix.as_ref()
    }

    /// Facts behind one cell of the last built matrix. `max_records` falls
    /// back to the configured drill-down limit. Fails when the definition
    /// changed since that matrix was built.
    pub fn drill_down(
        &self,
        row_key: &str,
        column_key: &str,
        max_records: Option<usize>,
    ) -> Result<DrillDownResult, PivotError> {
        let matrix = self
            .matrix
            .as_ref()
            .ok_or_else(|| PivotError::UnknownCombination(row_key.to_string()))?;
        if matrix.version != self.definition.version {
            return Err(PivotError::StaleMatrix {
                built: matrix.version,
                current: self.definition.version,
            });
        }
        let row = self.resolve_combination(&matrix.row_axis.combinations, row_key)?;
        let column = self.resolve_combination(&matrix.column_axis.combinations, column_key)?;
        let max_records = max_records.unwrap_or(self.config.drill_down_limit);

        Ok(drill_down(
            &self.facts,
            &row,
            &column,
            &self.registry,
            &self.mapping,
            max_records,
        ))
    }

    fn resolve_combination(&self, combinations: &[AxisCombination], key: &str) -> Result<AxisCombination, PivotError> {
        if combinations.is_empty() && key == self.config.default_combination_key {
            return Ok(AxisCombination::synthetic(key));
        }
        combinations
            .iter()
            .find(|c| c.key == key)
            .cloned()
            .ok_or_else(|| PivotError::UnknownCombination(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bom_hierarchy::Record;

    fn session() -> PivotSession {
        let mut session = PivotSession::default();
        let le = vec![
            Record::new().with("LE", "A").with("PATH", "WORLD//A"),
            Record::new().with("LE", "B").with("PATH", "WORLD//B"),
        ];
        session.load_dimension(&le, &HierarchyConfig::new("le", "LE")).unwrap();
        session.load_facts(vec![
            Record::new().with("LE", "A").with("COST_UNIT", 10.0),
            Record::new().with("LE", "B").with("COST_UNIT", 5.0),
        ]);
        session.set_row_fields(vec!["le".to_string()]);
        session.set_value_fields(vec![ValueField::sum("COST_UNIT")]);
        session
    }

    #[test]
    fn test_rebuild_after_toggle() {
        let mut session = session();
        assert_eq!(session.rebuild().row_count(), 1);

        assert!(session.toggle("le", Zone::Row, "WORLD").unwrap());
        let matrix = session.rebuild();
        assert_eq!(matrix.row_axis.keys(), vec!["WORLD//A", "WORLD//B"]);
        assert_eq!(matrix.value("WORLD//A", "default", "COST_UNIT"), Some(10.0));
        assert_eq!(matrix.value("WORLD//B", "default", "COST_UNIT"), Some(5.0));
    }

    #[test]
    fn test_expansion_validates_node() {
        let mut session = session();
        assert!(matches!(
            session.set_expanded("le", Zone::Row, "WORLD//Z", true),
            Err(PivotError::UnknownNode { .. })
        ));
        assert!(matches!(
            session.toggle("mc", Zone::Row, "ROOT"),
            Err(PivotError::UnknownDimension(_))
        ));
        assert!(session.expansion().is_empty());
    }

    #[test]
    fn test_mirror_follows_zone() {
        let mut session = session();
        session.set_expanded("le", Zone::Column, "WORLD", true).unwrap();
        assert!(session.registry().require("le").unwrap().root_node().expanded);

        session.set_expanded("le", Zone::Row, "WORLD", false).unwrap();
        assert!(!session.registry().require("le").unwrap().root_node().expanded);
    }

    #[test]
    fn test_load_facts_clears_expansion() {
        let mut session = session();
        session.set_expanded("le", Zone::Row, "WORLD", true).unwrap();
        session.rebuild();
        session.load_facts(vec![Record::new().with("LE", "A").with("COST_UNIT", 1.0)]);

        assert!(session.expansion().is_empty());
        assert!(session.matrix().is_none());
        let matrix = session.rebuild();
        assert_eq!(matrix.row_axis.keys(), vec!["WORLD"]);
        assert_eq!(matrix.grand_total("COST_UNIT"), Some(1.0));
    }

    #[test]
    fn test_versions_increase() {
        let mut session = session();
        let before = session.definition().version;
        session.set_column_fields(Vec::new());
        session.toggle("le", Zone::Row, "WORLD").unwrap();
        assert_eq!(session.definition().version, before + 2);
        assert_eq!(session.rebuild().version, before + 2);

        session.set_definition(PivotDefinition::new());
        assert_eq!(session.definition().version, before + 3);
    }

    #[test]
    fn test_drill_down_from_session() {
        let mut session = session();
        session.toggle("le", Zone::Row, "WORLD").unwrap();
        assert!(session.drill_down("WORLD//A", "default", None).is_err());

        session.rebuild();
        let result = session.drill_down("WORLD//A", "default", None).unwrap();
        assert_eq!(result.fact_indices, vec![0]);
        assert_eq!(result.max_records, 1000);
        assert!(matches!(
            session.drill_down("WORLD//C", "default", None),
            Err(PivotError::UnknownCombination(_))
        ));
    }

    #[test]
    fn test_drill_down_rejects_stale_matrix() {
        let mut session = session();
        session.toggle("le", Zone::Row, "WORLD").unwrap();
        session.rebuild();
        session.toggle("le", Zone::Row, "WORLD").unwrap();

        assert!(matches!(
            session.drill_down("WORLD//A", "default", None),
            Err(PivotError::StaleMatrix { .. })
        ));
        session.rebuild();
        assert!(matches!(
            session.drill_down("WORLD//A", "default", None),
            Err(PivotError::UnknownCombination(_))
        ));
        assert_eq!(session.drill_down("WORLD", "default", None).unwrap().total_count, 2);
    }

    #[test]
    fn test_dimension_reload_bumps_version() {
        let mut session = session();
        let built = session.rebuild().version;

        let le = vec![Record::new().with("LE", "A").with("PATH", "WORLD//A")];
        session.load_dimension(&le, &HierarchyConfig::new("le", "LE")).unwrap();
        assert!(session.matrix().is_none());
        assert_eq!(session.definition().version, built + 1);
        assert_eq!(session.rebuild().version, built + 1);
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let config = EngineConfig {
            key_separator: String::new(),
            ..EngineConfig::default()
        };
        assert!(matches!(PivotSession::new(config), Err(PivotError::InvalidConfig(_))));

        let mut session = PivotSession::default();
        let bad = HierarchyConfig::new("le", "LE").with_separator("");
        assert!(matches!(
            session.load_dimension(&[], &bad),
            Err(PivotError::Hierarchy(_))
        ));
    }

    #[test]
    fn test_expand_all_and_collapse_all() {
        let mut session = session();
        session.expand_all("le", Zone::Row).unwrap();
        assert_eq!(session.rebuild().row_count(), 2);
        session.collapse_all("le", Zone::Row).unwrap();
        assert_eq!(session.rebuild().row_count(), 1);
        session.expand_to_level("le", Zone::Row, 1).unwrap();
        assert_eq!(session.rebuild().row_count(), 2);
    }
}
