//! FILENAME: core/bom-pivot/src/registry.rs
//! Dimension registry - one indexed hierarchy per dimension.
//!
//! Hierarchies are stored as `Arc` snapshots: built and indexed once per data
//! load, then only read. Node lookups are always scoped to a dimension.

use std::sync::Arc;

use bom_hierarchy::{index_descendants, DimensionRecord, Hierarchy, HierarchyBuilder, HierarchyConfig, NodeIndex};
use rustc_hash::FxHashMap;

use crate::error::PivotError;

#[derive(Debug, Clone, Default)]
pub struct DimensionRegistry {
    hierarchies: FxHashMap<String, Arc<Hierarchy>>,
}

impl DimensionRegistry {
    pub fn new() -> Self {
        DimensionRegistry::default()
    }

    /// Builds, indexes and registers a dimension, replacing any previous one.
    pub fn load(&mut self, records: &[DimensionRecord], config: &HierarchyConfig) -> Arc<Hierarchy> {
        let hierarchy = HierarchyBuilder::new(config.clone()).build(records);
        self.insert(hierarchy)
    }

    /// Registers an already built hierarchy under its own dimension name.
    pub fn insert(&mut self, mut hierarchy: Hierarchy) -> Arc<Hierarchy> {
        if !hierarchy.is_indexed() {
            index_descendants(&mut hierarchy);
        }
        let dimension = hierarchy.dimension().to_string();
        log::info!(
            target: "pivot",
            "registered dimension={} nodes={} mode={:?}",
            dimension,
            hierarchy.len(),
            hierarchy.mode()
        );
        let hierarchy = Arc::new(hierarchy);
        self.hierarchies.insert(dimension, Arc::clone(&hierarchy));
        hierarchy
    }

    pub fn get(&self, dimension: &str) -> Option<&Arc<Hierarchy>> {
        self.hierarchies.get(dimension)
    }

    pub fn require(&self, dimension: &str) -> Result<&Arc<Hierarchy>, PivotError> {
        self.get(dimension)
            .ok_or_else(|| PivotError::UnknownDimension(dimension.to_string()))
    }

    /// Scoped `(dimension, node id)` lookup.
    pub fn node(&self, dimension: &str, node_id: &str) -> Result<NodeIndex, PivotError> {
        self.require(dimension)?
            .index_of(node_id)
            .ok_or_else(|| PivotError::UnknownNode {
                dimension: dimension.to_string(),
                node_id: node_id.to_string(),
            })
    }

    /// Refreshes the node-level `expanded` mirror of one dimension.
    /// Copies the hierarchy first if a snapshot is still shared elsewhere.
    pub fn apply_expansion<F>(&mut self, dimension: &str, is_expanded: F)
    where
        F: Fn(&str) -> bool,
    {
        if let Some(hierarchy) = self.hierarchies.get_mut(dimension) {
            Arc::make_mut(hierarchy).apply_expansion(is_expanded);
        }
    }

    pub fn contains(&self, dimension: &str) -> bool {
        self.hierarchies.contains_key(dimension)
    }

    /// Registered dimension names in sorted order.
    pub fn dimensions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.hierarchies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.hierarchies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hierarchies.is_empty()
    }

    pub fn clear(&mut self) {
        self.hierarchies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bom_hierarchy::Record;

    fn le_records() -> Vec<Record> {
        vec![
            Record::new().with("LE", "A").with("PATH", "WORLD//A"),
            Record::new().with("LE", "B").with("PATH", "WORLD//B"),
        ]
    }

    #[test]
    fn test_load_indexes_hierarchy() {
        let mut registry = DimensionRegistry::new();
        let h = registry.load(&le_records(), &HierarchyConfig::new("le", "LE"));
        assert!(h.is_indexed());
        assert_eq!(h.root_node().descendant_fact_ids.len(), 2);
        assert!(registry.contains("le"));
        assert_eq!(registry.dimensions(), vec!["le"]);
    }

    #[test]
    fn test_scoped_node_lookup() {
        let mut registry = DimensionRegistry::new();
        registry.load(&le_records(), &HierarchyConfig::new("le", "LE"));

        assert!(registry.node("le", "WORLD//A").is_ok());
        assert!(matches!(
            registry.node("le", "WORLD//Z"),
            Err(PivotError::UnknownNode { .. })
        ));
        assert!(matches!(
            registry.node("mc", "WORLD//A"),
            Err(PivotError::UnknownDimension(_))
        ));
    }

    #[test]
    fn test_reload_replaces_dimension() {
        let mut registry = DimensionRegistry::new();
        registry.load(&le_records(), &HierarchyConfig::new("le", "LE"));
        registry.load(&[], &HierarchyConfig::new("le", "LE"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.require("le").unwrap().len(), 1);
    }

    #[test]
    fn test_apply_expansion_copies_shared_snapshot() {
        let mut registry = DimensionRegistry::new();
        let snapshot = registry.load(&le_records(), &HierarchyConfig::new("le", "LE"));
        registry.apply_expansion("le", |id| id == "WORLD");

        assert!(registry.require("le").unwrap().root_node().expanded);
        assert!(!snapshot.root_node().expanded);
    }
}
