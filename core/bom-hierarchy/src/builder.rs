//! FILENAME: core/bom-hierarchy/src/builder.rs
//! Hierarchy Builder - turns flat dimension rows into a tree.
//!
//! Two modes, chosen by looking at the data rather than the dimension:
//! - Path mode: each row carries a path such as `WORLD//EUROPE//FRANCE`.
//!   Shared prefixes are resolved through a memo keyed by
//!   `(current node, segment)`, so the build is a single pass over the rows.
//! - Flat mode: no row has a path. One root, one leaf per distinct code.
//!
//! Building never fails. Unusable rows are skipped and logged, and an input
//! that yields nothing produces the minimal single-root hierarchy.

use std::sync::Arc;

use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::config::HierarchyConfig;
use crate::hierarchy::{BuildMode, Hierarchy, HierarchyNode, NodeIndex};
use crate::record::DimensionRecord;

/// Counters reported in the build summary.
#[derive(Debug, Default)]
struct BuildStats {
    skipped: usize,
    merged: usize,
}

/// Builds hierarchies for one dimension configuration.
#[derive(Debug, Clone)]
pub struct HierarchyBuilder {
    config: HierarchyConfig,
}

impl HierarchyBuilder {
    pub fn new(config: HierarchyConfig) -> Self {
        HierarchyBuilder { config }
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Builds the hierarchy. The descendant index is NOT built here; run
    /// `index_descendants` once the tree is final.
    pub fn build(&self, records: &[DimensionRecord]) -> Hierarchy {
        let flat: Arc<[DimensionRecord]> = Arc::from(records);

        if let Err(e) = self.config.validate() {
            warn!(target: "hierarchy", "invalid configuration, using minimal hierarchy: {}", e);
            return Hierarchy::minimal(&self.config, flat);
        }

        if records.is_empty() {
            debug!(target: "hierarchy", "no records dimension={}, using minimal hierarchy", self.config.dimension);
            return Hierarchy::minimal(&self.config, flat);
        }

        let mut stats = BuildStats::default();
        let hierarchy = if has_path_data(records, &self.config.path_field) {
            self.build_from_paths(flat, &mut stats)
        } else {
            self.build_flat(flat, &mut stats)
        };

        debug!(
            target: "hierarchy",
            "built hierarchy dimension={} mode={:?} nodes={} max_level={} skipped={} merged={}",
            self.config.dimension,
            hierarchy.mode(),
            hierarchy.len(),
            hierarchy.max_level(),
            stats.skipped,
            stats.merged
        );
        hierarchy
    }

    fn child_id(&self, parent_id: &str, segment: &str) -> String {
        format!("{}{}{}", parent_id, self.config.separator, segment)
    }

    /// Label override from the configured label field, if any.
    fn record_label(&self, record: &DimensionRecord) -> Option<String> {
        self.config
            .label_field
            .as_deref()
            .and_then(|field| record.key(field))
    }

    fn build_from_paths(&self, flat: Arc<[DimensionRecord]>, stats: &mut BuildStats) -> Hierarchy {
        let config = &self.config;
        let mut hierarchy = Hierarchy::with_source(config.dimension.clone(), BuildMode::Path, flat.clone());

        // First segment -> root bucket, in discovery order.
        let mut root_buckets: FxHashMap<String, NodeIndex> = FxHashMap::default();
        let mut roots: Vec<NodeIndex> = Vec::new();
        // (current node, segment) -> child node
        let mut memo: FxHashMap<(NodeIndex, String), NodeIndex> = FxHashMap::default();
        // join key -> node it was placed on
        let mut placed: FxHashMap<String, NodeIndex> = FxHashMap::default();

        for (row, record) in flat.iter().enumerate() {
            let Some(path) = record.key(&config.path_field) else {
                warn!(
                    target: "hierarchy",
                    "skipping record without path dimension={} row={}",
                    config.dimension, row
                );
                stats.skipped += 1;
                continue;
            };

            let segments: SmallVec<[&str; 8]> = path
                .split(config.separator.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();

            let Some((&first, rest)) = segments.split_first() else {
                warn!(
                    target: "hierarchy",
                    "skipping record with empty path dimension={} row={} path={:?}",
                    config.dimension, row, path
                );
                stats.skipped += 1;
                continue;
            };

            let last = segments[segments.len() - 1];
            let fact_key = record.key(&config.id_field).unwrap_or_else(|| last.to_string());
            if let Some(&owner) = placed.get(&fact_key) {
                let owner_id = &hierarchy.node(owner).id;
                let path_id = segments.join(config.separator.as_str());
                if *owner_id != path_id {
                    warn!(
                        target: "hierarchy",
                        "skipping repeated join key dimension={} row={} key={} kept={} path={}",
                        config.dimension, row, fact_key, owner_id, path_id
                    );
                }
                stats.merged += 1;
                continue;
            }

            let mut current = match root_buckets.get(first) {
                Some(&idx) => idx,
                None => {
                    let idx = hierarchy.push_node(HierarchyNode::new(first, first, 0));
                    root_buckets.insert(first.to_string(), idx);
                    roots.push(idx);
                    idx
                }
            };

            for &segment in rest {
                let key = (current, segment.to_string());
                current = match memo.get(&key) {
                    Some(&idx) => idx,
                    None => {
                        let parent = hierarchy.node(current);
                        let node = HierarchyNode::new(
                            self.child_id(&parent.id, segment),
                            segment,
                            parent.level + 1,
                        );
                        let idx = hierarchy.push_node(node);
                        hierarchy.attach(current, idx);
                        memo.insert(key, idx);
                        idx
                    }
                };
            }

            let label = self.record_label(record);
            placed.insert(fact_key.clone(), current);
            let node = hierarchy.node_mut(current);
            node.fact_id.push(fact_key);
            if node.source.is_none() {
                node.source = Some(record.clone());
                if let Some(label) = label {
                    node.label = label;
                }
            }
        }

        if roots.is_empty() {
            warn!(
                target: "hierarchy",
                "no usable paths dimension={} records={}, using minimal hierarchy",
                config.dimension,
                flat.len()
            );
            return Hierarchy::minimal(config, flat);
        }

        hierarchy.sort_children();
        roots.sort_by_cached_key(|&r| hierarchy.sort_key(r));

        if roots.len() > 1 {
            let master_id = if hierarchy.index_of(&config.master_root_id).is_some() {
                warn!(
                    target: "hierarchy",
                    "master root id collides with a path segment dimension={} id={}",
                    config.dimension, config.master_root_id
                );
                format!("{}#", config.master_root_id)
            } else {
                config.master_root_id.clone()
            };
            let master = hierarchy.push_node(HierarchyNode::new(master_id, config.master_root_label.clone(), 0));
            for &root in &roots {
                hierarchy.attach(master, root);
            }
            hierarchy.set_roots(vec![master]);
        } else {
            hierarchy.set_roots(roots);
        }

        hierarchy.finalize_structure();
        hierarchy
    }

    fn build_flat(&self, flat: Arc<[DimensionRecord]>, stats: &mut BuildStats) -> Hierarchy {
        let config = &self.config;
        let mut hierarchy = Hierarchy::minimal(config, flat.clone());
        hierarchy.set_mode(BuildMode::Flat);
        let root = hierarchy.root();

        let mut seen: FxHashSet<String> = FxHashSet::default();
        for (row, record) in flat.iter().enumerate() {
            let Some(code) = record.key(&config.id_field) else {
                warn!(
                    target: "hierarchy",
                    "skipping record without code dimension={} field={} row={}",
                    config.dimension, config.id_field, row
                );
                stats.skipped += 1;
                continue;
            };
            if seen.contains(&code) {
                stats.merged += 1;
                continue;
            }

            let label = self.record_label(record).unwrap_or_else(|| code.clone());
            let mut node = HierarchyNode::new(self.child_id(&config.root_id, &code), label, 1);
            node.fact_id.push(code.clone());
            node.source = Some(record.clone());
            let idx = hierarchy.push_node(node);
            hierarchy.attach(root, idx);
            seen.insert(code);
        }

        hierarchy.sort_children();
        hierarchy.finalize_structure();
        hierarchy
    }
}

/// Whether at least one record carries a non-blank path.
pub fn has_path_data(records: &[DimensionRecord], path_field: &str) -> bool {
    records.iter().any(|r| r.key(path_field).is_some())
}

/// Convenience wrapper: build one dimension's hierarchy.
pub fn build_hierarchy(records: &[DimensionRecord], config: &HierarchyConfig) -> Hierarchy {
    HierarchyBuilder::new(config.clone()).build(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn le_config() -> HierarchyConfig {
        HierarchyConfig::new("le", "LE")
    }

    fn path_row(code: &str, path: &str) -> Record {
        Record::new().with("LE", code).with("PATH", path)
    }

    fn ids(h: &Hierarchy, idx: NodeIndex) -> Vec<String> {
        h.children(idx).iter().map(|&c| h.node(c).id.clone()).collect()
    }

    #[test]
    fn test_shared_prefix_reuses_nodes() {
        let records = vec![
            path_row("FR", "WORLD//EUROPE//FRANCE"),
            path_row("DE", "WORLD//EUROPE//GERMANY"),
            path_row("US", "WORLD//AMERICAS//USA"),
        ];
        let h = build_hierarchy(&records, &le_config());

        assert_eq!(h.mode(), BuildMode::Path);
        // WORLD, EUROPE, AMERICAS, FRANCE, GERMANY, USA
        assert_eq!(h.len(), 6);
        assert_eq!(h.root_node().id, "WORLD");
        assert_eq!(ids(&h, h.root()), vec!["WORLD//AMERICAS", "WORLD//EUROPE"]);

        let france = h.get("WORLD//EUROPE//FRANCE").unwrap();
        assert!(france.is_leaf);
        assert_eq!(france.level, 2);
        assert_eq!(france.fact_id.as_slice(), &["FR".to_string()]);
        assert!(france.source.is_some());
        assert!(!h.get("WORLD//EUROPE").unwrap().is_leaf);
    }

    #[test]
    fn test_multiple_first_segments_get_master_root() {
        let records = vec![
            path_row("A", "EMEA//A"),
            path_row("B", "APAC//B"),
        ];
        let h = build_hierarchy(&records, &le_config());

        assert_eq!(h.roots().len(), 1);
        let master = h.root_node();
        assert_eq!(master.id, "MASTER_ROOT");
        assert_eq!(master.level, 0);
        assert_eq!(ids(&h, h.root()), vec!["APAC", "EMEA"]);
        assert_eq!(h.get("EMEA").unwrap().level, 1);
        assert_eq!(h.get("EMEA//A").unwrap().level, 2);
        assert_eq!(h.get("EMEA").unwrap().parent, Some(h.root()));
    }

    #[test]
    fn test_blank_path_skipped() {
        let records = vec![
            path_row("A", "WORLD//A"),
            Record::new().with("LE", "B").with("PATH", "   "),
            path_row("C", "////"),
            Record::new().with("LE", "D"),
        ];
        let h = build_hierarchy(&records, &le_config());
        assert_eq!(h.len(), 2);
        assert!(h.get("WORLD//A").is_some());
        assert_eq!(h.flat_data().len(), 4);
    }

    #[test]
    fn test_empty_segments_dropped() {
        let records = vec![path_row("A", "//WORLD////A//")];
        let h = build_hierarchy(&records, &le_config());
        assert!(h.get("WORLD//A").is_some());
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn test_duplicate_leaf_key_first_wins() {
        let records = vec![
            Record::new().with("LE", "A").with("PATH", "WORLD//A").with("NAME", "First"),
            Record::new().with("LE", "A").with("PATH", "WORLD//A").with("NAME", "Second"),
        ];
        let config = le_config().with_label_field("NAME");
        let h = build_hierarchy(&records, &config);

        let leaf = h.get("WORLD//A").unwrap();
        assert_eq!(leaf.fact_id.len(), 1);
        assert_eq!(leaf.label, "First");
        assert_eq!(leaf.source.as_ref().unwrap().key("NAME"), Some("First".to_string()));
    }

    #[test]
    fn test_same_path_different_keys_is_multi_valued() {
        let records = vec![path_row("A1", "WORLD//A"), path_row("A2", "WORLD//A")];
        let h = build_hierarchy(&records, &le_config());
        let leaf = h.get("WORLD//A").unwrap();
        assert_eq!(leaf.fact_id.as_slice(), &["A1".to_string(), "A2".to_string()]);
    }

    #[test]
    fn test_repeated_key_on_other_path_is_skipped() {
        let records = vec![
            path_row("A", "WORLD//EUROPE//A"),
            path_row("A", "WORLD//ASIA//A"),
            path_row("B", "WORLD//ASIA//B"),
        ];
        let mut h = build_hierarchy(&records, &le_config());

        let holders: Vec<&str> = h
            .iter()
            .filter(|(_, n)| n.matches_fact_key("A"))
            .map(|(_, n)| n.id.as_str())
            .collect();
        assert_eq!(holders, vec!["WORLD//EUROPE//A"]);
        assert!(h.get("WORLD//ASIA//A").is_none());
        assert_eq!(ids(&h, h.index_of("WORLD//ASIA").unwrap()), vec!["WORLD//ASIA//B"]);

        crate::index::index_descendants(&mut h);
        let children: Vec<NodeIndex> = h.children(h.root()).to_vec();
        let total: usize = children
            .iter()
            .map(|&c| h.node(c).descendant_fact_ids.len())
            .sum();
        assert_eq!(total, h.root_node().descendant_fact_ids.len());
    }

    #[test]
    fn test_missing_code_falls_back_to_segment() {
        let records = vec![Record::new().with("PATH", "WORLD//X9")];
        let h = build_hierarchy(&records, &le_config());
        assert_eq!(h.get("WORLD//X9").unwrap().fact_id.as_slice(), &["X9".to_string()]);
    }

    #[test]
    fn test_flat_mode_deduplicates_and_sorts() {
        let records = vec![
            Record::new().with("MATERIAL_TYPE", "ZROH").with("DESC", "raw"),
            Record::new().with("MATERIAL_TYPE", "FERT").with("DESC", "Finished"),
            Record::new().with("MATERIAL_TYPE", "ZROH").with("DESC", "dup"),
            Record::new().with("DESC", "no code"),
        ];
        let config = HierarchyConfig::new("material_type", "MATERIAL_TYPE").with_label_field("DESC");
        let h = build_hierarchy(&records, &config);

        assert_eq!(h.mode(), BuildMode::Flat);
        assert_eq!(h.root_node().id, "ROOT");
        assert_eq!(h.len(), 3);
        let labels: Vec<&str> = h.children(h.root()).iter().map(|&c| h.node(c).label.as_str()).collect();
        assert_eq!(labels, vec!["Finished", "raw"]);
        let zroh = h.get("ROOT//ZROH").unwrap();
        assert_eq!(zroh.fact_id.as_slice(), &["ZROH".to_string()]);
        assert_eq!(zroh.level, 1);
    }

    #[test]
    fn test_empty_input_is_minimal() {
        let h = build_hierarchy(&[], &le_config());
        assert_eq!(h.len(), 1);
        assert_eq!(h.mode(), BuildMode::Empty);
        assert!(h.children(h.root()).is_empty());
    }

    #[test]
    fn test_all_rows_unusable_is_minimal() {
        let records = vec![Record::new().with("LE", "A").with("PATH", "//")];
        let h = build_hierarchy(&records, &le_config());
        assert_eq!(h.mode(), BuildMode::Empty);
        assert_eq!(h.root_node().id, "ROOT");
    }

    #[test]
    fn test_invalid_config_is_minimal() {
        let config = le_config().with_separator("");
        let h = build_hierarchy(&[path_row("A", "WORLD//A")], &config);
        assert_eq!(h.len(), 1);
        assert_eq!(h.mode(), BuildMode::Empty);
    }

    #[test]
    fn test_build_is_order_independent() {
        let forward = vec![
            path_row("FR", "WORLD//EUROPE//FRANCE"),
            path_row("US", "WORLD//AMERICAS//USA"),
            path_row("DE", "WORLD//EUROPE//germany"),
            path_row("JP", "ASIA//JAPAN"),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let tuples = |h: &Hierarchy| {
            let mut t: Vec<(String, String, usize)> = h
                .iter()
                .map(|(_, n)| (n.id.clone(), n.label.clone(), n.level))
                .collect();
            t.sort();
            t
        };

        let a = build_hierarchy(&forward, &le_config());
        let b = build_hierarchy(&backward, &le_config());
        assert_eq!(tuples(&a), tuples(&b));

        let order = |h: &Hierarchy| -> Vec<String> {
            h.preorder().into_iter().map(|i| h.node(i).id.clone()).collect()
        };
        assert_eq!(order(&a), order(&b));
    }

    #[test]
    fn test_custom_separator() {
        let records = vec![path_row("A", "WORLD > A")];
        let config = le_config().with_separator(">");
        let h = build_hierarchy(&records, &config);
        assert!(h.get("WORLD>A").is_some());
    }
}
