//! FILENAME: core/bom-pivot/src/expansion.rs
//! Expansion State Store.
//!
//! Keyed by (dimension, zone, node id). Row and column zones are independent.
//! Initialized empty on a data load, then changed only by explicit
//! expand/collapse calls. Only expanded nodes are stored; absence means
//! collapsed.

use bom_hierarchy::Hierarchy;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::definition::Zone;

/// Fully qualified expansion key, used when listing the store's contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExpansionKey {
    pub dimension: String,
    pub zone: Zone,
    pub node_id: String,
}

/// Per-dimension states, one map per zone.
#[derive(Debug, Clone, Default)]
struct DimensionExpansion {
    row: FxHashMap<String, bool>,
    column: FxHashMap<String, bool>,
}

impl DimensionExpansion {
    fn zone(&self, zone: Zone) -> &FxHashMap<String, bool> {
        match zone {
            Zone::Row => &self.row,
            Zone::Column => &self.column,
        }
    }

    fn zone_mut(&mut self, zone: Zone) -> &mut FxHashMap<String, bool> {
        match zone {
            Zone::Row => &mut self.row,
            Zone::Column => &mut self.column,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExpansionStore {
    dimensions: FxHashMap<String, DimensionExpansion>,
}

impl ExpansionStore {
    pub fn new() -> Self {
        ExpansionStore::default()
    }

    /// Defaults to collapsed.
    pub fn is_expanded(&self, dimension: &str, zone: Zone, node_id: &str) -> bool {
        self.dimensions
            .get(dimension)
            .and_then(|d| d.zone(zone).get(node_id))
            .copied()
            .unwrap_or(false)
    }

    pub fn set_expanded(&mut self, dimension: &str, zone: Zone, node_id: &str, expanded: bool) {
        log::debug!(
            target: "expansion",
            "set_expanded dimension={} zone={} node={} expanded={}",
            dimension, zone, node_id, expanded
        );
        if expanded {
            self.dimensions
                .entry(dimension.to_string())
                .or_default()
                .zone_mut(zone)
                .insert(node_id.to_string(), true);
        } else if let Some(d) = self.dimensions.get_mut(dimension) {
            d.zone_mut(zone).remove(node_id);
        }
    }

    /// Flips a node and returns its new state.
    pub fn toggle(&mut self, dimension: &str, zone: Zone, node_id: &str) -> bool {
        let expanded = !self.is_expanded(dimension, zone, node_id);
        self.set_expanded(dimension, zone, node_id, expanded);
        expanded
    }

    /// Whether any node of the dimension is expanded in this zone.
    pub fn has_expanded(&self, dimension: &str, zone: Zone) -> bool {
        self.dimensions
            .get(dimension)
            .is_some_and(|d| d.zone(zone).values().any(|&v| v))
    }

    /// Expanded node ids, sorted.
    pub fn expanded_nodes(&self, dimension: &str, zone: Zone) -> Vec<String> {
        let mut ids: Vec<String> = self
            .dimensions
            .get(dimension)
            .map(|d| {
                d.zone(zone)
                    .iter()
                    .filter(|&(_, &v)| v)
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Expands every node that has children.
    pub fn expand_all(&mut self, dimension: &str, zone: Zone, hierarchy: &Hierarchy) {
        let states = self.dimensions.entry(dimension.to_string()).or_default().zone_mut(zone);
        for (_, node) in hierarchy.iter() {
            if node.has_children() {
                states.insert(node.id.clone(), true);
            }
        }
    }

    /// Expands nodes above `level` and collapses everything else, so the
    /// visible frontier sits at `level` (or at shallower leaves).
    pub fn expand_to_level(&mut self, dimension: &str, zone: Zone, hierarchy: &Hierarchy, level: usize) {
        let states = self.dimensions.entry(dimension.to_string()).or_default().zone_mut(zone);
        states.clear();
        for (_, node) in hierarchy.iter() {
            if node.has_children() && node.level < level {
                states.insert(node.id.clone(), true);
            }
        }
    }

    pub fn collapse_all(&mut self, dimension: &str, zone: Zone) {
        if let Some(d) = self.dimensions.get_mut(dimension) {
            d.zone_mut(zone).clear();
        }
    }

    /// Forgets everything. Called on a fresh data load.
    pub fn clear(&mut self) {
        self.dimensions.clear();
    }

    /// Every expanded entry, sorted.
    pub fn entries(&self) -> Vec<ExpansionKey> {
        let mut out: Vec<ExpansionKey> = Vec::new();
        for (dimension, d) in &self.dimensions {
            for zone in [Zone::Row, Zone::Column] {
                out.extend(d.zone(zone).iter().filter(|&(_, &v)| v).map(|(id, _)| ExpansionKey {
                    dimension: dimension.clone(),
                    zone,
                    node_id: id.clone(),
                }));
            }
        }
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.dimensions
            .values()
            .map(|d| d.row.len() + d.column.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
