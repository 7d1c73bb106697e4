//! FILENAME: core/bom-hierarchy/src/index.rs
//! Descendant Index - the fact keys reachable beneath every node.
//!
//! Nodes are grouped by level and processed deepest first, so each node's set
//! is the union of its own keys and its (already finished) children's sets.
//! One bottom-up pass: O(nodes + edges) set unions.
//!
//! Must run after the tree is final. Both entry points recompute from
//! scratch, so indexing twice gives the same result.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::hierarchy::{Hierarchy, NodeIndex};

/// Computes the descendant sets without touching the hierarchy.
pub fn compute_descendants(hierarchy: &Hierarchy) -> FxHashMap<NodeIndex, FxHashSet<String>> {
    let mut by_level: Vec<Vec<NodeIndex>> = vec![Vec::new(); hierarchy.max_level() + 1];
    for (idx, node) in hierarchy.iter() {
        by_level[node.level].push(idx);
    }

    let mut sets: FxHashMap<NodeIndex, FxHashSet<String>> = FxHashMap::default();
    sets.reserve(hierarchy.len());

    for level in by_level.iter().rev() {
        for &idx in level {
            let node = hierarchy.node(idx);
            let mut set: FxHashSet<String> = node.fact_id.iter().cloned().collect();
            for child in &node.children {
                if let Some(child_set) = sets.get(child) {
                    set.extend(child_set.iter().cloned());
                }
            }
            sets.insert(idx, set);
        }
    }

    sets
}

/// Attaches the descendant sets to every node in place.
pub fn index_descendants(hierarchy: &mut Hierarchy) {
    let sets = compute_descendants(hierarchy);
    for (idx, set) in sets {
        hierarchy.node_mut(idx).descendant_fact_ids = set;
    }
    hierarchy.set_indexed(true);
    log::debug!(
        target: "hierarchy",
        "indexed descendants dimension={} root_keys={}",
        hierarchy.dimension(),
        hierarchy.root_node().descendant_fact_ids.len()
    );
}
