//! FILENAME: core/bom-pivot/src/axis.rs
//! Axis Combination Generator.
//!
//! For each dimension on an axis, walks the hierarchy from its root and
//! collects the visible frontier: a node is shown (and not descended into)
//! when it is a leaf or collapsed in this zone; an expanded node is replaced
//! by its children. The frontiers of all axis dimensions are then crossed.
//!
//! Ceiling policy for two or more dimensions: if the naive product exceeds
//! the ceiling, the lexicographic product (first dimension outermost) is cut
//! after `ceiling` entries. Truncation is the cap that takes effect.
//!
//! Before truncating, dimensions with nothing expanded in this zone are
//! reset to their roots and listed in `reduced_fields`. A collapsed
//! dimension's frontier already is its roots, so in practice this step is a
//! no-op and `reduced_fields` stays empty.

use bom_hierarchy::{Hierarchy, NodeIndex};
use log::{debug, warn};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::definition::{CombinationLimits, Zone};
use crate::expansion::ExpansionStore;
use crate::registry::DimensionRegistry;
use crate::view::{AxisCombination, AxisLayout, AxisMember};

/// The visible frontier of one hierarchy for one zone, depth-first in child
/// order.
pub fn visible_nodes(hierarchy: &Hierarchy, store: &ExpansionStore, zone: Zone) -> Vec<NodeIndex> {
    let dimension = hierarchy.dimension();
    let mut out = Vec::new();
    let mut stack: Vec<NodeIndex> = hierarchy.roots().iter().rev().copied().collect();

    while let Some(idx) = stack.pop() {
        let node = hierarchy.node(idx);
        if node.is_leaf || !store.is_expanded(dimension, zone, &node.id) {
            out.push(idx);
        } else {
            stack.extend(node.children.iter().rev().copied());
        }
    }

    out
}

pub struct AxisCombinationGenerator<'a> {
    registry: &'a DimensionRegistry,
    store: &'a ExpansionStore,
    limits: &'a CombinationLimits,
    key_separator: &'a str,
}

impl<'a> AxisCombinationGenerator<'a> {
    pub fn new(
        registry: &'a DimensionRegistry,
        store: &'a ExpansionStore,
        limits: &'a CombinationLimits,
        key_separator: &'a str,
    ) -> Self {
        AxisCombinationGenerator {
            registry,
            store,
            limits,
            key_separator,
        }
    }

    /// Visible members of one dimension. Unknown dimensions yield nothing.
    /// Node ids are unique per hierarchy, so the `(id, label)` dedupe never
    /// drops a member of a well-formed tree.
    pub fn visible_members(&self, dimension: &str, zone: Zone) -> Vec<AxisMember> {
        let Some(hierarchy) = self.registry.get(dimension) else {
            warn!(target: "pivot", "no hierarchy for axis field dimension={} zone={}", dimension, zone);
            return Vec::new();
        };

        let mut seen: FxHashSet<(String, String)> = FxHashSet::default();
        visible_nodes(hierarchy, self.store, zone)
            .into_iter()
            .map(|idx| {
                let expanded = self.store.is_expanded(dimension, zone, &hierarchy.node(idx).id);
                AxisMember::from_node(hierarchy, idx, expanded)
            })
            .filter(|m| seen.insert((m.id.clone(), m.label.clone())))
            .collect()
    }

    fn root_members(&self, dimension: &str, zone: Zone) -> Vec<AxisMember> {
        match self.registry.get(dimension) {
            Some(hierarchy) => hierarchy
                .roots()
                .iter()
                .map(|&r| {
                    let expanded = self.store.is_expanded(dimension, zone, &hierarchy.node(r).id);
                    AxisMember::from_node(hierarchy, r, expanded)
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Generates the ordered combinations for the dimensions on one axis.
    pub fn combine<S: AsRef<str>>(&self, fields: &[S], zone: Zone) -> AxisLayout {
        let mut layout = AxisLayout::empty(zone);

        let mut lists: Vec<Vec<AxisMember>> = Vec::new();
        for field in fields {
            let field = field.as_ref();
            if layout.fields.iter().any(|f| f == field) {
                debug!(target: "pivot", "dropping repeated axis field dimension={} zone={}", field, zone);
                continue;
            }
            let members = self.visible_members(field, zone);
            if members.is_empty() {
                continue;
            }
            layout.fields.push(field.to_string());
            lists.push(members);
        }

        if lists.is_empty() {
            return layout;
        }

        layout.naive_count = product_len(&lists);
        let ceiling = self.limits.ceiling(lists.len());

        if let Some(ceiling) = ceiling {
            if layout.naive_count > ceiling {
                for (field, list) in layout.fields.iter().zip(lists.iter_mut()) {
                    if self.store.has_expanded(field, zone) {
                        continue;
                    }
                    let roots = self.root_members(field, zone);
                    if *list != roots {
                        *list = roots;
                        layout.reduced_fields.push(field.clone());
                    }
                }
                let reduced_count = product_len(&lists);
                layout.truncated = reduced_count > ceiling;
                warn!(
                    target: "pivot",
                    "combination ceiling exceeded zone={} naive={} ceiling={} reduced={:?} after_reduction={} truncated={}",
                    zone,
                    layout.naive_count,
                    ceiling,
                    layout.reduced_fields,
                    reduced_count,
                    layout.truncated
                );
            }
        }

        layout.combinations = cartesian(&lists, ceiling, self.key_separator);
        layout
    }
}

fn product_len(lists: &[Vec<AxisMember>]) -> usize {
    lists.iter().fold(1usize, |acc, l| acc.saturating_mul(l.len()))
}

/// Lexicographic cartesian product, first list outermost, stopping at `limit`.
fn cartesian(lists: &[Vec<AxisMember>], limit: Option<usize>, separator: &str) -> Vec<AxisCombination> {
    if lists.is_empty() || lists.iter().any(|l| l.is_empty()) {
        return Vec::new();
    }

    let total = product_len(lists);
    let count = limit.map_or(total, |l| l.min(total));
    let mut out = Vec::with_capacity(count);
    let mut cursor = vec![0usize; lists.len()];

    while out.len() < count {
        let members: SmallVec<[AxisMember; 4]> = cursor
            .iter()
            .zip(lists)
            .map(|(&i, list)| list[i].clone())
            .collect();
        out.push(AxisCombination::new(members, separator));

        // advance the odometer, innermost dimension fastest
        let mut pos = lists.len();
        while pos > 0 {
            pos -= 1;
            cursor[pos] += 1;
            if cursor[pos] < lists[pos].len() {
                break;
            }
            cursor[pos] = 0;
        }
    }

    out
}
