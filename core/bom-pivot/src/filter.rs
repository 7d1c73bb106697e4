//! FILENAME: core/bom-pivot/src/filter.rs
//! Fact Filter & Aggregator.
//!
//! Rules for narrowing facts to one hierarchy node, in priority order:
//! 1. A designated root (including a synthesized master root) keeps every
//!    fact: grand total.
//! 2. A leaf with join keys keeps facts whose mapped field equals one of them.
//! 3. Any other node keeps facts whose mapped field is in its descendant set.
//!
//! A dimension without a fact field mapping never narrows: the facts come
//! back unchanged and a warning is logged. Over-inclusion is visible in the
//! totals; silently dropping rows is not.
//!
//! Filters work on slices of fact references and return `Cow`, so identity
//! cases never copy.

use std::borrow::Cow;

use bom_hierarchy::{FactRecord, Hierarchy, HierarchyNode, NodeIndex};
use log::warn;
use smallvec::SmallVec;

use crate::definition::AggregationType;
use crate::mapping::FieldMapping;
use crate::registry::DimensionRegistry;
use crate::view::AxisCombination;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterMode {
    All,
    Exact,
    Descendants,
}

/// A resolved node filter: the node, the fact field it joins on and the rule
/// that applies.
#[derive(Debug, Clone, Copy)]
pub struct NodeFilter<'h> {
    node: &'h HierarchyNode,
    fact_field: Option<&'h str>,
    mode: FilterMode,
}

impl<'h> NodeFilter<'h> {
    /// Resolves the rule for `node`. `fact_field` of `None` (unmapped
    /// dimension) makes the filter an identity; callers log that once.
    pub fn new(hierarchy: &'h Hierarchy, node: NodeIndex, fact_field: Option<&'h str>) -> Self {
        let n = hierarchy.node(node);
        let mode = if is_all_node(hierarchy, node) || fact_field.is_none() {
            FilterMode::All
        } else if n.is_leaf && n.has_fact_id() {
            FilterMode::Exact
        } else {
            if !hierarchy.is_indexed() {
                warn!(
                    target: "pivot",
                    "filtering on an unindexed hierarchy dimension={} node={}",
                    hierarchy.dimension(),
                    n.id
                );
            }
            FilterMode::Descendants
        };
        NodeFilter {
            node: n,
            fact_field,
            mode,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.mode == FilterMode::All
    }

    pub fn matches(&self, record: &FactRecord) -> bool {
        let field = match (self.mode, self.fact_field) {
            (FilterMode::All, _) | (_, None) => return true,
            (_, Some(field)) => field,
        };
        let Some(value) = record.get(field) else {
            return false;
        };
        let node = self.node;
        let hit = match self.mode {
            FilterMode::Exact => value.with_key(|k| node.matches_fact_key(k)),
            _ => value.with_key(|k| node.descendant_fact_ids.contains(k)),
        };
        hit.unwrap_or(false)
    }

    /// Applies the filter, borrowing the input when nothing is removed.
    pub fn apply<'r, 'a>(&self, records: &'r [&'a FactRecord]) -> Cow<'r, [&'a FactRecord]> {
        if self.is_identity() {
            return Cow::Borrowed(records);
        }
        Cow::Owned(records.iter().copied().filter(|r| self.matches(r)).collect())
    }
}

/// Whether the node stands for "all" of its axis. Only the designated root
/// qualifies; a path segment that happens to be named like the master root
/// is an ordinary node.
pub fn is_all_node(hierarchy: &Hierarchy, node: NodeIndex) -> bool {
    hierarchy.is_root(node)
}

/// Facts that belong under `node` of `hierarchy`.
pub fn filter_by_node<'r, 'a>(
    records: &'r [&'a FactRecord],
    hierarchy: &Hierarchy,
    node: NodeIndex,
    mapping: &FieldMapping,
) -> Cow<'r, [&'a FactRecord]> {
    if is_all_node(hierarchy, node) {
        return Cow::Borrowed(records);
    }
    let Some(fact_field) = mapping.fact_field(hierarchy.dimension()) else {
        warn!(
            target: "pivot",
            "no fact field for dimension={}, filter skipped node={}",
            hierarchy.dimension(),
            hierarchy.node(node).id
        );
        return Cow::Borrowed(records);
    };
    NodeFilter::new(hierarchy, node, Some(fact_field)).apply(records)
}

/// Resolves the filters of every member of a combination. Members whose
/// dimension is no longer registered are dropped with a warning.
pub fn resolve_combination<'h>(
    combination: &AxisCombination,
    registry: &'h DimensionRegistry,
    mapping: &'h FieldMapping,
) -> SmallVec<[NodeFilter<'h>; 4]> {
    combination
        .members
        .iter()
        .filter_map(|member| {
            let Some(hierarchy) = registry.get(&member.dimension) else {
                warn!(
                    target: "pivot",
                    "combination member without hierarchy dimension={} key={}",
                    member.dimension, combination.key
                );
                return None;
            };
            let filter = NodeFilter::new(hierarchy, member.node, mapping.fact_field(&member.dimension));
            (!filter.is_identity()).then_some(filter)
        })
        .collect()
}

/// Applies resolved filters in sequence. Each step is an intersection, so
/// the order does not change the result.
pub fn apply_filters<'r, 'a>(records: &'r [&'a FactRecord], filters: &[NodeFilter<'_>]) -> Cow<'r, [&'a FactRecord]> {
    if filters.is_empty() {
        return Cow::Borrowed(records);
    }
    Cow::Owned(
        records
            .iter()
            .copied()
            .filter(|r| filters.iter().all(|f| f.matches(r)))
            .collect(),
    )
}

/// Facts that belong under every node of a combination.
pub fn filter_by_combination<'r, 'a>(
    records: &'r [&'a FactRecord],
    combination: &AxisCombination,
    registry: &DimensionRegistry,
    mapping: &FieldMapping,
) -> Cow<'r, [&'a FactRecord]> {
    let mut current: Cow<'r, [&'a FactRecord]> = Cow::Borrowed(records);
    for member in &combination.members {
        let Some(hierarchy) = registry.get(&member.dimension) else {
            warn!(
                target: "pivot",
                "combination member without hierarchy dimension={} key={}",
                member.dimension, combination.key
            );
            continue;
        };
        let narrowed = match filter_by_node(&current, hierarchy, member.node, mapping) {
            Cow::Borrowed(_) => continue,
            Cow::Owned(v) => v,
        };
        current = Cow::Owned(narrowed);
    }
    current
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Sum of a measure. Values that do not coerce to a finite number count as 0.
pub fn aggregate(records: &[&FactRecord], measure: &str) -> f64 {
    records.iter().map(|r| r.number(measure)).sum()
}

/// Aggregates a measure with any supported function.
pub fn aggregate_with(records: &[&FactRecord], measure: &str, aggregation: AggregationType) -> f64 {
    let mut acc = Accumulator::new();
    for record in records {
        acc.add(record.number(measure));
    }
    acc.compute(aggregation)
}

/// Running state for one measure.
#[derive(Debug, Clone, Copy, Default)]
pub struct Accumulator {
    pub sum: f64,
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Accumulator {
    pub fn new() -> Self {
        Accumulator::default()
    }

    pub fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn merge(&mut self, other: &Accumulator) {
        if other.count == 0 {
            return;
        }
        self.count += other.count;
        self.sum += other.sum;
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    pub fn compute(&self, aggregation: AggregationType) -> f64 {
        match aggregation {
            AggregationType::Sum => self.sum,
            AggregationType::Count => self.count as f64,
            AggregationType::Average => {
                if self.count > 0 {
                    self.sum / self.count as f64
                } else {
                    0.0
                }
            }
            AggregationType::Min => self.min.unwrap_or(0.0),
            AggregationType::Max => self.max.unwrap_or(0.0),
        }
    }
}
