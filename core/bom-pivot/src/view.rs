//! FILENAME: core/bom-pivot/src/view.rs
//! Pivot View - What the engine hands to the renderer.
//!
//! The renderer draws headers from the axis layouts (labels, levels,
//! expandability) and reads values from the sparse matrix. It owns all
//! markup, indentation and export formatting.

use bom_hierarchy::{Hierarchy, NodeIndex};
use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;

use crate::definition::{ValueField, Zone};

// ============================================================================
// AXIS COMBINATIONS
// ============================================================================

/// One dimension's node inside an axis combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisMember {
    pub dimension: String,
    pub node: NodeIndex,
    pub id: String,
    pub label: String,
    pub level: usize,
    pub has_children: bool,
    /// Expansion state in the zone this member was generated for.
    pub is_expanded: bool,
}

impl AxisMember {
    pub fn from_node(hierarchy: &Hierarchy, node: NodeIndex, is_expanded: bool) -> Self {
        let n = hierarchy.node(node);
        AxisMember {
            dimension: hierarchy.dimension().to_string(),
            node,
            id: n.id.clone(),
            label: n.label.clone(),
            level: n.level,
            has_children: n.has_children(),
            is_expanded: is_expanded && n.has_children(),
        }
    }
}

/// One row or column of the pivot: a node per axis dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisCombination {
    pub members: SmallVec<[AxisMember; 4]>,
    /// Member ids joined by the key separator.
    pub key: String,
    pub labels: Vec<String>,
}

impl AxisCombination {
    pub fn new(members: SmallVec<[AxisMember; 4]>, separator: &str) -> Self {
        let key = members
            .iter()
            .map(|m| m.id.as_str())
            .collect::<Vec<_>>()
            .join(separator);
        let labels = members.iter().map(|m| m.label.clone()).collect();
        AxisCombination { members, key, labels }
    }

    /// The synthetic combination of an axis without dimensions. Its filter
    /// is the identity.
    pub fn synthetic(key: impl Into<String>) -> Self {
        AxisCombination {
            members: SmallVec::new(),
            key: key.into(),
            labels: Vec::new(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member(&self, dimension: &str) -> Option<&AxisMember> {
        self.members.iter().find(|m| m.dimension == dimension)
    }
}

/// The generated combinations of one axis plus how the ceiling was applied.
#[derive(Debug, Clone, Serialize)]
pub struct AxisLayout {
    pub zone: Zone,

    /// Dimensions actually used, outer to inner.
    pub fields: Vec<String>,

    pub combinations: Vec<AxisCombination>,

    /// Dimensions reduced to their root by the ceiling policy.
    pub reduced_fields: Vec<String>,

    /// Whether the product was cut at the ceiling.
    pub truncated: bool,

    /// Size of the unrestricted cartesian product.
    pub naive_count: usize,
}

impl AxisLayout {
    pub fn empty(zone: Zone) -> Self {
        AxisLayout {
            zone,
            fields: Vec::new(),
            combinations: Vec::new(),
            reduced_fields: Vec::new(),
            truncated: false,
            naive_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.combinations.iter().map(|c| c.key.as_str()).collect()
    }

    pub fn find(&self, key: &str) -> Option<&AxisCombination> {
        self.combinations.iter().find(|c| c.key == key)
    }
}

// ============================================================================
// MATRIX
// ============================================================================

/// Key of one value inside a matrix row: `column key|measure key`.
pub fn cell_key(column_key: &str, measure_key: &str) -> String {
    format!("{}|{}", column_key, measure_key)
}

/// Row-keyed sparse matrix of aggregated values.
#[derive(Debug, Clone, Serialize)]
pub struct PivotMatrix {
    pub row_axis: AxisLayout,
    pub column_axis: AxisLayout,
    pub value_fields: Vec<ValueField>,

    /// row key -> (column key|measure key -> value). Only intersections
    /// with at least one fact are present.
    pub cells: FxHashMap<String, FxHashMap<String, f64>>,

    /// row key -> (measure key -> value) across all columns.
    pub row_totals: FxHashMap<String, FxHashMap<String, f64>>,

    /// column key|measure key -> value across all rows.
    pub column_totals: FxHashMap<String, f64>,

    /// measure key -> value over every fact.
    pub grand_totals: FxHashMap<String, f64>,

    /// Definition version this matrix was built from.
    pub version: u64,
}

impl PivotMatrix {
    pub fn new(row_axis: AxisLayout, column_axis: AxisLayout, value_fields: Vec<ValueField>) -> Self {
        PivotMatrix {
            row_axis,
            column_axis,
            value_fields,
            cells: FxHashMap::default(),
            row_totals: FxHashMap::default(),
            column_totals: FxHashMap::default(),
            grand_totals: FxHashMap::default(),
            version: 0,
        }
    }

    pub fn value(&self, row_key: &str, column_key: &str, measure_key: &str) -> Option<f64> {
        self.cells
            .get(row_key)
            .and_then(|row| row.get(&cell_key(column_key, measure_key)))
            .copied()
    }

    pub fn value_or_zero(&self, row_key: &str, column_key: &str, measure_key: &str) -> f64 {
        self.value(row_key, column_key, measure_key).unwrap_or(0.0)
    }

    pub fn row_total(&self, row_key: &str, measure_key: &str) -> Option<f64> {
        self.row_totals.get(row_key).and_then(|r| r.get(measure_key)).copied()
    }

    pub fn column_total(&self, column_key: &str, measure_key: &str) -> Option<f64> {
        self.column_totals.get(&cell_key(column_key, measure_key)).copied()
    }

    pub fn grand_total(&self, measure_key: &str) -> Option<f64> {
        self.grand_totals.get(measure_key).copied()
    }

    pub fn row_count(&self) -> usize {
        self.row_axis.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_axis.len()
    }

    /// Number of materialized values.
    pub fn cell_count(&self) -> usize {
        self.cells.values().map(|r| r.len()).sum()
    }
}

// ============================================================================
// DRILL-DOWN
// ============================================================================

/// Facts behind one matrix intersection.
#[derive(Debug, Clone, Serialize)]
pub struct DrillDownResult {
    pub row_key: String,
    pub column_key: String,

    /// Indices into the fact table.
    pub fact_indices: Vec<usize>,

    /// Total count of matching facts.
    pub total_count: usize,

    pub is_truncated: bool,

    pub max_records: usize,
}

impl DrillDownResult {
    pub fn new(row_key: impl Into<String>, column_key: impl Into<String>, max_records: usize) -> Self {
        DrillDownResult {
            row_key: row_key.into(),
            column_key: column_key.into(),
            fact_indices: Vec::new(),
            total_count: 0,
            is_truncated: false,
            max_records,
        }
    }
}
