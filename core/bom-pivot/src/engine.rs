//! FILENAME: core/bom-pivot/src/engine.rs
//! PURPOSE: The core pivot calculation engine.
//! CONTEXT: Crosses the row and column combinations, narrows the fact table
//! for every intersection and aggregates each value field into a sparse
//! matrix. Also answers drill-down requests for a single intersection.

use std::time::Instant;

use bom_hierarchy::FactRecord;
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::axis::AxisCombinationGenerator;
use crate::definition::{EngineConfig, PivotDefinition, ValueField, Zone};
use crate::expansion::ExpansionStore;
use crate::filter::{aggregate_with, apply_filters, resolve_combination, NodeFilter};
use crate::mapping::FieldMapping;
use crate::registry::DimensionRegistry;
use crate::view::{cell_key, AxisCombination, AxisLayout, DrillDownResult, PivotMatrix};

// ============================================================================
// MATRIX BUILDER
// ============================================================================

/// Builds a `PivotMatrix` from already generated axis layouts.
pub struct PivotMatrixBuilder<'a> {
    registry: &'a DimensionRegistry,
    mapping: &'a FieldMapping,

    /// Key of the synthetic combination standing in for an empty axis.
    default_key: &'a str,
}

impl<'a> PivotMatrixBuilder<'a> {
    pub fn new(registry: &'a DimensionRegistry, mapping: &'a FieldMapping, default_key: &'a str) -> Self {
        PivotMatrixBuilder {
            registry,
            mapping,
            default_key,
        }
    }

    /// Aggregates every (row, column, value field) intersection.
    ///
    /// Each row's facts are filtered once and reused for all columns and
    /// measures. Cells are only stored when at least one fact survives both
    /// filters; totals are always stored.
    pub fn build(
        &self,
        facts: &[FactRecord],
        row_axis: AxisLayout,
        column_axis: AxisLayout,
        value_fields: Vec<ValueField>,
    ) -> PivotMatrix {
        self.warn_unmapped(&row_axis);
        self.warn_unmapped(&column_axis);

        let rows = self.combinations_or_default(&row_axis);
        let columns = self.combinations_or_default(&column_axis);

        let all: Vec<&FactRecord> = facts.iter().collect();
        let measure_keys: Vec<String> = value_fields.iter().map(ValueField::key).collect();

        let column_filters: Vec<SmallVec<[NodeFilter<'_>; 4]>> = columns
            .iter()
            .map(|c| resolve_combination(c, self.registry, self.mapping))
            .collect();

        let mut cells: FxHashMap<String, FxHashMap<String, f64>> = FxHashMap::default();
        let mut row_totals: FxHashMap<String, FxHashMap<String, f64>> = FxHashMap::default();

        for row in &rows {
            let row_filters = resolve_combination(row, self.registry, self.mapping);
            let row_facts = apply_filters(&all, &row_filters);

            let totals = row_totals.entry(row.key.clone()).or_default();
            for (vf, key) in value_fields.iter().zip(&measure_keys) {
                totals.insert(key.clone(), aggregate_with(&row_facts, &vf.field, vf.aggregation));
            }

            if row_facts.is_empty() {
                continue;
            }

            for (column, filters) in columns.iter().zip(&column_filters) {
                let cell_facts = apply_filters(&row_facts, filters);
                if cell_facts.is_empty() {
                    continue;
                }
                let row_cells = cells.entry(row.key.clone()).or_default();
                for (vf, key) in value_fields.iter().zip(&measure_keys) {
                    row_cells.insert(
                        cell_key(&column.key, key),
                        aggregate_with(&cell_facts, &vf.field, vf.aggregation),
                    );
                }
            }
        }

        let mut column_totals: FxHashMap<String, f64> = FxHashMap::default();
        for (column, filters) in columns.iter().zip(&column_filters) {
            let column_facts = apply_filters(&all, filters);
            for (vf, key) in value_fields.iter().zip(&measure_keys) {
                column_totals.insert(
                    cell_key(&column.key, key),
                    aggregate_with(&column_facts, &vf.field, vf.aggregation),
                );
            }
        }

        let grand_totals: FxHashMap<String, f64> = value_fields
            .iter()
            .zip(&measure_keys)
            .map(|(vf, key)| (key.clone(), aggregate_with(&all, &vf.field, vf.aggregation)))
            .collect();

        let mut matrix = PivotMatrix::new(row_axis, column_axis, value_fields);
        matrix.cells = cells;
        matrix.row_totals = row_totals;
        matrix.column_totals = column_totals;
        matrix.grand_totals = grand_totals;
        matrix
    }

    /// The axis combinations, or the single synthetic one for an empty axis.
    fn combinations_or_default(&self, axis: &AxisLayout) -> Vec<AxisCombination> {
        if axis.is_empty() {
            vec![AxisCombination::synthetic(self.default_key)]
        } else {
            axis.combinations.clone()
        }
    }

    fn warn_unmapped(&self, axis: &AxisLayout) {
        for field in &axis.fields {
            if !self.mapping.contains(field) {
                warn!(
                    target: "pivot",
                    "no fact field for dimension={} zone={}, totals are not narrowed by it",
                    field, axis.zone
                );
            }
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Full recomputation: generates both axes from the current expansion state
/// and aggregates the matrix.
pub fn calculate_pivot(
    definition: &PivotDefinition,
    registry: &DimensionRegistry,
    store: &ExpansionStore,
    facts: &[FactRecord],
    config: &EngineConfig,
) -> PivotMatrix {
    let started = Instant::now();
    let mapping = FieldMapping::from_config(config);

    let generator = AxisCombinationGenerator::new(registry, store, &config.limits, &config.key_separator);
    let row_axis = generator.combine(&definition.row_fields, Zone::Row);
    let column_axis = generator.combine(&definition.column_fields, Zone::Column);
    debug!(
        target: "pivot",
        "axes generated rows={} columns={} truncated_rows={} truncated_columns={}",
        row_axis.len(),
        column_axis.len(),
        row_axis.truncated,
        column_axis.truncated
    );

    let builder = PivotMatrixBuilder::new(registry, &mapping, &config.default_combination_key);
    let mut matrix = builder.build(facts, row_axis, column_axis, definition.value_fields.clone());
    matrix.version = definition.version;

    info!(
        target: "pivot",
        "calculated version={} facts={} rows={} columns={} cells={} elapsed_ms={}",
        matrix.version,
        facts.len(),
        matrix.row_count(),
        matrix.column_count(),
        matrix.cell_count(),
        started.elapsed().as_millis()
    );
    matrix
}

/// Indices of the facts behind one (row, column) intersection.
pub fn drill_down(
    facts: &[FactRecord],
    row: &AxisCombination,
    column: &AxisCombination,
    registry: &DimensionRegistry,
    mapping: &FieldMapping,
    max_records: usize,
) -> DrillDownResult {
    let mut result = DrillDownResult::new(row.key.as_str(), column.key.as_str(), max_records);

    let filters: Vec<NodeFilter<'_>> = resolve_combination(row, registry, mapping)
        .into_iter()
        .chain(resolve_combination(column, registry, mapping))
        .collect();

    for (idx, record) in facts.iter().enumerate() {
        if !filters.iter().all(|f| f.matches(record)) {
            continue;
        }
        result.total_count += 1;
        if result.fact_indices.len() < max_records {
            result.fact_indices.push(idx);
        }
    }

    result.is_truncated = result.total_count > max_records;
    result
}
