//! FILENAME: core/bom-pivot/src/definition.rs
//! Pivot Definition - The serializable configuration.
//!
//! This module contains the types that DESCRIBE a pivot: which dimensions sit
//! on which axis, which measures are aggregated, and the engine tunables.
//! Everything here is plain data that can be saved or sent to the renderer.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PivotError;

// ============================================================================
// AXIS ZONES
// ============================================================================

/// The axis a dimension is placed on. Expansion state is kept separately
/// for each zone, so the same dimension can be expanded differently on rows
/// and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Row,
    Column,
}

impl Zone {
    pub fn as_str(self) -> &'static str {
        match self {
            Zone::Row => "row",
            Zone::Column => "column",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported aggregation functions for value fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    #[default]
    Sum,
    Count,
    Average,
    Min,
    Max,
}

impl AggregationType {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationType::Sum => "sum",
            AggregationType::Count => "count",
            AggregationType::Average => "average",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
        }
    }
}

/// A measure placed in the values area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueField {
    /// Fact field holding the measure (e.g. "COST_UNIT").
    pub field: String,

    /// Display name (e.g. "Sum of COST_UNIT").
    pub name: String,

    #[serde(default)]
    pub aggregation: AggregationType,
}

impl ValueField {
    pub fn new(field: impl Into<String>, name: impl Into<String>, aggregation: AggregationType) -> Self {
        ValueField {
            field: field.into(),
            name: name.into(),
            aggregation,
        }
    }

    /// A summed measure named after its field.
    pub fn sum(field: impl Into<String>) -> Self {
        let field = field.into();
        let name = format!("Sum of {}", field);
        ValueField::new(field, name, AggregationType::Sum)
    }

    /// Key of this measure inside a matrix row. Sums use the bare field name.
    pub fn key(&self) -> String {
        match self.aggregation {
            AggregationType::Sum => self.field.clone(),
            other => format!("{}:{}", self.field, other.as_str()),
        }
    }
}

// ============================================================================
// COMBINATION LIMITS
// ============================================================================

/// Ceilings on the number of combinations generated for one axis, by the
/// number of dimensions on that axis. A single dimension is never capped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinationLimits {
    pub two_dimensions: usize,
    pub three_dimensions: usize,
    /// Four or more dimensions.
    pub many_dimensions: usize,
}

impl Default for CombinationLimits {
    fn default() -> Self {
        CombinationLimits {
            two_dimensions: 100,
            three_dimensions: 50,
            many_dimensions: 25,
        }
    }
}

impl CombinationLimits {
    pub fn ceiling(&self, dimension_count: usize) -> Option<usize> {
        match dimension_count {
            0 | 1 => None,
            2 => Some(self.two_dimensions),
            3 => Some(self.three_dimensions),
            _ => Some(self.many_dimensions),
        }
    }
}

// ============================================================================
// ENGINE CONFIGURATION
// ============================================================================

/// Engine tunables. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub limits: CombinationLimits,

    /// Joins node ids into a combination key.
    pub key_separator: String,

    /// Key of the synthetic combination used for an axis with no dimensions.
    pub default_combination_key: String,

    /// Extra dimension -> fact field entries on top of the built-in table.
    pub field_mapping_overrides: BTreeMap<String, String>,

    /// Cap on fact indices returned by a drill-down.
    pub drill_down_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            limits: CombinationLimits::default(),
            key_separator: "|".to_string(),
            default_combination_key: "default".to_string(),
            field_mapping_overrides: BTreeMap::new(),
            drill_down_limit: 1000,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, PivotError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PivotError> {
        if self.key_separator.is_empty() {
            return Err(PivotError::InvalidConfig("key_separator must not be empty".to_string()));
        }
        if self.default_combination_key.is_empty() {
            return Err(PivotError::InvalidConfig(
                "default_combination_key must not be empty".to_string(),
            ));
        }
        let limits = &self.limits;
        if limits.two_dimensions == 0 || limits.three_dimensions == 0 || limits.many_dimensions == 0 {
            return Err(PivotError::InvalidConfig("combination limits must be positive".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// What the pivot shows: dimensions per axis (outer to inner) and measures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotDefinition {
    #[serde(default)]
    pub row_fields: Vec<String>,

    #[serde(default)]
    pub column_fields: Vec<String>,

    #[serde(default)]
    pub value_fields: Vec<ValueField>,

    /// Bumped on every change so a renderer can discard stale matrices.
    #[serde(default)]
    pub version: u64,
}

impl PivotDefinition {
    pub fn new() -> Self {
        PivotDefinition::default()
    }

    pub fn fields(&self, zone: Zone) -> &[String] {
        match zone {
            Zone::Row => &self.row_fields,
            Zone::Column => &self.column_fields,
        }
    }

    pub fn bump_version(&mut self) {
        self.version += 1;
    }
}
