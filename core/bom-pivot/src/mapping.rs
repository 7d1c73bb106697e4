//! FILENAME: core/bom-pivot/src/mapping.rs
//! Dimension -> fact field mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::definition::EngineConfig;

/// The fixed table of which fact field joins each dimension.
pub const DEFAULT_FACT_FIELDS: &[(&str, &str)] = &[
    ("le", "LE"),
    ("cost_element", "COST_ELEMENT"),
    ("gmid_display", "COMPONENT_GMID"),
    ("smartcode", "ROOT_SMARTCODE"),
    ("item_cost_type", "ITEM_COST_TYPE"),
    ("material_type", "COMPONENT_MATERIAL_TYPE"),
    ("year", "ZYEAR"),
    ("mc", "MC"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    entries: BTreeMap<String, String>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        FieldMapping {
            entries: DEFAULT_FACT_FIELDS
                .iter()
                .map(|&(dim, field)| (dim.to_string(), field.to_string()))
                .collect(),
        }
    }
}

impl FieldMapping {
    /// The built-in table plus the configured overrides.
    pub fn from_config(config: &EngineConfig) -> Self {
        config
            .field_mapping_overrides
            .iter()
            .fold(FieldMapping::default(), |mapping, (dim, field)| {
                mapping.with_override(dim.clone(), field.clone())
            })
    }

    pub fn with_override(mut self, dimension: impl Into<String>, fact_field: impl Into<String>) -> Self {
        let dimension = dimension.into();
        let fact_field = fact_field.into();
        if let Some(previous) = self.entries.get(&dimension) {
            if *previous != fact_field {
                log::info!(
                    target: "pivot",
                    "overriding fact field dimension={} from={} to={}",
                    dimension, previous, fact_field
                );
            }
        }
        self.entries.insert(dimension, fact_field);
        self
    }

    /// Fact field joined by `dimension`; exact match first, then lowercase.
    pub fn fact_field(&self, dimension: &str) -> Option<&str> {
        self.entries
            .get(dimension)
            .or_else(|| self.entries.get(&dimension.to_ascii_lowercase()))
            .map(String::as_str)
    }

    pub fn contains(&self, dimension: &str) -> bool {
        self.fact_field(dimension).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(d, f)| (d.as_str(), f.as_str()))
    }
}
