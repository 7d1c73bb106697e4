//! FILENAME: core/bom-hierarchy/src/config.rs
//! Hierarchy configuration - how one dimension's rows are read.
//!
//! Every dimension (legal entity, cost element, smart code, ...) is built by
//! the same algorithm; only these few field names differ.

use serde::{Deserialize, Serialize};

use crate::error::HierarchyError;

/// Configuration for building one dimension's hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Dimension name (e.g. "le", "cost_element").
    pub dimension: String,

    /// Field holding the code / fact join key.
    pub id_field: String,

    /// Field holding a descriptive label for leaves.
    #[serde(default)]
    pub label_field: Option<String>,

    /// Field holding the path-encoded ancestry.
    #[serde(default = "default_path_field")]
    pub path_field: String,

    /// Separator between path segments.
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Id of the single root used in flat mode and for empty hierarchies.
    #[serde(default = "default_root_id")]
    pub root_id: String,

    #[serde(default = "default_root_label")]
    pub root_label: String,

    /// Id of the synthesized root when paths start with several segments.
    #[serde(default = "default_master_root_id")]
    pub master_root_id: String,

    #[serde(default = "default_root_label")]
    pub master_root_label: String,
}

fn default_path_field() -> String {
    "PATH".to_string()
}

fn default_separator() -> String {
    "//".to_string()
}

fn default_root_id() -> String {
    "ROOT".to_string()
}

fn default_root_label() -> String {
    "All".to_string()
}

fn default_master_root_id() -> String {
    "MASTER_ROOT".to_string()
}

impl HierarchyConfig {
    /// Creates a configuration with default path field, separator and roots.
    pub fn new(dimension: impl Into<String>, id_field: impl Into<String>) -> Self {
        HierarchyConfig {
            dimension: dimension.into(),
            id_field: id_field.into(),
            label_field: None,
            path_field: default_path_field(),
            separator: default_separator(),
            root_id: default_root_id(),
            root_label: default_root_label(),
            master_root_id: default_master_root_id(),
            master_root_label: default_root_label(),
        }
    }

    pub fn with_label_field(mut self, field: impl Into<String>) -> Self {
        self.label_field = Some(field.into());
        self
    }

    pub fn with_path_field(mut self, field: impl Into<String>) -> Self {
        self.path_field = field.into();
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, HierarchyError> {
        let config: HierarchyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HierarchyError> {
        if self.separator.is_empty() {
            return Err(HierarchyError::InvalidConfig(format!(
                "dimension '{}': separator must not be empty",
                self.dimension
            )));
        }
        if self.dimension.trim().is_empty() {
            return Err(HierarchyError::InvalidConfig("dimension name is blank".to_string()));
        }
        if self.root_id.trim().is_empty() || self.master_root_id.trim().is_empty() {
            return Err(HierarchyError::InvalidConfig(format!(
                "dimension '{}': root ids must not be blank",
                self.dimension
            )));
        }
        if self.root_id == self.master_root_id {
            return Err(HierarchyError::InvalidConfig(format!(
                "dimension '{}': root_id and master_root_id are both '{}'",
                self.dimension, self.root_id
            )));
        }
        Ok(())
    }
}
