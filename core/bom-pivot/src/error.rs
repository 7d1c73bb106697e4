//! FILENAME: core/bom-pivot/src/error.rs

use bom_hierarchy::HierarchyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PivotError {
    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    #[error("Unknown node '{node_id}' in dimension '{dimension}'")]
    UnknownNode { dimension: String, node_id: String },

    #[error("Unknown combination key: {0}")]
    UnknownCombination(String),

    #[error("Pivot matrix is stale: built from version {built}, definition is at {current}")]
    StaleMatrix { built: u64, current: u64 },

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),
}
