//! FILENAME: core/bom-hierarchy/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HierarchyError {
    #[error("Invalid hierarchy configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
