//! FILENAME: core/bom-hierarchy/src/lib.rs
//! Dimension hierarchy subsystem for the BOM pivot.
//!
//! This crate turns flat dimension rows into tree-shaped hierarchies and
//! precomputes, for every node, the set of fact join keys reachable below it.
//! It has no knowledge of axes, expansion state or aggregation; those live in
//! `bom-pivot`.
//!
//! Layers:
//! - `value` / `record`: Raw dimension and fact rows (what the data IS)
//! - `config`: How a dimension's rows are interpreted
//! - `hierarchy`: Arena-owned tree of nodes
//! - `builder`: Path and flat construction
//! - `index`: Descendant fact-key index

pub mod value;
pub mod record;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod builder;
pub mod index;

pub use value::FieldValue;
pub use record::{retain_measured, DimensionRecord, FactRecord, Record};
pub use config::HierarchyConfig;
pub use error::HierarchyError;
pub use hierarchy::{BuildMode, FactKeys, Hierarchy, HierarchyNode, NodeIndex};
pub use builder::{build_hierarchy, HierarchyBuilder};
pub use index::{compute_descendants, index_descendants};
