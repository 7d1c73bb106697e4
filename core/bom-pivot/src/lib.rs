//! FILENAME: core/bom-pivot/src/lib.rs
//! Hierarchical pivot engine for bill-of-materials data.
//!
//! Builds on the hierarchies from `bom-hierarchy`: places dimensions on row
//! and column axes, tracks per-axis expansion, generates the visible node
//! combinations and aggregates fact measures into a sparse matrix. Rendering
//! and data ingestion live outside this crate.
//!
//! Layers:
//! - `definition`: Serializable configuration (what the pivot IS)
//! - `registry` / `expansion`: Loaded hierarchies and expand/collapse state
//! - `axis`: Visible combinations per axis
//! - `filter`: Fact narrowing and aggregation
//! - `view`: Output for the renderer (WHAT we display)
//! - `engine`: Matrix calculation (HOW we calculate)
//! - `session`: Stateful front door for a renderer

pub mod definition;
pub mod error;
pub mod mapping;
pub mod registry;
pub mod expansion;
pub mod view;
pub mod axis;
pub mod filter;
pub mod engine;
pub mod session;

pub use definition::*;
pub use error::PivotError;
pub use mapping::{FieldMapping, DEFAULT_FACT_FIELDS};
pub use registry::DimensionRegistry;
pub use expansion::{ExpansionKey, ExpansionStore};
pub use view::*;
pub use axis::{visible_nodes, AxisCombinationGenerator};
pub use filter::{
    aggregate, aggregate_with, filter_by_combination, filter_by_node, is_all_node, Accumulator, NodeFilter,
};
pub use engine::{calculate_pivot, drill_down, PivotMatrixBuilder};
pub use session::PivotSession;
