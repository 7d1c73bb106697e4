//! FILENAME: core/bom-hierarchy/src/hierarchy.rs
//! Hierarchy - an arena-owned tree of dimension nodes.
//!
//! The hierarchy owns every node in a dense vector. Nodes refer to their
//! parent and children by `NodeIndex` only, never by reference, so the tree
//! can be shared as an immutable snapshot and cycles cannot be expressed.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::HierarchyConfig;
use crate::record::Record;

/// Position of a node inside its hierarchy's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Fact join keys carried by a node. Almost always zero or one key.
pub type FactKeys = SmallVec<[String; 1]>;

/// How a hierarchy was constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildMode {
    /// From path strings.
    Path,
    /// One root with every distinct code directly beneath it.
    Flat,
    /// Nothing usable in the input; a lone root.
    Empty,
}

// ============================================================================
// NODE
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct HierarchyNode {
    /// Unique within the hierarchy.
    pub id: String,

    pub label: String,

    /// Depth in the tree (root = 0).
    pub level: usize,

    pub parent: Option<NodeIndex>,

    /// Children in display order.
    pub children: Vec<NodeIndex>,

    pub is_leaf: bool,

    /// Join keys into the fact table.
    pub fact_id: FactKeys,

    /// Every fact key reachable beneath this node (filled by the index).
    pub descendant_fact_ids: FxHashSet<String>,

    /// Mirror of the last applied expansion state. The expansion store is
    /// authoritative.
    pub expanded: bool,

    /// First source row that resolved to this node.
    #[serde(skip)]
    pub source: Option<Record>,
}

impl HierarchyNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>, level: usize) -> Self {
        HierarchyNode {
            id: id.into(),
            label: label.into(),
            level,
            parent: None,
            children: Vec::new(),
            is_leaf: true,
            fact_id: FactKeys::new(),
            descendant_fact_ids: FxHashSet::default(),
            expanded: false,
            source: None,
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn has_fact_id(&self) -> bool {
        !self.fact_id.is_empty()
    }

    /// Whether a fact key equals (or is one of) this node's own join keys.
    pub fn matches_fact_key(&self, key: &str) -> bool {
        self.fact_id.iter().any(|k| k == key)
    }
}

// ============================================================================
// HIERARCHY
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Hierarchy {
    dimension: String,
    nodes: Vec<HierarchyNode>,
    nodes_map: FxHashMap<String, NodeIndex>,
    roots: Vec<NodeIndex>,
    mode: BuildMode,
    indexed: bool,
    #[serde(skip)]
    flat_data: Arc<[Record]>,
}

impl Hierarchy {
    pub(crate) fn with_source(dimension: impl Into<String>, mode: BuildMode, flat_data: Arc<[Record]>) -> Self {
        Hierarchy {
            dimension: dimension.into(),
            nodes: Vec::new(),
            nodes_map: FxHashMap::default(),
            roots: Vec::new(),
            mode,
            indexed: false,
            flat_data,
        }
    }

    /// A lone root with no children. Returned whenever the input cannot
    /// produce anything better, so consumers never deal with a missing tree.
    pub fn minimal(config: &HierarchyConfig, flat_data: Arc<[Record]>) -> Self {
        let mut hierarchy = Hierarchy::with_source(config.dimension.clone(), BuildMode::Empty, flat_data);
        let root = hierarchy.push_node(HierarchyNode::new(config.root_id.clone(), config.root_label.clone(), 0));
        hierarchy.roots.push(root);
        hierarchy
    }

    pub(crate) fn push_node(&mut self, node: HierarchyNode) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len() as u32);
        self.nodes_map.insert(node.id.clone(), idx);
        self.nodes.push(node);
        idx
    }

    /// Adds `child` under `parent` (order is fixed later by `sort_children`).
    pub(crate) fn attach(&mut self, parent: NodeIndex, child: NodeIndex) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    pub(crate) fn set_roots(&mut self, roots: Vec<NodeIndex>) {
        self.roots = roots;
    }

    pub(crate) fn set_mode(&mut self, mode: BuildMode) {
        self.mode = mode;
    }

    pub(crate) fn node_mut(&mut self, idx: NodeIndex) -> &mut HierarchyNode {
        &mut self.nodes[idx.index()]
    }

    pub(crate) fn set_indexed(&mut self, indexed: bool) {
        self.indexed = indexed;
    }

    /// Case-insensitive label order, id as tie-break.
    pub(crate) fn sort_key(&self, idx: NodeIndex) -> (String, String) {
        let node = &self.nodes[idx.index()];
        (node.label.to_lowercase(), node.id.clone())
    }

    pub(crate) fn sort_children(&mut self) {
        for i in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[i].children);
            children.sort_by_cached_key(|&c| self.sort_key(c));
            self.nodes[i].children = children;
        }
    }

    /// Recomputes `level` top-down from the roots and refreshes `is_leaf`.
    pub(crate) fn finalize_structure(&mut self) {
        let mut queue: VecDeque<(NodeIndex, usize)> = self.roots.iter().map(|&r| (r, 0)).collect();
        while let Some((idx, level)) = queue.pop_front() {
            let node = &mut self.nodes[idx.index()];
            node.level = level;
            node.is_leaf = node.children.is_empty();
            queue.extend(node.children.iter().map(|&c| (c, level + 1)));
        }
        self.indexed = false;
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Whether the descendant index is current.
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    /// The designated root. Construction guarantees there is exactly one.
    pub fn root(&self) -> NodeIndex {
        self.roots[0]
    }

    pub fn root_node(&self) -> &HierarchyNode {
        self.node(self.root())
    }

    pub fn is_root(&self, idx: NodeIndex) -> bool {
        self.roots.contains(&idx)
    }

    pub fn node(&self, idx: NodeIndex) -> &HierarchyNode {
        &self.nodes[idx.index()]
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.nodes_map.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&HierarchyNode> {
        self.index_of(id).map(|idx| self.node(idx))
    }

    pub fn children(&self, idx: NodeIndex) -> &[NodeIndex] {
        &self.nodes[idx.index()].children
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut current = self.node(idx).parent;
        while let Some(parent) = current {
            out.push(parent);
            current = self.node(parent).parent;
        }
        out
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &HierarchyNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIndex(i as u32), node))
    }

    pub fn leaves(&self) -> Vec<NodeIndex> {
        self.iter()
            .filter(|(_, node)| node.is_leaf)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn max_level(&self) -> usize {
        self.nodes.iter().map(|n| n.level).max().unwrap_or(0)
    }

    /// Depth-first pre-order from the roots, in child order.
    pub fn preorder(&self) -> Vec<NodeIndex> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeIndex> = self.roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            out.push(idx);
            stack.extend(self.children(idx).iter().rev().copied());
        }
        out
    }

    pub fn flat_data(&self) -> &Arc<[Record]> {
        &self.flat_data
    }

    // ------------------------------------------------------------------------
    // Expansion mirror
    // ------------------------------------------------------------------------

    /// Refreshes every node's `expanded` flag from an external source of
    /// truth (normally the expansion store for one zone).
    pub fn apply_expansion<F>(&mut self, is_expanded: F)
    where
        F: Fn(&str) -> bool,
    {
        for node in &mut self.nodes {
            node.expanded = node.has_children() && is_expanded(&node.id);
        }
    }

    pub fn set_node_expanded(&mut self, idx: NodeIndex, expanded: bool) {
        let node = &mut self.nodes[idx.index()];
        node.expanded = expanded && node.has_children();
    }
}
