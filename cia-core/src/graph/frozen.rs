//! Immutable declaration graph produced by [`GraphBuilder::freeze`].
//!
//! [`GraphBuilder::freeze`]: super::GraphBuilder::freeze

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::dependency::DependencyCounts;
use super::iter::{ChildSource, Descendants};
use super::node::{Kind, KindTag, NodeId};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a frozen graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphId(u64);

impl GraphId {
    fn next() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One declaration of a frozen graph.
#[derive(Clone, Debug)]
pub struct FrozenNode {
    pub(crate) name: Arc<str>,
    pub(crate) unique_name: Arc<str>,
    pub(crate) signature: Arc<str>,
    pub(crate) kind: Kind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Box<[NodeId]>,
    pub(crate) dependency_to: Box<[(NodeId, DependencyCounts)]>,
    pub(crate) dependency_from: Box<[(NodeId, DependencyCounts)]>,
}

impl FrozenNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn tag(&self) -> KindTag {
        self.kind.tag()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Read-only declaration graph with dense pre-order ids.
#[derive(Debug)]
pub struct FrozenGraph {
    id: GraphId,
    nodes: Vec<FrozenNode>,
    direct_weights: Vec<f64>,
    by_unique_name: HashMap<Arc<str>, NodeId>,
    edge_count: usize,
}

impl FrozenGraph {
    pub(crate) fn from_nodes(nodes: Vec<FrozenNode>) -> Self {
        let direct_weights = nodes
            .iter()
            .map(|node| {
                node.dependency_to
                    .iter()
                    .map(|(_, counts)| counts.forward_weight())
                    .sum()
            })
            .collect();

        let mut by_unique_name = HashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            by_unique_name
                .entry(Arc::clone(&node.unique_name))
                .or_insert_with(|| NodeId::from_index(index));
        }

        let edge_count = nodes.iter().map(|n| n.dependency_to.len()).sum();

        Self {
            id: GraphId::next(),
            nodes,
            direct_weights,
            by_unique_name,
            edge_count,
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Always `0`.
    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// # Panics
    ///
    /// If `id` is not part of this graph.
    pub fn node(&self, id: NodeId) -> &FrozenNode {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&FrozenNode> {
        self.nodes.get(id.index())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Outgoing edges of `id`, ordered by target.
    pub fn dependency_to(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &DependencyCounts)> + '_ {
        self.node(id).dependency_to.iter().map(|(t, c)| (*t, c))
    }

    /// Incoming edges of `id`, ordered by source.
    pub fn dependency_from(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &DependencyCounts)> + '_ {
        self.node(id).dependency_from.iter().map(|(s, c)| (*s, c))
    }

    pub(crate) fn incoming(&self, id: NodeId) -> &[(NodeId, DependencyCounts)] {
        &self.node(id).dependency_from
    }

    /// Count vector of the edge `from -> to`; all zero when absent.
    pub fn counts(&self, from: NodeId, to: NodeId) -> DependencyCounts {
        let edges = &self.node(from).dependency_to;
        match edges.binary_search_by_key(&to, |&(target, _)| target) {
            Ok(pos) => edges[pos].1,
            Err(_) => DependencyCounts::ZERO,
        }
    }

    /// Lazy pre-order walk over the descendants of `id`.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_, Self> {
        Descendants::new(self, id)
    }

    /// All ids in ascending (pre-order) order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::from_index)
    }

    /// Pairs of id and declaration in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &FrozenNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId::from_index(index), node))
    }

    /// First declaration in pre-order with the given unique name.
    pub fn find_by_unique_name(&self, unique_name: &str) -> Option<NodeId> {
        self.by_unique_name.get(unique_name).copied()
    }

    /// Σ forward weight × count over the outgoing edges of `id`.
    pub fn direct_weight(&self, id: NodeId) -> f64 {
        self.direct_weights[id.index()]
    }

    /// Number of declarations per kind.
    pub fn kind_histogram(&self) -> Vec<(KindTag, usize)> {
        let mut histogram: Vec<(KindTag, usize)> = Vec::new();
        for node in &self.nodes {
            match histogram.iter_mut().find(|(tag, _)| *tag == node.tag()) {
                Some((_, count)) => *count += 1,
                None => histogram.push((node.tag(), 1)),
            }
        }
        histogram.sort();
        histogram
    }

    /// Indented listing of the ownership tree with kinds, signatures and
    /// outgoing edges.
    pub fn tree_string(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(NodeId, usize)> = vec![(self.root(), 0)];
        while let Some((id, depth)) = stack.pop() {
            let node = self.node(id);
            let indent = "  ".repeat(depth);
            let _ = write!(out, "{}{} {} {}", indent, id, node.tag(), node.name());
            if !node.signature().is_empty() && node.signature() != node.name() {
                let _ = write!(out, " `{}`", node.signature());
            }
            out.push('\n');
            for (target, counts) in self.dependency_to(id) {
                let _ = writeln!(
                    out,
                    "{}  -> {} {}",
                    indent,
                    self.node(target).unique_name(),
                    counts
                );
            }
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }
}

impl ChildSource for FrozenGraph {
    fn child_slice(&self, id: NodeId) -> &[NodeId] {
        self.children(id)
    }
}
