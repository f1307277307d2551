//! Mutable declaration graph used while a snapshot is being assembled.
//!
//! Declarations live in an arena and are addressed by [`NodeId`]. Every node
//! caches the root of the tree it belongs to; the cache is refreshed for a
//! whole subtree whenever it is attached or detached, so `root_of` stays O(1).
//!
//! Dependency edges are stored once in an edge slab. The source's outgoing
//! map and the target's incoming map both hold the same [`EdgeId`], so an
//! increment through either side is visible from the other.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::iter;
use std::sync::Arc;

use tracing::{debug, warn};

use super::dependency::{DependencyCounts, DependencyKind};
use super::frozen::{FrozenGraph, FrozenNode};
use super::iter::{ChildSource, Descendants};
use super::node::{Declaration, Kind, KindTag, NodeId};
use crate::error::GraphError;

type GraphResult<T> = std::result::Result<T, GraphError>;

/// Slot of one (source, target) edge in the builder's edge slab.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct EdgeId(u32);

impl EdgeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct BuilderNode {
    name: String,
    unique_name: String,
    signature: String,
    kind: Kind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    root: NodeId,
    dependency_to: BTreeMap<NodeId, EdgeId>,
    dependency_from: BTreeMap<NodeId, EdgeId>,
}

/// Arena-backed, mutable declaration graph.
///
/// All mutators check their arguments and return [`GraphError`] for requests
/// they refuse. Broken internal invariants panic.
#[derive(Debug)]
pub struct GraphBuilder {
    nodes: Vec<BuilderNode>,
    edges: Vec<DependencyCounts>,
    free_edges: Vec<EdgeId>,
    root: NodeId,
    integrals: HashMap<String, NodeId>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Create a builder holding only an unnamed root declaration.
    pub fn new() -> Self {
        Self::with_root(Declaration::new(KindTag::Root, ""))
    }

    /// Create a builder whose root carries the given attributes.
    pub fn with_root(root: Declaration) -> Self {
        let mut builder = Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            free_edges: Vec::new(),
            root: NodeId::new(0),
            integrals: HashMap::new(),
        };
        let id = builder.add_node(root);
        builder.root = id;
        builder
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of arena slots, including detached declarations.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Create a detached declaration. It forms its own tree until attached
    /// with [`add_child`](Self::add_child).
    pub fn add_node(&mut self, decl: Declaration) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        let mut kind = Kind::empty(decl.tag);
        kind.set_body(decl.body.map(Arc::from));
        self.nodes.push(BuilderNode {
            name: decl.name,
            unique_name: decl.unique_name,
            signature: decl.signature,
            kind,
            parent: None,
            children: Vec::new(),
            root: id,
            dependency_to: BTreeMap::new(),
            dependency_from: BTreeMap::new(),
        });
        id
    }

    /// Create a declaration and attach it under `parent`.
    pub fn add_declaration(&mut self, parent: NodeId, decl: Declaration) -> GraphResult<NodeId> {
        self.check(parent)?;
        let id = self.add_node(decl);
        self.add_child(parent, id)?;
        Ok(id)
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.index()).map(|n| n.name.as_str())
    }

    pub fn unique_name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.index()).map(|n| n.unique_name.as_str())
    }

    pub fn signature(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.index()).map(|n| n.signature.as_str())
    }

    pub fn kind(&self, id: NodeId) -> Option<&Kind> {
        self.nodes.get(id.index()).map(|n| &n.kind)
    }

    pub fn tag(&self, id: NodeId) -> Option<KindTag> {
        self.kind(id).map(Kind::tag)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.index())
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Cached root of the tree `id` belongs to.
    pub fn root_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).map(|n| n.root)
    }

    /// Whether `id` is part of the graph that [`freeze`](Self::freeze) keeps.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.root_of(id) == Some(self.root)
    }

    /// Whether `ancestor` lies on the parent chain of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Count vector of the edge `from -> to`; all zero when absent.
    pub fn counts(&self, from: NodeId, to: NodeId) -> DependencyCounts {
        self.nodes
            .get(from.index())
            .and_then(|n| n.dependency_to.get(&to))
            .map(|&edge| self.edges[edge.index()])
            .unwrap_or_default()
    }

    /// Outgoing edges of `id`, ordered by target.
    pub fn dependency_to(&self, id: NodeId) -> impl Iterator<Item = (NodeId, DependencyCounts)> + '_ {
        self.nodes
            .get(id.index())
            .into_iter()
            .flat_map(|n| n.dependency_to.iter())
            .map(|(&target, &edge)| (target, self.edges[edge.index()]))
    }

    /// Incoming edges of `id`, ordered by source.
    pub fn dependency_from(&self, id: NodeId) -> impl Iterator<Item = (NodeId, DependencyCounts)> + '_ {
        self.nodes
            .get(id.index())
            .into_iter()
            .flat_map(|n| n.dependency_from.iter())
            .map(|(&source, &edge)| (source, self.edges[edge.index()]))
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len() - self.free_edges.len()
    }

    /// Sum of every live edge's count vector.
    pub fn total_counts(&self) -> DependencyCounts {
        let mut total = DependencyCounts::ZERO;
        for node in &self.nodes {
            for edge in node.dependency_to.values() {
                total += self.edges[edge.index()];
            }
        }
        total
    }

    /// Lazy pre-order walk over the descendants of `id`.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_, Self> {
        Descendants::new(self, id)
    }

    // ---------------------------------------------------------------------
    // Ownership tree
    // ---------------------------------------------------------------------

    /// Append `child` to the children of `parent`.
    ///
    /// # Errors
    ///
    /// Refuses to attach the builder root, a node that already has a parent,
    /// or a node that is `parent` itself or one of its ancestors.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> GraphResult<()> {
        self.check(parent)?;
        self.check(child)?;
        if child == self.root {
            return Err(GraphError::RootNotMovable);
        }
        if let Some(current) = self.nodes[child.index()].parent {
            return Err(GraphError::AlreadyAttached {
                child,
                parent: current,
            });
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(GraphError::OwnershipCycle {
                node: child,
                target: parent,
            });
        }

        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
        let root = self.nodes[parent.index()].root;
        self.set_subtree_root(child, root);
        Ok(())
    }

    /// Detach `child` from `parent`. Returns `false` when `child` is not a
    /// child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> GraphResult<bool> {
        self.check(parent)?;
        self.check(child)?;
        if self.nodes[child.index()].parent != Some(parent) {
            return Ok(false);
        }
        self.remove(child)
    }

    /// Detach `node` from its parent.
    ///
    /// Every dependency edge of the subtree is removed, references between
    /// the subtree and the rest of its tree are dropped, and the subtree
    /// becomes a tree of its own. Returns `false` if `node` had no parent.
    pub fn remove(&mut self, node: NodeId) -> GraphResult<bool> {
        self.check(node)?;
        if node == self.root {
            return Err(GraphError::RootNotMovable);
        }
        let Some(parent) = self.nodes[node.index()].parent else {
            return Ok(false);
        };

        let subtree: Vec<NodeId> = iter::once(node).chain(self.descendants(node)).collect();
        for &id in &subtree {
            self.strip_dependencies(id);
        }

        let tree_root = self.nodes[node.index()].root;
        let inside: HashSet<NodeId> = subtree.iter().copied().collect();
        for index in 0..self.nodes.len() {
            if self.nodes[index].root != tree_root {
                continue;
            }
            let holder_inside = inside.contains(&NodeId::from_index(index));
            self.nodes[index]
                .kind
                .remap_references(|r| (inside.contains(&r) == holder_inside).then_some(r));
        }

        self.nodes[parent.index()].children.retain(|&c| c != node);
        self.nodes[node.index()].parent = None;
        self.set_subtree_root(node, node);
        Ok(true)
    }

    /// Detach all children of `node`; returns how many were removed.
    pub fn remove_children(&mut self, node: NodeId) -> GraphResult<usize> {
        self.check(node)?;
        let children = self.nodes[node.index()].children.clone();
        let mut removed = 0;
        for child in children {
            if self.remove(child)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Move the children, edges and incoming references of `node` onto
    /// `destination`.
    ///
    /// # Returns
    ///
    /// Whether anything was moved.
    pub fn transfer(&mut self, node: NodeId, destination: NodeId) -> GraphResult<bool> {
        self.check_same_tree(node, destination)?;
        if destination == node || self.is_ancestor(node, destination) {
            return Err(GraphError::OwnershipCycle {
                node,
                target: destination,
            });
        }

        let children = std::mem::take(&mut self.nodes[node.index()].children);
        let mut changed = !children.is_empty();
        for &child in &children {
            self.nodes[child.index()].parent = Some(destination);
        }
        self.nodes[destination.index()].children.extend(children);

        changed |= self.transfer_all_dependency_from(node, destination)?;
        changed |= self.transfer_all_dependency_to(node, destination)?;
        changed |= self.redirect_references(node, destination);
        Ok(changed)
    }

    // ---------------------------------------------------------------------
    // Dependencies
    // ---------------------------------------------------------------------

    /// Record one dependency of `kind` from `from` to `to`.
    pub fn add_dependency(&mut self, from: NodeId, to: NodeId, kind: DependencyKind) -> GraphResult<()> {
        self.add_dependency_counts(from, to, DependencyCounts::of(kind))
    }

    /// Add `counts` to the edge `from -> to`, creating it on first use.
    /// An all-zero increment never creates an edge.
    pub fn add_dependency_counts(
        &mut self,
        from: NodeId,
        to: NodeId,
        counts: DependencyCounts,
    ) -> GraphResult<()> {
        self.check_same_tree(from, to)?;
        if from == to {
            return Err(GraphError::SelfDependency(from));
        }
        if counts.is_zero() {
            return Ok(());
        }

        match self.nodes[from.index()].dependency_to.get(&to).copied() {
            Some(edge) => {
                self.assert_symmetric(from, to, edge);
                self.edges[edge.index()] += counts;
            }
            None => {
                let edge = self.allocate_edge(counts);
                self.nodes[from.index()].dependency_to.insert(to, edge);
                self.nodes[to.index()].dependency_from.insert(from, edge);
            }
        }
        Ok(())
    }

    /// Remove the edge `from -> to`, returning its counts if it existed.
    pub fn remove_dependency(&mut self, from: NodeId, to: NodeId) -> GraphResult<Option<DependencyCounts>> {
        self.check(from)?;
        self.check(to)?;
        Ok(self.detach_edge(from, to))
    }

    /// Remove every incoming and outgoing edge of `node`.
    pub fn remove_all_dependencies(&mut self, node: NodeId) -> GraphResult<bool> {
        self.check(node)?;
        Ok(self.strip_dependencies(node))
    }

    /// Merge the incoming edges of `node` into `destination`'s incoming
    /// edges. Edges that would become self-edges are dropped.
    pub fn transfer_all_dependency_from(&mut self, node: NodeId, destination: NodeId) -> GraphResult<bool> {
        self.check_same_tree(node, destination)?;
        if node == destination {
            return Ok(false);
        }

        let sources: Vec<NodeId> = self.nodes[node.index()].dependency_from.keys().copied().collect();
        let changed = !sources.is_empty();
        for source in sources {
            let Some(counts) = self.detach_edge(source, node) else {
                continue;
            };
            if source != destination {
                self.add_dependency_counts(source, destination, counts)?;
            }
        }
        Ok(changed)
    }

    /// Merge the outgoing edges of `node` into `destination`'s outgoing
    /// edges. Edges that would become self-edges are dropped.
    pub fn transfer_all_dependency_to(&mut self, node: NodeId, destination: NodeId) -> GraphResult<bool> {
        self.check_same_tree(node, destination)?;
        if node == destination {
            return Ok(false);
        }

        let targets: Vec<NodeId> = self.nodes[node.index()].dependency_to.keys().copied().collect();
        let changed = !targets.is_empty();
        for target in targets {
            let Some(counts) = self.detach_edge(node, target) else {
                continue;
            };
            if target != destination {
                self.add_dependency_counts(destination, target, counts)?;
            }
        }
        Ok(changed)
    }

    // ---------------------------------------------------------------------
    // Payload references
    // ---------------------------------------------------------------------

    /// Set the type of a variable or parameter, or the return type of a
    /// function. Returns `false` for kinds without a type slot.
    pub fn set_type_ref(&mut self, node: NodeId, type_ref: Option<NodeId>) -> GraphResult<bool> {
        self.check(node)?;
        if let Some(target) = type_ref {
            self.check_same_tree(node, target)?;
        }
        let slot = match &mut self.nodes[node.index()].kind {
            Kind::Function { return_type, .. } => return_type,
            Kind::Variable { value_type, .. } | Kind::Parameter { value_type, .. } => value_type,
            _ => return Ok(false),
        };
        *slot = type_ref;
        Ok(true)
    }

    /// Append `parameter` to the parameter list of `function`.
    pub fn add_parameter(&mut self, function: NodeId, parameter: NodeId) -> GraphResult<()> {
        self.check_same_tree(function, parameter)?;
        match &mut self.nodes[function.index()].kind {
            Kind::Function { parameters, .. } => {
                parameters.push(parameter);
                Ok(())
            }
            _ => Err(GraphError::NotAFunction(function)),
        }
    }

    /// Add `base` to the base set of `class`.
    pub fn add_base(&mut self, class: NodeId, base: NodeId) -> GraphResult<bool> {
        self.check_same_tree(class, base)?;
        if class == base {
            return Err(GraphError::SelfDependency(class));
        }
        match &mut self.nodes[class.index()].kind {
            Kind::Class { bases } => Ok(bases.insert(base)),
            _ => Err(GraphError::NotAClass(class)),
        }
    }

    /// Replace the body text. Returns `false` for kinds without a body.
    pub fn set_body(&mut self, node: NodeId, body: Option<&str>) -> GraphResult<bool> {
        self.check(node)?;
        Ok(self.nodes[node.index()].kind.set_body(body.map(Arc::from)))
    }

    // ---------------------------------------------------------------------
    // Clean-up passes
    // ---------------------------------------------------------------------

    /// The unique Integral declaration for a builtin type spelling, created
    /// under the root on first use. Blank signatures have none.
    pub fn integral(&mut self, signature: &str) -> Option<NodeId> {
        let signature = signature.trim();
        if signature.is_empty() {
            return None;
        }
        if let Some(&id) = self.integrals.get(signature) {
            if self.is_attached(id) {
                return Some(id);
            }
        }

        let id = self.add_node(Declaration::integral(signature));
        let root = self.root;
        self.nodes[root.index()].children.push(id);
        self.nodes[id.index()].parent = Some(root);
        self.nodes[id.index()].root = root;
        self.integrals.insert(signature.to_string(), id);
        Some(id)
    }

    /// Replace an unresolved placeholder with its resolved declaration:
    /// transfer everything from `unknown` to `target`, then remove it.
    pub fn resolve_unknown(&mut self, unknown: NodeId, target: NodeId) -> GraphResult<bool> {
        let moved = self.transfer(unknown, target)?;
        let removed = self.remove(unknown)?;
        Ok(moved || removed)
    }

    /// Replace every remaining Unknown declaration by the Integral named
    /// after it. Edges and children of the placeholder are dropped.
    ///
    /// # Returns
    ///
    /// Number of placeholders removed.
    pub fn fold_unknowns(&mut self) -> GraphResult<usize> {
        let unknowns: Vec<NodeId> = self
            .descendants(self.root)
            .filter(|&id| self.nodes[id.index()].kind.tag() == KindTag::Unknown)
            .collect();

        let mut folded = 0;
        for unknown in unknowns {
            if !self.is_attached(unknown) {
                continue;
            }
            let name = self.nodes[unknown.index()].name.clone();
            if let Some(integral) = self.integral(&name) {
                self.redirect_references(unknown, integral);
            }
            if self.remove(unknown)? {
                folded += 1;
            }
        }

        debug!(folded, "Folded unresolved declarations into integrals");
        Ok(folded)
    }

    /// Link every method to the method it overrides with an OVERRIDE edge.
    ///
    /// For each class, base classes are searched breadth-first; the first
    /// function with the same name, the same return type and pairwise
    /// same-kind, same-type parameters is the overridden one.
    ///
    /// # Returns
    ///
    /// Number of edges created.
    pub fn link_overrides(&mut self) -> GraphResult<usize> {
        let classes: Vec<NodeId> = iter::once(self.root)
            .chain(self.descendants(self.root))
            .filter(|&id| {
                self.nodes[id.index()]
                    .kind
                    .bases()
                    .is_some_and(|bases| !bases.is_empty())
            })
            .collect();

        let mut links = Vec::new();
        for class in classes {
            let hierarchy = self.base_hierarchy(class);
            for &method in &self.nodes[class.index()].children {
                if self.nodes[method.index()].kind.tag() != KindTag::Function {
                    continue;
                }
                let overridden = hierarchy
                    .iter()
                    .flat_map(|&base| self.nodes[base.index()].children.iter().copied())
                    .find(|&candidate| self.overrides(method, candidate));
                if let Some(target) = overridden {
                    if self.counts(method, target).get(DependencyKind::Override) == 0 {
                        links.push((method, target));
                    }
                }
            }
        }

        for &(method, target) in &links {
            self.add_dependency(method, target, DependencyKind::Override)?;
        }
        debug!(links = links.len(), "Linked overriding methods");
        Ok(links.len())
    }

    // ---------------------------------------------------------------------
    // Freeze
    // ---------------------------------------------------------------------

    /// Convert into an immutable graph.
    ///
    /// Only declarations reachable from the root survive. Ids are reassigned
    /// densely in pre-order, strings are interned, and references to
    /// declarations that did not survive are dropped.
    pub fn freeze(self) -> FrozenGraph {
        let order: Vec<NodeId> = iter::once(self.root).chain(self.descendants(self.root)).collect();
        let mut remap: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        for (new, old) in order.iter().enumerate() {
            remap[old.index()] = Some(NodeId::from_index(new));
        }
        let survivor = |id: NodeId| -> NodeId {
            match remap[id.index()] {
                Some(mapped) => mapped,
                None => panic!("broken graph invariant: {} is reachable but was not kept", id),
            }
        };

        let mut interner = Interner::default();
        let mut dropped = 0usize;
        let mut frozen = Vec::with_capacity(order.len());
        for &old in &order {
            let node = &self.nodes[old.index()];

            let mut kind = node.kind.clone();
            kind.remap_references(|r| {
                let mapped = remap[r.index()];
                if mapped.is_none() {
                    dropped += 1;
                }
                mapped
            });
            let body = kind.body().map(|text| interner.intern(text));
            kind.set_body(body);

            let mut dependency_to: Vec<(NodeId, DependencyCounts)> = node
                .dependency_to
                .iter()
                .map(|(&target, &edge)| {
                    self.assert_symmetric(old, target, edge);
                    (survivor(target), self.edges[edge.index()])
                })
                .collect();
            dependency_to.sort_by_key(|&(target, _)| target);

            let mut dependency_from: Vec<(NodeId, DependencyCounts)> = node
                .dependency_from
                .iter()
                .map(|(&source, &edge)| (survivor(source), self.edges[edge.index()]))
                .collect();
            dependency_from.sort_by_key(|&(source, _)| source);

            frozen.push(FrozenNode {
                name: interner.intern(&node.name),
                unique_name: interner.intern(&node.unique_name),
                signature: interner.intern(&node.signature),
                kind,
                parent: node.parent.map(survivor),
                children: node.children.iter().map(|&c| survivor(c)).collect(),
                dependency_to: dependency_to.into_boxed_slice(),
                dependency_from: dependency_from.into_boxed_slice(),
            });
        }

        if dropped > 0 {
            warn!(dropped, "Dropped references to declarations outside the graph");
        }
        debug!(
            kept = frozen.len(),
            detached = self.nodes.len() - frozen.len(),
            "Froze declaration graph"
        );
        FrozenGraph::from_nodes(frozen)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn check(&self, id: NodeId) -> GraphResult<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }

    fn check_same_tree(&self, a: NodeId, b: NodeId) -> GraphResult<()> {
        self.check(a)?;
        self.check(b)?;
        if self.nodes[a.index()].root != self.nodes[b.index()].root {
            return Err(GraphError::DifferentRoots(a, b));
        }
        Ok(())
    }

    fn set_subtree_root(&mut self, node: NodeId, root: NodeId) {
        let subtree: Vec<NodeId> = iter::once(node).chain(self.descendants(node)).collect();
        for id in subtree {
            self.nodes[id.index()].root = root;
        }
    }

    fn assert_symmetric(&self, from: NodeId, to: NodeId, edge: EdgeId) {
        assert_eq!(
            self.nodes[to.index()].dependency_from.get(&from),
            Some(&edge),
            "broken graph invariant: edge {} -> {} is not recorded on both ends",
            from,
            to
        );
    }

    fn allocate_edge(&mut self, counts: DependencyCounts) -> EdgeId {
        match self.free_edges.pop() {
            Some(edge) => {
                self.edges[edge.index()] = counts;
                edge
            }
            None => {
                let edge = match u32::try_from(self.edges.len()) {
                    Ok(index) => EdgeId(index),
                    Err(_) => panic!("broken graph invariant: edge slab overflow"),
                };
                self.edges.push(counts);
                edge
            }
        }
    }

    fn detach_edge(&mut self, from: NodeId, to: NodeId) -> Option<DependencyCounts> {
        let edge = self.nodes[from.index()].dependency_to.get(&to).copied()?;
        self.assert_symmetric(from, to, edge);
        self.nodes[from.index()].dependency_to.remove(&to);
        self.nodes[to.index()].dependency_from.remove(&from);
        let counts = std::mem::take(&mut self.edges[edge.index()]);
        self.free_edges.push(edge);
        Some(counts)
    }

    fn strip_dependencies(&mut self, node: NodeId) -> bool {
        let targets: Vec<NodeId> = self.nodes[node.index()].dependency_to.keys().copied().collect();
        let sources: Vec<NodeId> = self.nodes[node.index()].dependency_from.keys().copied().collect();
        let changed = !targets.is_empty() || !sources.is_empty();
        for target in targets {
            self.detach_edge(node, target);
        }
        for source in sources {
            self.detach_edge(source, node);
        }
        changed
    }

    /// Point every reference to `node` at `destination` instead. A reference
    /// that would make `destination` refer to itself is dropped.
    fn redirect_references(&mut self, node: NodeId, destination: NodeId) -> bool {
        let tree_root = self.nodes[node.index()].root;
        let mut changed = false;
        for index in 0..self.nodes.len() {
            if self.nodes[index].root != tree_root {
                continue;
            }
            let holder = NodeId::from_index(index);
            changed |= self.nodes[index].kind.remap_references(|r| {
                if r != node {
                    Some(r)
                } else if holder == destination {
                    None
                } else {
                    Some(destination)
                }
            });
        }
        changed
    }

    fn base_hierarchy(&self, class: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::from([class]);
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        if let Some(bases) = self.nodes[class.index()].kind.bases() {
            queue.extend(bases.iter().copied());
        }
        while let Some(base) = queue.pop_front() {
            if !seen.insert(base) {
                continue;
            }
            order.push(base);
            if let Some(bases) = self.nodes[base.index()].kind.bases() {
                queue.extend(bases.iter().copied());
            }
        }
        order
    }

    fn overrides(&self, method: NodeId, candidate: NodeId) -> bool {
        let m = &self.nodes[method.index()];
        let c = &self.nodes[candidate.index()];
        if c.kind.tag() != KindTag::Function || m.name != c.name {
            return false;
        }
        if m.kind.type_ref() != c.kind.type_ref() {
            return false;
        }
        let (mp, cp) = (m.kind.parameters(), c.kind.parameters());
        mp.len() == cp.len()
            && mp.iter().zip(cp).all(|(&a, &b)| {
                let (a, b) = (&self.nodes[a.index()].kind, &self.nodes[b.index()].kind);
                a.tag() == b.tag() && a.type_ref() == b.type_ref()
            })
    }
}

impl ChildSource for GraphBuilder {
    fn child_slice(&self, id: NodeId) -> &[NodeId] {
        self.children(id)
    }
}

#[derive(Default)]
struct Interner {
    strings: HashSet<Arc<str>>,
}

impl Interner {
    fn intern(&mut self, text: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(text) {
            return Arc::clone(existing);
        }
        let interned: Arc<str> = Arc::from(text);
        self.strings.insert(Arc::clone(&interned));
        interned
    }
}
