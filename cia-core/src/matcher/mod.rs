//! Structural equivalence of declarations across two frozen graphs.
//!
//! A [`Matcher`] decides whether two declarations are equal at a given
//! [`MatchLevel`] and memoises both the verdicts and per-level hashes. It is
//! meant to live for one diff run on one thread.
//!
//! # Levels
//!
//! - **PrototypeSimilar**: same kind
//! - **PrototypeIdentical**: + same name and signature
//! - **Similar**: + same unique name, parents similar
//! - **Identical**: + payload references similar, same body, and the same
//!   multiset of outgoing edges (targets compared at PrototypeIdentical)
//!
//! Hashes are consistent with the predicates: two declarations equal at a
//! level always hash equally at that level, so [`Wrapper`] can be used as a
//! `HashMap` key.

pub mod levels;
pub mod wrapper;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use xxhash_rust::xxh3::{xxh3_64, Xxh3};

use crate::graph::{DependencyCounts, FrozenGraph, FrozenNode, GraphId, NodeId};

pub use levels::MatchLevel;
pub use wrapper::Wrapper;

/// A declaration together with the graph it lives in.
#[derive(Clone, Copy, Debug)]
pub struct NodeRef<'g> {
    pub graph: &'g FrozenGraph,
    pub id: NodeId,
}

impl<'g> NodeRef<'g> {
    pub fn new(graph: &'g FrozenGraph, id: NodeId) -> Self {
        Self { graph, id }
    }

    pub fn node(&self) -> &'g FrozenNode {
        self.graph.node(self.id)
    }

    pub fn key(&self) -> NodeKey {
        NodeKey {
            graph: self.graph.id(),
            node: self.id,
        }
    }

    /// Another declaration of the same graph.
    fn at(&self, id: NodeId) -> NodeRef<'g> {
        NodeRef::new(self.graph, id)
    }
}

/// Identity of a declaration across graphs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    pub graph: GraphId,
    pub node: NodeId,
}

type PairKey = (NodeKey, NodeKey);

fn pair_key(a: NodeKey, b: NodeKey) -> PairKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Memoising equivalence engine.
///
/// Verdicts are recorded optimistically before they are evaluated; if the
/// evaluation fails, the record and everything derived from it while it was
/// assumed are rolled back.
#[derive(Debug, Default)]
pub struct Matcher {
    proven: RefCell<HashMap<PairKey, MatchLevel>>,
    undo: RefCell<Vec<(PairKey, Option<MatchLevel>)>>,
    depth: Cell<usize>,
    hashes: RefCell<HashMap<NodeKey, [Option<u64>; 4]>>,
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pairs with a proven level.
    pub fn cached_pairs(&self) -> usize {
        self.proven.borrow().len()
    }

    /// Strongest level proven so far for the pair, if any.
    pub fn cached_level(&self, a: NodeRef<'_>, b: NodeRef<'_>) -> Option<MatchLevel> {
        self.proven
            .borrow()
            .get(&pair_key(a.key(), b.key()))
            .copied()
    }

    /// Whether `a` and `b` are equal at `level`.
    pub fn matches(&self, a: NodeRef<'_>, b: NodeRef<'_>, level: MatchLevel) -> bool {
        let (ka, kb) = (a.key(), b.key());
        if ka == kb {
            return true;
        }
        let pair = pair_key(ka, kb);
        let previous = self.proven.borrow().get(&pair).copied();
        if previous.is_some_and(|proven| proven >= level) {
            return true;
        }

        let mark = {
            let mut undo = self.undo.borrow_mut();
            undo.push((pair, previous));
            undo.len() - 1
        };
        self.proven.borrow_mut().insert(pair, level);

        self.depth.set(self.depth.get() + 1);
        let matched = self.evaluate(a, b, level);
        self.depth.set(self.depth.get() - 1);

        if !matched {
            self.rollback(mark);
        }
        if self.depth.get() == 0 {
            self.undo.borrow_mut().clear();
        }
        matched
    }

    /// Hash of `node` at `level`, memoised per node.
    pub fn hash(&self, node: NodeRef<'_>, level: MatchLevel) -> u64 {
        let key = node.key();
        let cached = self
            .hashes
            .borrow()
            .get(&key)
            .and_then(|slots| slots[level.index()]);
        if let Some(hash) = cached {
            return hash;
        }

        let hash = self.compute_hash(node, level);
        self.hashes.borrow_mut().entry(key).or_insert([None; 4])[level.index()] = Some(hash);
        hash
    }

    fn rollback(&self, mark: usize) {
        let mut undo = self.undo.borrow_mut();
        let mut proven = self.proven.borrow_mut();
        while undo.len() > mark {
            let Some((pair, previous)) = undo.pop() else {
                break;
            };
            match previous {
                Some(level) => {
                    proven.insert(pair, level);
                }
                None => {
                    proven.remove(&pair);
                }
            }
        }
    }

    fn evaluate(&self, a: NodeRef<'_>, b: NodeRef<'_>, level: MatchLevel) -> bool {
        let (na, nb) = (a.node(), b.node());
        match level {
            MatchLevel::PrototypeSimilar => na.tag() == nb.tag(),
            MatchLevel::PrototypeIdentical => {
                self.evaluate(a, b, MatchLevel::PrototypeSimilar)
                    && na.name() == nb.name()
                    && na.signature() == nb.signature()
            }
            MatchLevel::Similar => {
                self.evaluate(a, b, MatchLevel::PrototypeIdentical)
                    && na.unique_name() == nb.unique_name()
                    && self.optional_matches(a, na.parent(), b, nb.parent(), MatchLevel::Similar)
            }
            MatchLevel::Identical => {
                self.evaluate(a, b, MatchLevel::Similar)
                    && self.payload_matches(a, b)
                    && self.edges_match(a, b)
            }
        }
    }

    /// Both absent is equal, one absent is not.
    fn optional_matches(
        &self,
        a: NodeRef<'_>,
        ra: Option<NodeId>,
        b: NodeRef<'_>,
        rb: Option<NodeId>,
        level: MatchLevel,
    ) -> bool {
        match (ra, rb) {
            (None, None) => true,
            (Some(x), Some(y)) => self.matches(a.at(x), b.at(y), level),
            _ => false,
        }
    }

    fn payload_matches(&self, a: NodeRef<'_>, b: NodeRef<'_>) -> bool {
        let (ka, kb) = (a.node().kind(), b.node().kind());
        if ka.body() != kb.body() {
            return false;
        }
        if !self.optional_matches(a, ka.type_ref(), b, kb.type_ref(), MatchLevel::Similar) {
            return false;
        }

        let (pa, pb) = (ka.parameters(), kb.parameters());
        if pa.len() != pb.len()
            || !pa
                .iter()
                .zip(pb)
                .all(|(&x, &y)| self.matches(a.at(x), b.at(y), MatchLevel::Similar))
        {
            return false;
        }

        match (ka.bases(), kb.bases()) {
            (Some(ba), Some(bb)) => {
                if ba.len() != bb.len() {
                    return false;
                }
                let mut remaining: HashMap<Wrapper<'_, '_>, usize> = HashMap::new();
                for &base in ba {
                    *remaining
                        .entry(Wrapper::new(self, a.at(base), MatchLevel::Similar))
                        .or_default() += 1;
                }
                for &base in bb {
                    match remaining.get_mut(&Wrapper::new(self, b.at(base), MatchLevel::Similar)) {
                        Some(count) if *count > 0 => *count -= 1,
                        _ => return false,
                    }
                }
                true
            }
            (None, None) => true,
            _ => false,
        }
    }

    fn edges_match(&self, a: NodeRef<'_>, b: NodeRef<'_>) -> bool {
        if a.node().dependency_to.len() != b.node().dependency_to.len() {
            return false;
        }
        self.edge_multiset(a) == self.edge_multiset(b)
    }

    fn edge_multiset<'m, 'g>(&'m self, node: NodeRef<'g>) -> HashMap<Wrapper<'m, 'g>, Vec<DependencyCounts>> {
        let mut edges: HashMap<Wrapper<'m, 'g>, Vec<DependencyCounts>> = HashMap::new();
        for (target, counts) in node.graph.dependency_to(node.id) {
            edges
                .entry(Wrapper::new(self, node.at(target), MatchLevel::PrototypeIdentical))
                .or_default()
                .push(*counts);
        }
        for counts in edges.values_mut() {
            counts.sort();
        }
        edges
    }

    fn compute_hash(&self, node: NodeRef<'_>, level: MatchLevel) -> u64 {
        let n = node.node();
        let mut hasher = HashWriter::new();
        match level {
            MatchLevel::PrototypeSimilar => hasher.str(n.tag().as_str()),
            MatchLevel::PrototypeIdentical => {
                hasher.u64(self.hash(node, MatchLevel::PrototypeSimilar));
                hasher.str(n.name());
                hasher.str(n.signature());
            }
            MatchLevel::Similar => {
                hasher.u64(self.hash(node, MatchLevel::PrototypeIdentical));
                hasher.str(n.unique_name());
                self.hash_reference(&mut hasher, node, n.parent());
            }
            MatchLevel::Identical => {
                hasher.u64(self.hash(node, MatchLevel::Similar));
                let kind = n.kind();
                match kind.body() {
                    Some(body) => hasher.str(body),
                    None => hasher.u64(0),
                }
                self.hash_reference(&mut hasher, node, kind.type_ref());
                for &param in kind.parameters() {
                    hasher.u64(self.hash(node.at(param), MatchLevel::Similar));
                }
                if let Some(bases) = kind.bases() {
                    let sum = bases.iter().fold(0u64, |acc, &base| {
                        acc.wrapping_add(self.hash(node.at(base), MatchLevel::Similar))
                    });
                    hasher.u64(sum);
                }
                let edges = node.graph.dependency_to(node.id).fold(0u64, |acc, (target, counts)| {
                    let target_hash = self.hash(node.at(target), MatchLevel::PrototypeIdentical);
                    acc.wrapping_add(edge_hash(target_hash, counts))
                });
                hasher.u64(edges);
            }
        }
        hasher.finish()
    }

    fn hash_reference(&self, hasher: &mut HashWriter, node: NodeRef<'_>, reference: Option<NodeId>) {
        match reference {
            Some(id) => {
                hasher.u64(1);
                hasher.u64(self.hash(node.at(id), MatchLevel::Similar));
            }
            None => hasher.u64(0),
        }
    }
}

fn edge_hash(target_hash: u64, counts: &DependencyCounts) -> u64 {
    let mut bytes = Vec::with_capacity(8 + 4 * counts.as_array().len());
    bytes.extend_from_slice(&target_hash.to_le_bytes());
    for count in counts.as_array() {
        bytes.extend_from_slice(&count.to_le_bytes());
    }
    xxh3_64(&bytes)
}

struct HashWriter(Xxh3);

impl HashWriter {
    fn new() -> Self {
        Self(Xxh3::new())
    }

    fn u64(&mut self, value: u64) {
        self.0.update(&value.to_le_bytes());
    }

    fn str(&mut self, value: &str) {
        self.u64(value.len() as u64);
        self.0.update(value.as_bytes());
    }

    fn finish(&self) -> u64 {
        self.0.digest()
    }
}
