//! Hash-map key view of a declaration under a match level.

use std::hash::{Hash, Hasher};

use super::{MatchLevel, Matcher, NodeRef};

/// Adapts a declaration into a `Hash + Eq` key: two wrappers are equal when
/// their declarations match at the wrapper's level.
#[derive(Clone, Copy)]
pub struct Wrapper<'m, 'g> {
    matcher: &'m Matcher,
    node: NodeRef<'g>,
    level: MatchLevel,
    hash: u64,
}

impl<'m, 'g> Wrapper<'m, 'g> {
    pub fn new(matcher: &'m Matcher, node: NodeRef<'g>, level: MatchLevel) -> Self {
        let hash = matcher.hash(node, level);
        Self {
            matcher,
            node,
            level,
            hash,
        }
    }

    pub fn node(&self) -> NodeRef<'g> {
        self.node
    }

    pub fn level(&self) -> MatchLevel {
        self.level
    }
}

impl PartialEq for Wrapper<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level
            && self.hash == other.hash
            && self.matcher.matches(self.node, other.node, self.level)
    }
}

impl Eq for Wrapper<'_, '_> {}

impl Hash for Wrapper<'_, '_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl std::fmt::Debug for Wrapper<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wrapper")
            .field("node", &self.node.id)
            .field("level", &self.level)
            .field("hash", &self.hash)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Declaration, GraphBuilder};
    use std::collections::HashSet;

    #[test]
    fn test_wrapper_equality_follows_level() {
        let mut builder = GraphBuilder::new();
        let root = builder.root();
        let a = builder
            .add_declaration(root, Declaration::function("run").with_unique_name("a::run"))
            .unwrap();
        let b = builder
            .add_declaration(root, Declaration::function("run").with_unique_name("b::run"))
            .unwrap();
        let graph = builder.freeze();
        let matcher = Matcher::new();

        let proto: HashSet<Wrapper<'_, '_>> = [a, b]
            .iter()
            .map(|&id| Wrapper::new(&matcher, NodeRef::new(&graph, id), MatchLevel::PrototypeIdentical))
            .collect();
        assert_eq!(proto.len(), 1);

        let similar: HashSet<Wrapper<'_, '_>> = [a, b]
            .iter()
            .map(|&id| Wrapper::new(&matcher, NodeRef::new(&graph, id), MatchLevel::Similar))
            .collect();
        assert_eq!(similar.len(), 2);
    }
}
