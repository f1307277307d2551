//! Depth-first pre-order traversal over the ownership tree.

use super::NodeId;

/// Read access to child sequences, shared by the builder and the frozen graph.
pub trait ChildSource {
    fn child_slice(&self, id: NodeId) -> &[NodeId];
}

/// Lazy pre-order walk over all descendants of a node (the node itself is
/// not yielded).
///
/// Keeps a stack of child slice iterators; each call to `next` descends
/// into the children of the node it returns.
pub struct Descendants<'a, G: ?Sized> {
    graph: &'a G,
    stack: Vec<std::slice::Iter<'a, NodeId>>,
}

impl<'a, G: ChildSource + ?Sized> Descendants<'a, G> {
    pub(crate) fn new(graph: &'a G, start: NodeId) -> Self {
        Self {
            graph,
            stack: vec![graph.child_slice(start).iter()],
        }
    }
}

impl<G: ?Sized> Clone for Descendants<'_, G> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph,
            stack: self.stack.clone(),
        }
    }
}

impl<'a, G: ChildSource + ?Sized> Iterator for Descendants<'a, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let graph = self.graph;
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(&id) => {
                    self.stack.push(graph.child_slice(id).iter());
                    return Some(id);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
