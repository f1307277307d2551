//! Dependency cycle detection over a frozen graph, powered by petgraph.
//!
//! Builds an in-memory `DiGraph` view of the dependency edges (optionally
//! filtered by kind) and reports strongly connected components with more
//! than one declaration. Kosaraju runs in O(V + E).

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use super::{DependencyKind, FrozenGraph, NodeId};

/// Strongly connected components of the dependency graph.
///
/// # Arguments
///
/// * `graph` - Frozen graph to inspect
/// * `kinds` - Only follow edges carrying at least one of these kinds;
///   `None` follows every edge
///
/// # Returns
///
/// Each cycle as a list of ids sorted ascending; cycles are ordered by
/// their smallest id.
pub fn dependency_cycles(graph: &FrozenGraph, kinds: Option<&[DependencyKind]>) -> Vec<Vec<NodeId>> {
    let mut view: DiGraph<NodeId, ()> = DiGraph::with_capacity(graph.len(), graph.edge_count());
    let indices: Vec<NodeIndex> = graph.iter().map(|id| view.add_node(id)).collect();

    for source in graph.iter() {
        for (target, counts) in graph.dependency_to(source) {
            let allowed = match kinds {
                Some(kinds) => kinds.iter().any(|&kind| counts.get(kind) > 0),
                None => true,
            };
            if allowed {
                view.add_edge(indices[source.index()], indices[target.index()], ());
            }
        }
    }

    let mut cycles: Vec<Vec<NodeId>> = kosaraju_scc(&view)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| {
            let mut ids: Vec<NodeId> = scc.into_iter().map(|idx| view[idx]).collect();
            ids.sort();
            ids
        })
        .collect();
    cycles.sort();
    cycles
}
