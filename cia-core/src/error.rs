//! Error types for cia-core.

use thiserror::Error;

use crate::graph::NodeId;

/// Result type alias for cia-core operations.
pub type Result<T> = std::result::Result<T, CiaError>;

/// Refusals reported by [`GraphBuilder`](crate::graph::GraphBuilder) mutators.
///
/// These describe requests the builder declines to carry out. Broken
/// invariants inside the builder are not reported here; they panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The node id does not belong to this builder.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// The child already has a parent.
    #[error("Node {child} is already attached to {parent}")]
    AlreadyAttached {
        /// Node that was about to be attached.
        child: NodeId,
        /// Its current parent.
        parent: NodeId,
    },

    /// Attaching or moving would make a node its own ancestor.
    #[error("Ownership cycle: {node} is an ancestor of {target}")]
    OwnershipCycle {
        /// Node being moved.
        node: NodeId,
        /// Destination inside the moved subtree.
        target: NodeId,
    },

    /// The builder root cannot be attached, removed or transferred.
    #[error("The graph root cannot be moved")]
    RootNotMovable,

    /// Both nodes must share the same root.
    #[error("Nodes {0} and {1} belong to different trees")]
    DifferentRoots(NodeId, NodeId),

    /// Dependency from a node to itself.
    #[error("Node {0} cannot depend on itself")]
    SelfDependency(NodeId),

    /// Operation requires a class declaration.
    #[error("Node {0} is not a class")]
    NotAClass(NodeId),

    /// Operation requires a function declaration.
    #[error("Node {0} is not a function")]
    NotAFunction(NodeId),
}

/// Errors that can occur while diffing, computing impact or loading snapshots.
#[derive(Error, Debug)]
pub enum CiaError {
    /// A builder operation was refused.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Persisted input could not be decoded into a valid graph.
    #[error("Wrong input format: {message}")]
    WrongFormat {
        /// What was wrong with the input.
        message: String,
    },

    /// IO error while reading or writing a snapshot.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A node id outside of the graph was supplied.
    #[error("Node {node} is out of range for a graph of {len} nodes")]
    NodeOutOfRange {
        /// Offending id.
        node: NodeId,
        /// Number of nodes in the graph.
        len: usize,
    },

    /// An impact propagation task failed; the whole computation is aborted.
    #[error("Cannot calculate impact weights from node {node}: {message}")]
    ImpactTask {
        /// Changed node whose task failed.
        node: NodeId,
        /// Failure description.
        message: String,
    },

    /// The worker pool could not be created.
    #[error("Thread pool error: {message}")]
    ThreadPool {
        /// Description of the pool failure.
        message: String,
    },

    /// Settings outside of their valid range.
    #[error("Invalid settings: {message}")]
    InvalidSettings {
        /// Which setting was rejected and why.
        message: String,
    },
}

impl CiaError {
    pub(crate) fn wrong_format(message: impl Into<String>) -> Self {
        CiaError::WrongFormat {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CiaError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            return CiaError::Io(err.into());
        }
        CiaError::wrong_format(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CiaError::NodeOutOfRange {
            node: NodeId::new(42),
            len: 10,
        };
        assert!(err.to_string().contains("42"));
        assert!(err.to_string().contains("10"));

        let err: CiaError = GraphError::SelfDependency(NodeId::new(3)).into();
        assert!(err.to_string().contains("itself"));
    }

    #[test]
    fn test_json_error_is_wrong_format() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: CiaError = json_err.into();
        assert!(matches!(err, CiaError::WrongFormat { .. }));
    }
}
