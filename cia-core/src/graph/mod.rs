//! Declaration graph: ownership tree plus typed, counted dependency edges.
//!
//! Graphs are assembled with a mutable [`GraphBuilder`] and then converted
//! into an immutable [`FrozenGraph`] with [`GraphBuilder::freeze`]. Only the
//! frozen form is diffed, persisted or used for impact propagation.
//!
//! # Example
//!
//! ```
//! use cia_core::graph::{Declaration, DependencyKind, GraphBuilder};
//!
//! let mut builder = GraphBuilder::new();
//! let root = builder.root();
//! let a = builder.add_declaration(root, Declaration::function("a")).unwrap();
//! let b = builder.add_declaration(root, Declaration::function("b")).unwrap();
//! builder.add_dependency(a, b, DependencyKind::Invocation).unwrap();
//!
//! let graph = builder.freeze();
//! assert_eq!(graph.len(), 3);
//! ```

pub mod builder;
pub mod cycles;
pub mod dependency;
pub mod frozen;
pub mod iter;
pub mod node;

pub use builder::GraphBuilder;
pub use cycles::dependency_cycles;
pub use dependency::{DependencyCounts, DependencyKind, DependencyWeights, DEPENDENCY_KINDS};
pub use frozen::{FrozenGraph, FrozenNode, GraphId};
pub use iter::Descendants;
pub use node::{Declaration, Kind, KindTag, NodeId};
