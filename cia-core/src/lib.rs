//! CIA Core - declaration graph diffing and change impact analysis.
//!
//! This crate compares two snapshots of a C/C++ project's declaration graph
//! and reports which declarations were added, removed, changed or left
//! unchanged. Changed declarations seed an impact propagation over the new
//! version's dependency edges.
//!
//! # Features
//!
//! - **Declaration graph**: ownership tree plus typed, counted dependency
//!   edges, built mutably and frozen for analysis
//! - **Structural matching**: four match levels with cached, hash-consistent
//!   equality between nodes of different graphs
//! - **Parallel impact**: one propagation task per changed declaration on a
//!   Rayon pool, combined deterministically
//! - **Snapshots**: JSON persistence for versions and diff results
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cia_core::graph::{Declaration, DependencyKind, GraphBuilder};
//! use cia_core::{compare, DiffSettings, ProjectVersion, WorkerPool};
//!
//! let build = |body: &str| {
//!     let mut builder = GraphBuilder::new();
//!     let root = builder.root();
//!     let helper = builder
//!         .add_declaration(root, Declaration::function("helper").with_body(body))
//!         .unwrap();
//!     let main = builder.add_declaration(root, Declaration::function("main")).unwrap();
//!     builder.add_dependency(main, helper, DependencyKind::Invocation).unwrap();
//!     Arc::new(ProjectVersion::new("v", builder.freeze()))
//! };
//!
//! let pool = WorkerPool::new(Some(2)).unwrap();
//! let diff = compare(build("{}"), build("{ log(); }"), &DiffSettings::default(), &pool).unwrap();
//! assert_eq!(diff.changed.len(), 1);
//!
//! let main = diff.version_b.graph.find_by_unique_name("main").unwrap();
//! assert!((diff.impact_of(main).unwrap() - 0.2).abs() < 1e-12);
//! ```

pub mod differ;
pub mod error;
pub mod graph;
pub mod impact;
pub mod matcher;
pub mod settings;
pub mod snapshot;
pub mod version;

pub use differ::{compare, ChangeType, DeclarationChange, DiffSummary, VersionDifference};
pub use error::{CiaError, GraphError, Result};
pub use impact::{compute_impact, ranked, WorkerPool};
pub use matcher::{MatchLevel, Matcher};
pub use settings::{DecayPolicy, DiffSettings, ImpactSettings};
pub use snapshot::FORMAT_VERSION;
pub use version::ProjectVersion;
