//! Version differ: classifies every declaration of two versions.
//!
//! # Features
//!
//! - **Structural pairing**: declarations are paired through the
//!   [`Matcher`](crate::matcher::Matcher) levels, parents first
//! - **Deterministic**: the result does not depend on hash map iteration
//! - **Impact weights**: optionally computed over the new version, seeded
//!   with every changed declaration
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cia_core::differ::compare;
//! use cia_core::graph::{Declaration, GraphBuilder};
//! use cia_core::impact::WorkerPool;
//! use cia_core::settings::DiffSettings;
//! use cia_core::version::ProjectVersion;
//!
//! let build = |signature: &str| {
//!     let mut builder = GraphBuilder::new();
//!     let root = builder.root();
//!     builder
//!         .add_declaration(root, Declaration::function("run").with_signature(signature))
//!         .unwrap();
//!     Arc::new(ProjectVersion::new("v", builder.freeze()))
//! };
//!
//! let pool = WorkerPool::new(Some(1)).unwrap();
//! let diff = compare(build("void run()"), build("int run()"), &DiffSettings::default(), &pool).unwrap();
//! assert_eq!(diff.changed.len(), 1);
//! assert!(diff.added.is_empty() && diff.removed.is_empty());
//! ```

pub mod changes;
pub mod comparator;
pub mod result;

pub use changes::{ChangeCounts, ChangeType, DeclarationChange, DiffSummary};
pub use comparator::{compare, pair_declarations, Pairing};
pub use result::VersionDifference;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::graph::{Declaration, DependencyKind, FrozenGraph, GraphBuilder, NodeId};
    use crate::impact::WorkerPool;
    use crate::settings::DiffSettings;
    use crate::version::ProjectVersion;

    fn version(graph: FrozenGraph) -> Arc<ProjectVersion> {
        Arc::new(ProjectVersion::new("test", graph))
    }

    /// Namespace `a` holding `run` and a caller `main`.
    fn overloaded(caller_body: &str) -> FrozenGraph {
        let mut builder = GraphBuilder::new();
        let root = builder.root();
        let ns = builder.add_declaration(root, Declaration::namespace("a")).unwrap();
        let run = builder
            .add_declaration(ns, Declaration::function("run").with_signature("void run()"))
            .unwrap();
        let caller = builder
            .add_declaration(ns, Declaration::function("main").with_body(caller_body))
            .unwrap();
        builder.add_dependency(caller, run, DependencyKind::Invocation).unwrap();
        builder.freeze()
    }

    /// Namespace blocks named `n`; `true` entries hold a function `run`.
    fn reopened(blocks: &[bool]) -> FrozenGraph {
        let mut builder = GraphBuilder::new();
        let root = builder.root();
        for &has_run in blocks {
            let ns = builder.add_declaration(root, Declaration::namespace("n")).unwrap();
            if has_run {
                builder
                    .add_declaration(ns, Declaration::function("run").with_unique_name("n::run"))
                    .unwrap();
            }
        }
        builder.freeze()
    }

    #[test]
    fn test_parent_partner_preferred() {
        // A: n#1 {}, n#2 { run#3 }    B: n#1 { run#2 }, n#3 { run#4 }
        let a = reopened(&[false, true]);
        let b = reopened(&[true, true]);
        let pairing = pair_declarations(&a, &b);

        assert!(pairing.unchanged.contains(&(NodeId::new(1), NodeId::new(1))));
        assert!(pairing.unchanged.contains(&(NodeId::new(2), NodeId::new(3))));
        assert!(pairing.unchanged.contains(&(NodeId::new(3), NodeId::new(4))));
        assert_eq!(pairing.added, [NodeId::new(2)].into_iter().collect());
        assert!(pairing.removed.is_empty());
        assert!(pairing.changed.is_empty());
    }

    #[test]
    fn test_signature_edit_pairs_by_unique_name() {
        let build = |signature: &str| {
            let mut builder = GraphBuilder::new();
            let root = builder.root();
            let ns = builder.add_declaration(root, Declaration::namespace("geo")).unwrap();
            builder
                .add_declaration(
                    ns,
                    Declaration::function("leaf")
                        .with_unique_name("geo::leaf")
                        .with_signature(signature),
                )
                .unwrap();
            builder.freeze()
        };
        let pairing = pair_declarations(&build("void leaf()"), &build("int leaf()"));

        assert_eq!(pairing.changed, [(NodeId::new(2), NodeId::new(2))].into_iter().collect());
        assert_eq!(pairing.unchanged.len(), 2);
        assert!(pairing.added.is_empty());
        assert!(pairing.removed.is_empty());
    }

    #[test]
    fn test_signature_edit_needs_partnered_parent() {
        // `geo` becomes `shapes`, so `leaf` moves under an unpaired parent
        let build = |ns_name: &str, signature: &str| {
            let mut builder = GraphBuilder::new();
            let root = builder.root();
            let ns = builder.add_declaration(root, Declaration::namespace(ns_name)).unwrap();
            builder
                .add_declaration(
                    ns,
                    Declaration::function("leaf")
                        .with_unique_name("leaf")
                        .with_signature(signature),
                )
                .unwrap();
            builder.freeze()
        };
        let pairing = pair_declarations(&build("geo", "void leaf()"), &build("shapes", "int leaf()"));

        assert!(pairing.changed.is_empty());
        assert_eq!(pairing.removed.len(), 2);
        assert_eq!(pairing.added.len(), 2);
    }

    #[test]
    fn test_partner_of_every_pair() {
        // A: n#1 { run#2 }, n#3 { run#4 }    B: n#1 {}, n#2 { run#3 }
        let a = reopened(&[true, true]);
        let b = reopened(&[false, true]);
        let pool = WorkerPool::new(Some(1)).unwrap();
        let diff = compare(version(a), version(b), &DiffSettings::default(), &pool).unwrap();

        for &(x, y) in diff.changed.iter().chain(&diff.unchanged) {
            assert_eq!(diff.partner_of(x), Some(y));
        }
        assert_eq!(diff.partner_of(NodeId::new(2)), Some(NodeId::new(3)));
        assert_eq!(diff.removed, [NodeId::new(4)].into_iter().collect());
        assert_eq!(diff.partner_of(NodeId::new(4)), None);
    }

    #[test]
    fn test_similar_group_pairs_each_block_in_place() {
        // Every `n` and every `n::run` lands in one Similar group.
        let blocks = [true; 16];
        let a = reopened(&blocks);
        let b = reopened(&blocks);
        let pairing = pair_declarations(&a, &b);

        assert_eq!(pairing.unchanged.len(), a.len());
        assert!(pairing.unchanged.iter().all(|&(x, y)| x == y));
        assert!(pairing.changed.is_empty());
    }

    #[test]
    fn test_self_pairing_is_identity() {
        let a = overloaded("{}");
        let b = overloaded("{}");
        let pairing = pair_declarations(&a, &b);

        assert_eq!(pairing.unchanged.len(), a.len());
        assert!(pairing.unchanged.iter().all(|&(x, y)| x == y));
    }

    #[test]
    fn test_body_change_is_changed() {
        let a = overloaded("{}");
        let b = overloaded("{ run(); }");
        let pool = WorkerPool::new(Some(1)).unwrap();
        let diff = compare(version(a), version(b), &DiffSettings::default(), &pool).unwrap();

        assert_eq!(diff.changed.len(), 1);
        let &(_, main) = diff.changed.iter().next().unwrap();
        assert_eq!(diff.version_b.graph.node(main).unique_name(), "main");
        assert_eq!(diff.impact_of(main), Some(1.0));
        assert_eq!(diff.summary.functions.changed, 1);
        assert!(diff.is_changed());
    }

    #[test]
    fn test_impact_disabled() {
        let pool = WorkerPool::new(Some(1)).unwrap();
        let mut settings = DiffSettings::default();
        settings.impact.enabled = false;
        let diff = compare(
            version(overloaded("{}")),
            version(overloaded("{ x }")),
            &settings,
            &pool,
        )
        .unwrap();

        assert!(diff.impact_weights.is_none());
        assert_eq!(diff.changed.len(), 1);
    }

    #[test]
    fn test_changes_rows() {
        let pool = WorkerPool::new(Some(1)).unwrap();
        let diff = compare(
            version(overloaded("{}")),
            version(overloaded("{ x }")),
            &DiffSettings::default(),
            &pool,
        )
        .unwrap();

        let rows = diff.changes(false);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].change_type, ChangeType::Changed);
        assert_eq!(rows[0].unique_name, "main");

        let all = diff.changes(true);
        assert_eq!(all.len(), diff.version_a.graph.len());
        let main_a = diff.version_a.graph.find_by_unique_name("main").unwrap();
        assert!(diff.partner_of(main_a).is_some());
    }
}
