//! End-to-end properties of the differ on a small C++-shaped project.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use cia_core::differ::{compare, pair_declarations, VersionDifference};
use cia_core::graph::{Declaration, DependencyKind, FrozenGraph, GraphBuilder, NodeId};
use cia_core::impact::WorkerPool;
use cia_core::matcher::{MatchLevel, Matcher, NodeRef};
use cia_core::settings::DiffSettings;
use cia_core::snapshot::GraphRecord;
use cia_core::version::ProjectVersion;

#[derive(Clone, Copy)]
struct Edits {
    leaf_body: &'static str,
    leaf_signature: &'static str,
    helper_signature: &'static str,
    extra: bool,
}

impl Default for Edits {
    fn default() -> Self {
        Self {
            leaf_body: "{ return 1; }",
            leaf_signature: "int leaf()",
            helper_signature: "int helper()",
            extra: false,
        }
    }
}

/// ```text
/// namespace geo {
///     int helper();
///     int leaf();
///     class Shape { double area(); };
///     class Circle : Shape { double radius; double area(); };
/// }
/// int main();
/// ```
fn project(edits: Edits) -> FrozenGraph {
    let mut b = GraphBuilder::new();
    let root = b.root();
    let double = b.integral("double").unwrap();
    let int = b.integral("int").unwrap();

    let geo = b.add_declaration(root, Declaration::namespace("geo")).unwrap();
    let helper = b
        .add_declaration(
            geo,
            Declaration::function("helper")
                .with_unique_name("geo::helper")
                .with_signature(edits.helper_signature)
                .with_body("{ return 42; }"),
        )
        .unwrap();
    b.set_type_ref(helper, Some(int)).unwrap();
    b.add_dependency(helper, int, DependencyKind::Use).unwrap();

    let leaf = b
        .add_declaration(
            geo,
            Declaration::function("leaf")
                .with_unique_name("geo::leaf")
                .with_signature(edits.leaf_signature)
                .with_body(edits.leaf_body),
        )
        .unwrap();
    b.set_type_ref(leaf, Some(int)).unwrap();

    let shape = b
        .add_declaration(geo, Declaration::class("Shape").with_unique_name("geo::Shape"))
        .unwrap();
    let shape_area = b
        .add_declaration(
            shape,
            Declaration::function("area")
                .with_unique_name("geo::Shape::area")
                .with_signature("double area()"),
        )
        .unwrap();
    b.set_type_ref(shape_area, Some(double)).unwrap();

    let circle = b
        .add_declaration(geo, Declaration::class("Circle").with_unique_name("geo::Circle"))
        .unwrap();
    b.add_base(circle, shape).unwrap();
    b.add_dependency(circle, shape, DependencyKind::Inheritance).unwrap();
    let radius = b
        .add_declaration(
            circle,
            Declaration::variable("radius")
                .with_unique_name("geo::Circle::radius")
                .with_signature("double radius"),
        )
        .unwrap();
    b.set_type_ref(radius, Some(double)).unwrap();
    b.add_dependency(radius, double, DependencyKind::Use).unwrap();
    let circle_area = b
        .add_declaration(
            circle,
            Declaration::function("area")
                .with_unique_name("geo::Circle::area")
                .with_signature("double area()")
                .with_body("{ return helper() * radius; }"),
        )
        .unwrap();
    b.set_type_ref(circle_area, Some(double)).unwrap();
    b.add_dependency(circle_area, radius, DependencyKind::Use).unwrap();
    b.add_dependency(circle_area, helper, DependencyKind::Invocation).unwrap();

    if edits.extra {
        b.add_declaration(
            geo,
            Declaration::function("extra")
                .with_unique_name("geo::extra")
                .with_signature("void extra()"),
        )
        .unwrap();
    }

    let main = b
        .add_declaration(root, Declaration::function("main").with_signature("int main()"))
        .unwrap();
    b.add_dependency(main, helper, DependencyKind::Invocation).unwrap();
    b.add_dependency(main, helper, DependencyKind::Invocation).unwrap();

    assert_eq!(b.link_overrides().unwrap(), 1);
    b.freeze()
}

fn diff(a: Edits, b: Edits, threads: usize) -> VersionDifference {
    let pool = WorkerPool::new(Some(threads)).unwrap();
    compare(
        Arc::new(ProjectVersion::new("old", project(a))),
        Arc::new(ProjectVersion::new("new", project(b))),
        &DiffSettings::default(),
        &pool,
    )
    .unwrap()
}

fn names(graph: &FrozenGraph, ids: impl IntoIterator<Item = NodeId>) -> Vec<String> {
    let mut names: Vec<String> = ids
        .into_iter()
        .map(|id| graph.node(id).unique_name().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_self_diff_is_all_unchanged() {
    let result = diff(Edits::default(), Edits::default(), 2);

    assert!(!result.is_changed());
    assert_eq!(result.unchanged.len(), result.version_a.graph.len());
    assert!(result.unchanged.iter().all(|&(a, b)| a == b));
    assert_eq!(result.summary.text(), "No changes");
}

#[test]
fn test_leaf_edit_is_one_changed_pair() {
    let edited = Edits {
        leaf_body: "{ return 2; }",
        ..Edits::default()
    };
    let result = diff(Edits::default(), edited, 2);

    assert_eq!(result.changed.len(), 1);
    assert!(result.added.is_empty());
    assert!(result.removed.is_empty());
    assert_eq!(result.unchanged.len(), result.version_a.graph.len() - 1);

    let gb = &result.version_b.graph;
    let changed = result.changed.iter().map(|&(_, b)| b);
    assert_eq!(names(gb, changed), vec!["geo::leaf"]);
}

/// Copy of `graph` with the signature of `id` replaced.
fn with_signature(graph: &FrozenGraph, id: NodeId, signature: &str) -> FrozenGraph {
    let mut record = GraphRecord::from_graph(graph);
    record.nodes[id.index()].signature = signature.to_string();
    record.into_graph().unwrap()
}

/// Declarations nothing else points at: no children, no incoming edges and
/// not named by any type, parameter or base list.
fn leaves(graph: &FrozenGraph) -> Vec<NodeId> {
    let referenced: Vec<NodeId> = graph
        .iter()
        .flat_map(|id| graph.node(id).kind().references())
        .collect();
    graph
        .iter()
        .filter(|&id| !graph.node(id).tag().is_synthetic())
        .filter(|&id| graph.children(id).is_empty())
        .filter(|&id| graph.dependency_from(id).next().is_none())
        .filter(|id| !referenced.contains(id))
        .collect()
}

#[test]
fn test_signature_edit_of_any_leaf_is_one_changed_pair() {
    let a = project(Edits::default());
    let leaves = leaves(&a);

    for &id in &leaves {
        let signature = format!("{} const", a.node(id).signature());
        let b = with_signature(&a, id, &signature);
        let result = pair_declarations(&a, &b);

        let unique_name = a.node(id).unique_name();
        assert_eq!(result.changed.iter().copied().collect::<Vec<_>>(), vec![(id, id)], "{}", unique_name);
        assert!(result.added.is_empty(), "{}", unique_name);
        assert!(result.removed.is_empty(), "{}", unique_name);
        assert_eq!(result.unchanged.len(), a.len() - 1, "{}", unique_name);
        assert!(result.unchanged.iter().all(|&(x, y)| x == y && x != id));
    }

    // One directly under the root, one nested in a namespace
    let covered = names(&a, leaves.iter().copied());
    assert!(covered.contains(&"main".to_string()));
    assert!(covered.contains(&"geo::leaf".to_string()));
}

#[test]
fn test_dependents_of_reprototyped_target_are_changed() {
    let edited = Edits {
        helper_signature: "long helper()",
        ..Edits::default()
    };
    let result = diff(Edits::default(), edited, 1);

    let gb = &result.version_b.graph;
    let changed = result.changed.iter().map(|&(_, b)| b);
    assert_eq!(names(gb, changed), vec!["geo::Circle::area", "geo::helper", "main"]);
    assert!(result.added.is_empty());
    assert!(result.removed.is_empty());
}

#[test]
fn test_one_added_declaration() {
    let edited = Edits {
        extra: true,
        ..Edits::default()
    };
    let result = diff(Edits::default(), edited, 2);

    assert_eq!(names(&result.version_b.graph, result.added.iter().copied()), vec!["geo::extra"]);
    assert!(result.removed.is_empty());
    assert!(result.changed.is_empty());
    assert_eq!(result.unchanged.len(), result.version_a.graph.len());
    assert_eq!(result.summary.functions.added, 1);
}

#[test]
fn test_level_monotonicity_and_hash_consistency() {
    let a = project(Edits::default());
    let b = project(Edits {
        leaf_body: "{ return 2; }",
        helper_signature: "long helper()",
        ..Edits::default()
    });
    let matcher = Matcher::new();

    for x in a.iter() {
        for y in b.iter() {
            let (rx, ry) = (NodeRef::new(&a, x), NodeRef::new(&b, y));
            let verdicts: Vec<bool> = MatchLevel::ALL
                .iter()
                .map(|&level| matcher.matches(rx, ry, level))
                .collect();
            for pair in verdicts.windows(2) {
                assert!(!pair[1] || pair[0], "{} vs {}: {:?}", x, y, verdicts);
            }
            for (&level, &matched) in MatchLevel::ALL.iter().zip(&verdicts) {
                if matched {
                    assert_eq!(matcher.hash(rx, level), matcher.hash(ry, level));
                }
            }
        }
    }
}

#[test]
fn test_pairing_is_deterministic() {
    let a = project(Edits::default());
    let b = project(Edits {
        extra: true,
        helper_signature: "long helper()",
        ..Edits::default()
    });
    let first = pair_declarations(&a, &b);
    let second = pair_declarations(&a, &b);

    assert_eq!(first.added, second.added);
    assert_eq!(first.removed, second.removed);
    assert_eq!(first.changed, second.changed);
    assert_eq!(first.unchanged, second.unchanged);
}

#[test]
fn test_changed_declarations_have_full_impact() {
    let edited = Edits {
        helper_signature: "long helper()",
        ..Edits::default()
    };
    let result = diff(Edits::default(), edited, 2);

    assert!(!result.changed.is_empty());
    for &(_, b) in &result.changed {
        assert_eq!(result.impact_of(b), Some(1.0));
    }
}

#[test]
fn test_unreached_declarations_have_no_impact() {
    let edited = Edits {
        leaf_body: "{ return 2; }",
        ..Edits::default()
    };
    let result = diff(Edits::default(), edited, 2);
    let gb = &result.version_b.graph;
    let changed: Vec<NodeId> = result.changed.iter().map(|&(_, b)| b).collect();

    for id in gb.iter() {
        if changed.contains(&id) {
            continue;
        }
        assert_eq!(result.impact_of(id), Some(0.0), "{}", gb.node(id).unique_name());
    }
}

#[test]
fn test_thread_count_does_not_change_result() {
    let edited = Edits {
        helper_signature: "long helper()",
        leaf_body: "{ return 3; }",
        ..Edits::default()
    };
    let single = diff(Edits::default(), edited, 1);
    let parallel = diff(Edits::default(), edited, 4);

    assert_eq!(single.changed, parallel.changed);
    assert_eq!(single.added, parallel.added);
    let (ws, wp) = (
        single.impact_weights.as_ref().unwrap(),
        parallel.impact_weights.as_ref().unwrap(),
    );
    assert_eq!(ws.len(), wp.len());
    for (s, p) in ws.iter().zip(wp) {
        assert_abs_diff_eq!(*s, *p, epsilon = 1e-12);
    }
}
