//! JSON persistence for project versions and diff results.
//!
//! Records mirror the frozen graph: dense pre-order ids, one root at id `0`,
//! parents before children, and one record per (source, target) edge. Every
//! structural violation found while loading is reported as
//! [`CiaError::WrongFormat`].

use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::differ::VersionDifference;
use crate::error::{CiaError, Result};
use crate::graph::{Declaration, DependencyCounts, FrozenGraph, GraphBuilder, Kind, KindTag, NodeId};
use crate::version::ProjectVersion;

/// Version of the record layout written by this crate.
pub const FORMAT_VERSION: u32 = 1;

/// Kind tag and payload of a persisted declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KindRecord {
    Root,
    Namespace,
    Class {
        #[serde(default)]
        bases: Vec<NodeId>,
    },
    Function {
        #[serde(default)]
        parameters: Vec<NodeId>,
        #[serde(default)]
        return_type: Option<NodeId>,
        #[serde(default)]
        body: Option<String>,
    },
    Variable {
        #[serde(default)]
        value_type: Option<NodeId>,
        #[serde(default)]
        body: Option<String>,
    },
    Parameter {
        #[serde(default)]
        value_type: Option<NodeId>,
        #[serde(default)]
        body: Option<String>,
    },
    Enum,
    Integral,
    Unknown,
}

impl KindRecord {
    fn from_kind(kind: &Kind) -> Self {
        let body = kind.body().map(str::to_string);
        match kind {
            Kind::Root => KindRecord::Root,
            Kind::Namespace => KindRecord::Namespace,
            Kind::Class { bases } => KindRecord::Class {
                bases: bases.iter().copied().collect(),
            },
            Kind::Function {
                parameters,
                return_type,
                ..
            } => KindRecord::Function {
                parameters: parameters.clone(),
                return_type: *return_type,
                body,
            },
            Kind::Variable { value_type, .. } => KindRecord::Variable {
                value_type: *value_type,
                body,
            },
            Kind::Parameter { value_type, .. } => KindRecord::Parameter {
                value_type: *value_type,
                body,
            },
            Kind::Enum => KindRecord::Enum,
            Kind::Integral => KindRecord::Integral,
            Kind::Unknown => KindRecord::Unknown,
        }
    }

    fn tag(&self) -> KindTag {
        match self {
            KindRecord::Root => KindTag::Root,
            KindRecord::Namespace => KindTag::Namespace,
            KindRecord::Class { .. } => KindTag::Class,
            KindRecord::Function { .. } => KindTag::Function,
            KindRecord::Variable { .. } => KindTag::Variable,
            KindRecord::Parameter { .. } => KindTag::Parameter,
            KindRecord::Enum => KindTag::Enum,
            KindRecord::Integral => KindTag::Integral,
            KindRecord::Unknown => KindTag::Unknown,
        }
    }

    fn body(&self) -> Option<&str> {
        match self {
            KindRecord::Function { body, .. }
            | KindRecord::Variable { body, .. }
            | KindRecord::Parameter { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    fn references(&self) -> Vec<NodeId> {
        match self {
            KindRecord::Class { bases } => bases.clone(),
            KindRecord::Function {
                parameters,
                return_type,
                ..
            } => parameters.iter().copied().chain(*return_type).collect(),
            KindRecord::Variable { value_type, .. } | KindRecord::Parameter { value_type, .. } => {
                value_type.iter().copied().collect()
            }
            _ => Vec::new(),
        }
    }
}

/// One persisted declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub name: String,
    pub unique_name: String,
    #[serde(default)]
    pub signature: String,
    #[serde(flatten)]
    pub kind: KindRecord,
}

/// One persisted (source, target) edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: NodeId,
    pub to: NodeId,
    pub counts: DependencyCounts,
}

/// Persisted frozen graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl GraphRecord {
    pub fn from_graph(graph: &FrozenGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|(id, node)| NodeRecord {
                id,
                parent: node.parent(),
                name: node.name().to_string(),
                unique_name: node.unique_name().to_string(),
                signature: node.signature().to_string(),
                kind: KindRecord::from_kind(node.kind()),
            })
            .collect();
        let edges = graph
            .iter()
            .flat_map(move |from| {
                graph.dependency_to(from).map(move |(to, counts)| EdgeRecord {
                    from,
                    to,
                    counts: *counts,
                })
            })
            .collect();
        Self { nodes, edges }
    }

    /// Validate the records and rebuild the frozen graph with the same ids.
    pub fn into_graph(self) -> Result<FrozenGraph> {
        let len = self.nodes.len();
        let Some(first) = self.nodes.first() else {
            return Err(CiaError::wrong_format("graph has no declarations"));
        };
        if first.id != NodeId::new(0) || first.parent.is_some() || first.kind.tag() != KindTag::Root {
            return Err(CiaError::wrong_format("declaration 0 must be the root"));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if node.id.index() != index {
                return Err(CiaError::wrong_format(format!(
                    "declaration at position {} has id {}",
                    index, node.id
                )));
            }
            if index > 0 {
                match node.parent {
                    None => {
                        return Err(CiaError::wrong_format(format!(
                            "declaration {} has no parent",
                            node.id
                        )))
                    }
                    Some(parent) if parent.index() >= index => {
                        return Err(CiaError::wrong_format(format!(
                            "declaration {} precedes its parent {}",
                            node.id, parent
                        )))
                    }
                    Some(_) => {}
                }
                if node.kind.tag() == KindTag::Root {
                    return Err(CiaError::wrong_format(format!(
                        "declaration {} is a second root",
                        node.id
                    )));
                }
            }
            if let Some(bad) = node.kind.references().into_iter().find(|r| r.index() >= len) {
                return Err(CiaError::wrong_format(format!(
                    "declaration {} refers to missing declaration {}",
                    node.id, bad
                )));
            }
        }

        let mut builder = GraphBuilder::with_root(declaration(first));
        for node in &self.nodes[1..] {
            let id = builder.add_node(declaration(node));
            if let Some(parent) = node.parent {
                builder.add_child(parent, id).map_err(|e| rejected(node.id, e))?;
            }
        }
        let walk: Vec<NodeId> = builder.descendants(builder.root()).collect();
        if walk.iter().enumerate().any(|(i, id)| id.index() != i + 1) {
            return Err(CiaError::wrong_format("declaration ids are not in pre-order"));
        }

        for node in &self.nodes {
            attach_references(&mut builder, node)?;
        }

        let mut seen: HashSet<(NodeId, NodeId)> = HashSet::with_capacity(self.edges.len());
        for edge in &self.edges {
            if edge.from.index() >= len || edge.to.index() >= len {
                return Err(CiaError::wrong_format(format!(
                    "edge {} -> {} refers to a missing declaration",
                    edge.from, edge.to
                )));
            }
            if edge.counts.is_zero() {
                return Err(CiaError::wrong_format(format!(
                    "edge {} -> {} has no dependencies",
                    edge.from, edge.to
                )));
            }
            if !seen.insert((edge.from, edge.to)) {
                return Err(CiaError::wrong_format(format!(
                    "edge {} -> {} is listed twice",
                    edge.from, edge.to
                )));
            }
            builder
                .add_dependency_counts(edge.from, edge.to, edge.counts)
                .map_err(|e| rejected(edge.from, e))?;
        }

        debug!(nodes = len, edges = self.edges.len(), "Loaded graph records");
        Ok(builder.freeze())
    }
}

fn declaration(node: &NodeRecord) -> Declaration {
    let mut decl = Declaration::new(node.kind.tag(), node.name.clone())
        .with_unique_name(node.unique_name.clone())
        .with_signature(node.signature.clone());
    if let Some(body) = node.kind.body() {
        decl = decl.with_body(body);
    }
    decl
}

fn attach_references(builder: &mut GraphBuilder, node: &NodeRecord) -> Result<()> {
    let id = node.id;
    match &node.kind {
        KindRecord::Class { bases } => {
            for &base in bases {
                builder.add_base(id, base).map_err(|e| rejected(id, e))?;
            }
        }
        KindRecord::Function {
            parameters,
            return_type,
            ..
        } => {
            for &param in parameters {
                builder.add_parameter(id, param).map_err(|e| rejected(id, e))?;
            }
            builder.set_type_ref(id, *return_type).map_err(|e| rejected(id, e))?;
        }
        KindRecord::Variable { value_type, .. } | KindRecord::Parameter { value_type, .. } => {
            builder.set_type_ref(id, *value_type).map_err(|e| rejected(id, e))?;
        }
        _ => {}
    }
    Ok(())
}

fn rejected(id: NodeId, err: crate::error::GraphError) -> CiaError {
    CiaError::wrong_format(format!("declaration {}: {}", id, err))
}

/// Persisted [`ProjectVersion`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectVersionRecord {
    pub format_version: u32,
    pub name: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub include_paths: Vec<String>,
    pub graph: GraphRecord,
}

impl ProjectVersionRecord {
    pub fn from_version(version: &ProjectVersion) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            name: version.name.clone(),
            files: version.files.clone(),
            include_paths: version.include_paths.clone(),
            graph: GraphRecord::from_graph(&version.graph),
        }
    }

    pub fn into_version(self) -> Result<ProjectVersion> {
        check_format_version(self.format_version)?;
        Ok(ProjectVersion {
            name: self.name,
            files: self.files,
            include_paths: self.include_paths,
            graph: self.graph.into_graph()?,
        })
    }
}

/// Persisted [`VersionDifference`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffRecord {
    pub format_version: u32,
    pub version_a: ProjectVersionRecord,
    pub version_b: ProjectVersionRecord,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    pub changed: Vec<(NodeId, NodeId)>,
    pub unchanged: Vec<(NodeId, NodeId)>,
    #[serde(default)]
    pub impact_weights: Option<Vec<f64>>,
    #[serde(default)]
    pub duration_ms: f64,
}

impl DiffRecord {
    pub fn from_difference(diff: &VersionDifference) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            version_a: ProjectVersionRecord::from_version(&diff.version_a),
            version_b: ProjectVersionRecord::from_version(&diff.version_b),
            added: diff.added.iter().copied().collect(),
            removed: diff.removed.iter().copied().collect(),
            changed: diff.changed.iter().copied().collect(),
            unchanged: diff.unchanged.iter().copied().collect(),
            impact_weights: diff.impact_weights.clone(),
            duration_ms: diff.duration_ms,
        }
    }

    /// Rebuild both versions and check that the classification is a strict
    /// partition of their declarations.
    pub fn into_difference(self) -> Result<VersionDifference> {
        check_format_version(self.format_version)?;
        let version_a = Arc::new(self.version_a.into_version()?);
        let version_b = Arc::new(self.version_b.into_version()?);
        let (len_a, len_b) = (version_a.graph.len(), version_b.graph.len());

        let mut diff = VersionDifference::new(version_a, version_b);
        diff.added = self.added.into_iter().collect();
        diff.removed = self.removed.into_iter().collect();
        diff.changed = self.changed.into_iter().collect();
        diff.unchanged = self.unchanged.into_iter().collect();

        let side_a = diff
            .removed
            .iter()
            .copied()
            .chain(diff.changed.iter().map(|&(a, _)| a))
            .chain(diff.unchanged.iter().map(|&(a, _)| a));
        check_partition("old", side_a, len_a)?;
        let side_b = diff
            .added
            .iter()
            .copied()
            .chain(diff.changed.iter().map(|&(_, b)| b))
            .chain(diff.unchanged.iter().map(|&(_, b)| b));
        check_partition("new", side_b, len_b)?;

        if let Some(weights) = &self.impact_weights {
            if weights.len() != len_b {
                return Err(CiaError::wrong_format(format!(
                    "{} impact weights for {} declarations",
                    weights.len(),
                    len_b
                )));
            }
            if weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
                return Err(CiaError::wrong_format("impact weight outside [0, 1]"));
            }
        }
        diff.impact_weights = self.impact_weights;
        diff.finalize(self.duration_ms);
        Ok(diff)
    }
}

fn check_format_version(found: u32) -> Result<()> {
    if found == FORMAT_VERSION {
        Ok(())
    } else {
        Err(CiaError::wrong_format(format!(
            "unsupported format version {} (expected {})",
            found, FORMAT_VERSION
        )))
    }
}

fn check_partition(side: &str, ids: impl Iterator<Item = NodeId>, len: usize) -> Result<()> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if id.index() >= len {
            return Err(CiaError::wrong_format(format!(
                "{} version has no declaration {}",
                side, id
            )));
        }
        if !seen.insert(id) {
            return Err(CiaError::wrong_format(format!(
                "{} declaration {} is classified twice",
                side, id
            )));
        }
    }
    if seen.len() != len {
        return Err(CiaError::wrong_format(format!(
            "{} version: {} of {} declarations classified",
            side,
            seen.len(),
            len
        )));
    }
    Ok(())
}

impl ProjectVersion {
    /// Write this version as pretty-printed JSON.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &ProjectVersionRecord::from_version(self))?;
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let record: ProjectVersionRecord = serde_json::from_reader(reader)?;
        record.into_version()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

impl VersionDifference {
    /// Write both versions and the classification as pretty-printed JSON.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &DiffRecord::from_difference(self))?;
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let record: DiffRecord = serde_json::from_reader(reader)?;
        record.into_difference()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DependencyKind;

    fn sample() -> ProjectVersion {
        let mut builder = GraphBuilder::new();
        let root = builder.root();
        let int = builder.integral("int").unwrap();
        let base = builder.add_declaration(root, Declaration::class("Base")).unwrap();
        let derived = builder.add_declaration(root, Declaration::class("Derived")).unwrap();
        builder.add_base(derived, base).unwrap();
        let f = builder
            .add_declaration(
                derived,
                Declaration::function("size")
                    .with_unique_name("Derived::size")
                    .with_signature("int size(int)")
                    .with_body("{ return n; }"),
            )
            .unwrap();
        let n = builder.add_declaration(f, Declaration::parameter("n")).unwrap();
        builder.set_type_ref(n, Some(int)).unwrap();
        builder.add_parameter(f, n).unwrap();
        builder.set_type_ref(f, Some(int)).unwrap();
        builder.add_dependency(derived, base, DependencyKind::Inheritance).unwrap();
        builder.add_dependency(f, int, DependencyKind::Use).unwrap();
        ProjectVersion::new("v1", builder.freeze()).with_files(["a.cpp"])
    }

    fn records() -> ProjectVersionRecord {
        ProjectVersionRecord::from_version(&sample())
    }

    fn load_err(record: ProjectVersionRecord) -> String {
        match record.into_version() {
            Err(CiaError::WrongFormat { message }) => message,
            other => panic!("expected WrongFormat, got {:?}", other.map(|v| v.name)),
        }
    }

    #[test]
    fn test_round_trip_preserves_records() {
        let original = records();
        let mut buffer = Vec::new();
        sample().to_writer(&mut buffer).unwrap();

        let loaded = ProjectVersion::from_reader(buffer.as_slice()).unwrap();
        assert_eq!(ProjectVersionRecord::from_version(&loaded), original);
        assert_eq!(loaded.files, vec!["a.cpp".to_string()]);
    }

    #[test]
    fn test_node_record_json_shape() {
        let record = records();
        let json = serde_json::to_value(&record.graph.nodes[0]).unwrap();
        assert_eq!(json["kind"], "root");
        assert_eq!(json["id"], 0);
    }

    #[test]
    fn test_rejects_format_version() {
        let mut record = records();
        record.format_version = 99;
        assert!(load_err(record).contains("format version"));
    }

    #[test]
    fn test_rejects_missing_root() {
        let mut record = records();
        record.graph.nodes[0].kind = KindRecord::Namespace;
        assert!(load_err(record).contains("root"));

        let mut record = records();
        record.graph.nodes.clear();
        assert!(load_err(record).contains("no declarations"));
    }

    #[test]
    fn test_rejects_parent_after_child() {
        let mut record = records();
        let last = record.graph.nodes.len() - 1;
        record.graph.nodes[1].parent = Some(NodeId::from_index(last));
        assert!(load_err(record).contains("precedes"));
    }

    #[test]
    fn test_rejects_non_pre_order() {
        // root -> [1, 2], 1 -> [3]: pre-order would be 1, 3, 2
        let mut record = records();
        record.graph.edges.clear();
        record.graph.nodes.truncate(1);
        for (id, parent) in [(1, 0), (2, 0), (3, 1)] {
            record.graph.nodes.push(NodeRecord {
                id: NodeId::new(id),
                parent: Some(NodeId::new(parent)),
                name: format!("n{}", id),
                unique_name: format!("n{}", id),
                signature: String::new(),
                kind: KindRecord::Namespace,
            });
        }
        assert!(load_err(record).contains("pre-order"));
    }

    #[test]
    fn test_rejects_bad_edges() {
        let mut record = records();
        let edge = record.graph.edges[0].clone();
        record.graph.edges.push(edge);
        assert!(load_err(record).contains("twice"));

        let mut record = records();
        record.graph.edges[0].counts = DependencyCounts::ZERO;
        assert!(load_err(record).contains("no dependencies"));

        let mut record = records();
        record.graph.edges[0].to = record.graph.edges[0].from;
        assert!(load_err(record).contains("itself"));

        let mut record = records();
        record.graph.edges[0].to = NodeId::new(500);
        assert!(load_err(record).contains("missing"));
    }

    #[test]
    fn test_rejects_dangling_reference() {
        let mut record = records();
        record.graph.nodes[1].kind = KindRecord::Variable {
            value_type: Some(NodeId::new(77)),
            body: None,
        };
        assert!(load_err(record).contains("missing declaration"));
    }

    #[test]
    fn test_malformed_json_is_wrong_format() {
        let err = ProjectVersion::from_reader("{\"format_version\": 1".as_bytes()).unwrap_err();
        assert!(matches!(err, CiaError::WrongFormat { .. }));
    }
}
