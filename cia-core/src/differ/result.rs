//! The outcome of comparing two project versions.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::graph::NodeId;
use crate::version::ProjectVersion;

use super::changes::{ChangeType, DeclarationChange, DiffSummary};

/// Partition of both versions' declarations.
///
/// Every declaration of version A is in exactly one of `removed`,
/// `changed.0` or `unchanged.0`; every declaration of version B is in exactly
/// one of `added`, `changed.1` or `unchanged.1`.
#[derive(Debug, Clone)]
pub struct VersionDifference {
    pub version_a: Arc<ProjectVersion>,
    pub version_b: Arc<ProjectVersion>,

    /// Ids in version B with no counterpart in A
    pub added: BTreeSet<NodeId>,

    /// Ids in version A with no counterpart in B
    pub removed: BTreeSet<NodeId>,

    /// (A id, B id) pairs that are similar but not identical
    pub changed: BTreeSet<(NodeId, NodeId)>,

    /// (A id, B id) pairs that are identical
    pub unchanged: BTreeSet<(NodeId, NodeId)>,

    /// Impact weights indexed by version B ids
    pub impact_weights: Option<Vec<f64>>,

    pub summary: DiffSummary,

    /// Duration of the comparison in milliseconds
    pub duration_ms: f64,
}

impl VersionDifference {
    pub fn new(version_a: Arc<ProjectVersion>, version_b: Arc<ProjectVersion>) -> Self {
        Self {
            version_a,
            version_b,
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
            changed: BTreeSet::new(),
            unchanged: BTreeSet::new(),
            impact_weights: None,
            summary: DiffSummary::default(),
            duration_ms: 0.0,
        }
    }

    /// Recompute the summary from the classification sets and record timing.
    pub fn finalize(&mut self, duration_ms: f64) {
        let (ga, gb) = (&self.version_a.graph, &self.version_b.graph);
        let mut summary = DiffSummary::new();
        for &id in &self.removed {
            summary.record(ga.node(id).tag(), ChangeType::Removed);
        }
        for &(_, b) in &self.changed {
            summary.record(gb.node(b).tag(), ChangeType::Changed);
        }
        for &id in &self.added {
            summary.record(gb.node(id).tag(), ChangeType::Added);
        }
        for &(_, b) in &self.unchanged {
            summary.record(gb.node(b).tag(), ChangeType::Unchanged);
        }
        self.summary = summary;
        self.duration_ms = duration_ms;
    }

    /// Whether anything was added, removed or changed.
    pub fn is_changed(&self) -> bool {
        !(self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty())
    }

    /// Impact weight of a version B declaration, when weights were computed.
    pub fn impact_of(&self, b: NodeId) -> Option<f64> {
        self.impact_weights
            .as_ref()
            .and_then(|weights| weights.get(b.index()).copied())
    }

    /// Counterpart in version B of a version A declaration.
    pub fn partner_of(&self, a: NodeId) -> Option<NodeId> {
        let range = (a, NodeId::new(0))..=(a, NodeId::new(u32::MAX));
        self.changed
            .range(range.clone())
            .chain(self.unchanged.range(range))
            .next()
            .map(|&(_, b)| b)
    }

    /// Report rows: removed, then changed, then added, each in id order;
    /// unchanged rows last when requested.
    pub fn changes(&self, include_unchanged: bool) -> Vec<DeclarationChange> {
        let (ga, gb) = (&self.version_a.graph, &self.version_b.graph);
        let mut rows = Vec::new();

        for &a in &self.removed {
            let node = ga.node(a);
            rows.push(
                DeclarationChange::create(ChangeType::Removed, node.tag(), node.unique_name())
                    .with_ids(Some(a), None)
                    .with_signatures(Some(node.signature().to_string()), None),
            );
        }

        let paired = |change_type: ChangeType, &(a, b): &(NodeId, NodeId)| {
            let (old, new) = (ga.node(a), gb.node(b));
            DeclarationChange::create(change_type, new.tag(), new.unique_name())
                .with_ids(Some(a), Some(b))
                .with_signatures(
                    Some(old.signature().to_string()),
                    Some(new.signature().to_string()),
                )
                .with_impact(self.impact_of(b))
        };
        rows.extend(self.changed.iter().map(|pair| paired(ChangeType::Changed, pair)));

        for &b in &self.added {
            let node = gb.node(b);
            rows.push(
                DeclarationChange::create(ChangeType::Added, node.tag(), node.unique_name())
                    .with_ids(None, Some(b))
                    .with_signatures(None, Some(node.signature().to_string()))
                    .with_impact(self.impact_of(b)),
            );
        }

        if include_unchanged {
            rows.extend(self.unchanged.iter().map(|pair| paired(ChangeType::Unchanged, pair)));
        }
        rows
    }
}
