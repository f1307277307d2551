//! Pairing of declarations between two versions.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::Result;
use crate::graph::{FrozenGraph, KindTag, NodeId};
use crate::impact::{compute_impact, WorkerPool};
use crate::matcher::{MatchLevel, Matcher, NodeRef, Wrapper};
use crate::settings::DiffSettings;
use crate::version::ProjectVersion;

use super::result::VersionDifference;

/// Compare two versions and classify every declaration.
///
/// # Arguments
///
/// * `version_a` - Old version
/// * `version_b` - New version
/// * `settings` - Diff settings; impact weights are computed over version B
///   when `settings.impact.enabled` is set
/// * `pool` - Workers for impact propagation
///
/// # Returns
///
/// A strict partition of both graphs into added, removed, changed and
/// unchanged declarations.
pub fn compare(
    version_a: Arc<ProjectVersion>,
    version_b: Arc<ProjectVersion>,
    settings: &DiffSettings,
    pool: &WorkerPool,
) -> Result<VersionDifference> {
    settings.validate()?;
    let start = Instant::now();

    let pairing = pair_declarations(&version_a.graph, &version_b.graph);

    let impact_weights = if settings.impact.enabled {
        let seeds: Vec<NodeId> = pairing.changed.iter().map(|&(_, b)| b).collect();
        Some(compute_impact(&version_b.graph, &seeds, &settings.impact, pool)?)
    } else {
        None
    };

    let mut diff = VersionDifference::new(version_a, version_b);
    diff.added = pairing.added;
    diff.removed = pairing.removed;
    diff.changed = pairing.changed;
    diff.unchanged = pairing.unchanged;
    diff.impact_weights = impact_weights;
    diff.finalize(start.elapsed().as_secs_f64() * 1000.0);

    info!(
        old = %diff.version_a.name,
        new = %diff.version_b.name,
        duration_ms = diff.duration_ms,
        summary = %diff.summary.text(),
        "Compared versions"
    );
    Ok(diff)
}

/// Classification sets produced by [`pair_declarations`].
#[derive(Debug, Default)]
pub struct Pairing {
    pub added: BTreeSet<NodeId>,
    pub removed: BTreeSet<NodeId>,
    pub changed: BTreeSet<(NodeId, NodeId)>,
    pub unchanged: BTreeSet<(NodeId, NodeId)>,
}

/// Pair declarations of `a` with declarations of `b`.
///
/// Declarations are bucketed at PrototypeIdentical and, within a bucket,
/// grouped at Similar. A declarations are visited in ascending id, parents
/// before children; each takes an unpaired B candidate of its Similar group,
/// preferring one whose parent is the partner of its own parent, then one
/// matching at Identical, then the lowest id.
///
/// A declarations still unpaired afterwards are retried in ascending id
/// against unpaired B declarations of the same kind and unique name under
/// the partner of their parent. Such a pair differs in its prototype (a
/// signature edit) and is always changed.
pub fn pair_declarations(a: &FrozenGraph, b: &FrozenGraph) -> Pairing {
    let matcher = Matcher::new();

    let mut prototypes: HashSet<Wrapper<'_, '_>> = HashSet::new();
    let mut groups: HashMap<Wrapper<'_, '_>, Vec<NodeId>> = HashMap::new();
    for id in b.iter() {
        let rb = NodeRef::new(b, id);
        prototypes.insert(Wrapper::new(&matcher, rb, MatchLevel::PrototypeIdentical));
        groups
            .entry(Wrapper::new(&matcher, rb, MatchLevel::Similar))
            .or_default()
            .push(id);
    }
    debug!(
        prototypes = prototypes.len(),
        groups = groups.len(),
        nodes = b.len(),
        "Bucketed new version"
    );

    let mut pairing = Pairing::default();
    let mut partner: Vec<Option<NodeId>> = vec![None; a.len()];
    let mut taken = vec![false; b.len()];
    let mut unpaired: Vec<NodeId> = Vec::new();

    for id in a.iter() {
        let ra = NodeRef::new(a, id);
        let group = if prototypes.contains(&Wrapper::new(&matcher, ra, MatchLevel::PrototypeIdentical)) {
            groups.get(&Wrapper::new(&matcher, ra, MatchLevel::Similar))
        } else {
            None
        };
        let free: Vec<NodeId> = group
            .map(|ids| ids.iter().copied().filter(|&cb| !taken[cb.index()]).collect())
            .unwrap_or_default();

        let parent_partner = a.parent(id).and_then(|p| partner[p.index()]);
        let preferred: Vec<NodeId> = match parent_partner {
            Some(pp) => free.iter().copied().filter(|&cb| b.parent(cb) == Some(pp)).collect(),
            None => Vec::new(),
        };
        let pool = if preferred.is_empty() { free } else { preferred };

        let choice = pool
            .iter()
            .copied()
            .find(|&cb| matcher.matches(ra, NodeRef::new(b, cb), MatchLevel::Identical))
            .map(|cb| (cb, true))
            .or_else(|| pool.first().map(|&cb| (cb, false)));

        match choice {
            Some((cb, identical)) => {
                partner[id.index()] = Some(cb);
                taken[cb.index()] = true;
                if identical {
                    pairing.unchanged.insert((id, cb));
                } else {
                    pairing.changed.insert((id, cb));
                }
            }
            None => unpaired.push(id),
        }
    }

    let mut by_name: HashMap<(KindTag, &str), Vec<NodeId>> = HashMap::new();
    for id in b.iter().filter(|id| !taken[id.index()]) {
        let node = b.node(id);
        by_name.entry((node.tag(), node.unique_name())).or_default().push(id);
    }

    let mut renamed = 0usize;
    for id in unpaired {
        let node = a.node(id);
        let expected_parent = a.parent(id).and_then(|p| partner[p.index()]);
        let found = match (a.parent(id), expected_parent) {
            (Some(_), None) => None,
            _ => by_name
                .get_mut(&(node.tag(), node.unique_name()))
                .and_then(|ids| {
                    let position = ids.iter().position(|&cb| b.parent(cb) == expected_parent)?;
                    Some(ids.remove(position))
                }),
        };

        match found {
            Some(cb) => {
                partner[id.index()] = Some(cb);
                taken[cb.index()] = true;
                pairing.changed.insert((id, cb));
                renamed += 1;
            }
            None => {
                pairing.removed.insert(id);
            }
        }
    }

    pairing.added = b.iter().filter(|id| !taken[id.index()]).collect();
    debug!(
        added = pairing.added.len(),
        removed = pairing.removed.len(),
        changed = pairing.changed.len(),
        unchanged = pairing.unchanged.len(),
        reprototyped = renamed,
        cached_pairs = matcher.cached_pairs(),
        "Paired declarations"
    );
    pairing
}
