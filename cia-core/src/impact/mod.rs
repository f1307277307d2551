//! Impact weight propagation.
//!
//! Given a set of changed declarations, every declaration gets a weight in
//! `[0, 1]` describing how strongly it is affected. Influence travels
//! against the direction of dependency edges (from a changed declaration to
//! the declarations that depend on it) and decays with every hop.
//!
//! # Algorithm
//!
//! One task per changed declaration runs on the caller's [`WorkerPool`]:
//!
//! - private weights start at `1.0`, the changed declaration at `0.0`
//! - walk incoming edges depth-first with influence `1.0`
//! - each hop multiplies influence by the hop factor, and the dependent's
//!   weight by `1 - influence`
//! - a declaration already on the current path is skipped, so diamonds
//!   compound but cycles terminate
//!
//! Partial vectors are multiplied entrywise on the calling thread and the
//! final weight is `1 - product`.

pub mod pool;

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{CiaError, Result};
use crate::graph::{DependencyCounts, FrozenGraph, NodeId};
use crate::settings::ImpactSettings;

pub use pool::WorkerPool;

/// Impact weights of every declaration of `graph`, indexed by id.
///
/// # Arguments
///
/// * `graph` - Graph the changed declarations belong to
/// * `changed` - Changed declarations; duplicates are ignored
/// * `settings` - Decay policy and pruning threshold
/// * `pool` - Workers running one task per changed declaration
///
/// # Errors
///
/// `NodeOutOfRange` for an id outside the graph, `InvalidSettings` for
/// settings that fail validation, and `ImpactTask` if any task fails. A
/// failure discards every partial result.
pub fn compute_impact(
    graph: &FrozenGraph,
    changed: &[NodeId],
    settings: &ImpactSettings,
    pool: &WorkerPool,
) -> Result<Vec<f64>> {
    settings.validate()?;
    let seeds: Vec<NodeId> = changed.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    if let Some(&node) = seeds.iter().find(|&&id| !graph.contains(id)) {
        return Err(CiaError::NodeOutOfRange {
            node,
            len: graph.len(),
        });
    }

    let start = Instant::now();
    debug!(seeds = seeds.len(), threads = pool.threads(), "Propagating impact");

    let partials: Vec<Result<Vec<f64>>> = pool.install(|| {
        seeds
            .par_iter()
            .map(|&seed| run_task(graph, seed, settings))
            .collect()
    });

    let mut combined = vec![1.0f64; graph.len()];
    for partial in partials {
        for (total, weight) in combined.iter_mut().zip(partial?) {
            *total *= weight;
        }
    }
    let weights: Vec<f64> = combined.into_iter().map(|w| (1.0 - w).clamp(0.0, 1.0)).collect();

    info!(
        seeds = seeds.len(),
        nodes = graph.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Computed impact weights"
    );
    Ok(weights)
}

/// Declarations sorted by descending weight, ties by ascending id.
/// Zero weights are skipped; `limit` caps the length.
pub fn ranked(weights: &[f64], limit: Option<usize>) -> Vec<(NodeId, f64)> {
    let mut ranked: Vec<(NodeId, f64)> = weights
        .iter()
        .enumerate()
        .filter(|&(_, &w)| w > 0.0)
        .map(|(index, &w)| (NodeId::from_index(index), w))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    ranked
}

fn run_task(graph: &FrozenGraph, seed: NodeId, settings: &ImpactSettings) -> Result<Vec<f64>> {
    panic::catch_unwind(AssertUnwindSafe(|| propagate(graph, seed, settings))).map_err(|payload| {
        CiaError::ImpactTask {
            node: seed,
            message: panic_message(payload.as_ref()),
        }
    })
}

struct Frame<'a> {
    node: NodeId,
    influence: f64,
    incoming: std::slice::Iter<'a, (NodeId, DependencyCounts)>,
}

/// Private weight vector for one changed declaration.
fn propagate(graph: &FrozenGraph, seed: NodeId, settings: &ImpactSettings) -> Vec<f64> {
    let mut weights = vec![1.0f64; graph.len()];
    let mut on_path = vec![false; graph.len()];
    weights[seed.index()] = 0.0;
    on_path[seed.index()] = true;

    let mut stack = vec![Frame {
        node: seed,
        influence: 1.0,
        incoming: graph.incoming(seed).iter(),
    }];

    while let Some(frame) = stack.last_mut() {
        match frame.incoming.next() {
            Some((source, counts)) => {
                let source = *source;
                if on_path[source.index()] {
                    continue;
                }
                let influence = frame.influence * settings.hop_factor(counts);
                if influence <= 0.0 || influence < settings.min_influence {
                    continue;
                }
                weights[source.index()] *= 1.0 - influence;
                on_path[source.index()] = true;
                stack.push(Frame {
                    node: source,
                    influence,
                    incoming: graph.incoming(source).iter(),
                });
            }
            None => {
                if let Some(done) = stack.pop() {
                    on_path[done.node.index()] = false;
                }
            }
        }
    }
    weights
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}
