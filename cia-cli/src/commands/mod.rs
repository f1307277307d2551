//! Command implementations for the CIA CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod diff;
pub mod impact;
pub mod report;
pub mod show;

use std::path::Path;

use anyhow::Context;
use cia_core::impact::WorkerPool;
use cia_core::version::ProjectVersion;

/// Load a snapshot file written by [`ProjectVersion::save`].
pub(crate) fn load_version(path: &Path) -> anyhow::Result<ProjectVersion> {
    ProjectVersion::load(path).with_context(|| format!("Failed to load snapshot {}", path.display()))
}

/// Worker pool sized by the command-line flag, falling back to the config.
pub(crate) fn worker_pool(threads: Option<usize>) -> anyhow::Result<WorkerPool> {
    WorkerPool::new(threads).context("Failed to start worker threads")
}
