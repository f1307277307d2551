//! Report command - render a diff saved with `cia diff --save`

use std::path::Path;

use anyhow::Context;
use cia_core::differ::VersionDifference;

use super::diff::DiffReport;
use crate::config::CiaConfig;
use crate::output::{OutputConfig, OutputFormat, Outputter};

/// Run the report command
pub fn run(diff_file: &Path, all: bool, config: &CiaConfig, format: OutputFormat) -> anyhow::Result<()> {
    let diff = VersionDifference::load(diff_file)
        .with_context(|| format!("Failed to load diff {}", diff_file.display()))?;

    DiffReport::from_difference(&diff, all)
        .output(&OutputConfig::auto_detect(format).with_limit(config.limit()));
    Ok(())
}
