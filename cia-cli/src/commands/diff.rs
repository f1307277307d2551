//! Diff command - compare two snapshots of a project
//!
//! Classifies every declaration as added, removed, changed or unchanged and
//! ranks the declarations of the new snapshot by impact weight.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use cia_core::differ::{compare, DeclarationChange, DiffSummary, VersionDifference};
use cia_core::impact::ranked;
use cia_core::settings::DiffSettings;
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use super::impact::ImpactEntry;
use super::{load_version, worker_pool};
use crate::config::CiaConfig;
use crate::output::{weight, OutputConfig, OutputFormat, Outputter, TableOutput};

/// Number of most impacted declarations listed after a diff.
const MOST_IMPACTED: usize = 10;

/// Command-line options of `cia diff`.
#[derive(Debug, Default)]
pub struct DiffOptions<'a> {
    pub threads: Option<usize>,
    pub no_impact: bool,
    pub decay: Option<f64>,
    pub min_influence: Option<f64>,
    pub save: Option<&'a Path>,
    pub all: bool,
}

/// Diff result as printed by `cia diff` and `cia report`.
#[derive(Debug, Serialize)]
pub struct DiffReport {
    pub old: String,
    pub new: String,
    pub summary: DiffSummary,
    pub summary_text: String,
    pub duration_ms: f64,
    pub changes: Vec<DeclarationChange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub most_impacted: Vec<ImpactEntry>,
}

impl DiffReport {
    pub fn from_difference(diff: &VersionDifference, include_unchanged: bool) -> Self {
        let most_impacted = diff
            .impact_weights
            .as_deref()
            .map(|weights| {
                ImpactEntry::from_ranked(&diff.version_b.graph, ranked(weights, Some(MOST_IMPACTED)))
            })
            .unwrap_or_default();

        Self {
            old: diff.version_a.name.clone(),
            new: diff.version_b.name.clone(),
            summary: diff.summary.clone(),
            summary_text: diff.summary.text(),
            duration_ms: diff.duration_ms,
            changes: diff.changes(include_unchanged),
            most_impacted,
        }
    }
}

fn signature_cell(change: &DeclarationChange) -> String {
    match (&change.old_signature, &change.new_signature) {
        (Some(old), Some(new)) if old != new => format!("{} => {}", old, new),
        (_, Some(sig)) | (Some(sig), None) => sig.clone(),
        (None, None) => String::new(),
    }
}

impl Outputter for DiffReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{} {} -> {}\n",
            "DIFF:".cyan().bold(),
            self.old.yellow(),
            self.new.green()
        ));
        output.push_str(&format!(
            "{} ({:.1}ms)\n\n",
            self.summary_text,
            self.duration_ms
        ));

        let listed = &self.changes;
        if listed.is_empty() {
            output.push_str(&format!("{}\n", "No changes detected.".dimmed()));
        } else {
            let shown = config.limit.unwrap_or(listed.len()).min(listed.len());
            let rows: Vec<Vec<String>> = listed[..shown]
                .iter()
                .map(|change| {
                    vec![
                        change.change_type.as_str().to_string(),
                        change.kind.as_str().to_string(),
                        change.unique_name.clone(),
                        signature_cell(change),
                        weight(change.impact),
                    ]
                })
                .collect();
            output.push_str(&TableOutput::from_rows(
                &["Change", "Kind", "Name", "Signature", "Impact"],
                &rows,
                config,
            ));
            output.push('\n');
            if shown < listed.len() {
                output.push_str(&format!(
                    "{}\n",
                    format!("... and {} more", listed.len() - shown).dimmed()
                ));
            }
        }

        if !self.most_impacted.is_empty() {
            output.push_str(&format!("\n{}\n", "MOST IMPACTED".yellow().bold()));
            output.push_str(&ImpactEntry::table(&self.most_impacted, config));
            output.push('\n');
        }

        output
    }
}

/// Run the diff command
pub fn run(
    old: &Path,
    new: &Path,
    options: &DiffOptions<'_>,
    config: &CiaConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let version_a = Arc::new(load_version(old)?);
    let version_b = Arc::new(load_version(new)?);

    let mut settings = DiffSettings {
        impact: config.impact.clone(),
    };
    if options.no_impact {
        settings.impact.enabled = false;
    }
    if let Some(decay) = options.decay {
        settings.impact.decay = decay;
    }
    if let Some(min_influence) = options.min_influence {
        settings.impact.min_influence = min_influence;
    }
    let pool = worker_pool(options.threads.or(settings.impact.threads))?;

    let diff = compare(version_a, version_b, &settings, &pool)
        .with_context(|| format!("Failed to compare {} and {}", old.display(), new.display()))?;

    if let Some(path) = options.save {
        diff.save(path)
            .with_context(|| format!("Failed to save diff to {}", path.display()))?;
        info!(path = %path.display(), "Saved diff");
    }

    let report = DiffReport::from_difference(&diff, options.all);
    report.output(&OutputConfig::auto_detect(format).with_limit(config.limit()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cia_core::differ::ChangeType;
    use cia_core::graph::{KindTag, NodeId};

    #[test]
    fn test_signature_cell() {
        let changed = DeclarationChange::create(ChangeType::Changed, KindTag::Function, "run")
            .with_signatures(Some("void run()".into()), Some("int run()".into()));
        assert_eq!(signature_cell(&changed), "void run() => int run()");

        let removed = DeclarationChange::create(ChangeType::Removed, KindTag::Function, "stop")
            .with_ids(Some(NodeId::new(3)), None)
            .with_signatures(Some("void stop()".into()), None);
        assert_eq!(signature_cell(&removed), "void stop()");
    }

    #[test]
    fn test_empty_report_table() {
        let report = DiffReport {
            old: "v1".to_string(),
            new: "v2".to_string(),
            summary: DiffSummary::default(),
            summary_text: DiffSummary::default().text(),
            duration_ms: 1.5,
            changes: Vec::new(),
            most_impacted: Vec::new(),
        };
        let config = OutputConfig::new(OutputFormat::Table).without_truncation();
        let table = report.to_table(&config);

        assert!(table.contains("v1"));
        assert!(table.contains("No changes"));
        assert!(!table.contains("MOST IMPACTED"));
    }

    #[test]
    fn test_limit_caps_rows() {
        let changes = (0..5)
            .map(|i| DeclarationChange::create(ChangeType::Added, KindTag::Function, format!("f{}", i)))
            .collect();
        let report = DiffReport {
            old: "a".to_string(),
            new: "b".to_string(),
            summary: DiffSummary::default(),
            summary_text: String::new(),
            duration_ms: 0.0,
            changes,
            most_impacted: Vec::new(),
        };
        let config = OutputConfig::new(OutputFormat::Table)
            .without_truncation()
            .with_limit(Some(2));
        let table = report.to_table(&config);

        assert!(table.contains("f1"));
        assert!(!table.contains("f4"));
        assert!(table.contains("and 3 more"));
    }
}
