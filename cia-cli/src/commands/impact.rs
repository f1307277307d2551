//! Impact command - what is affected if these declarations change?

use std::path::Path;

use anyhow::{bail, Context};
use cia_core::graph::{FrozenGraph, KindTag, NodeId};
use cia_core::impact::{compute_impact, ranked};
use colored::Colorize;
use serde::Serialize;

use super::{load_version, worker_pool};
use crate::config::CiaConfig;
use crate::output::{weight, OutputConfig, OutputFormat, Outputter, TableOutput};

/// Command-line options of `cia impact`.
#[derive(Debug, Default)]
pub struct ImpactOptions {
    pub threads: Option<usize>,
    pub decay: Option<f64>,
    pub min_influence: Option<f64>,
    /// Only list this many declarations
    pub top: Option<usize>,
}

/// One ranked declaration.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactEntry {
    pub id: NodeId,
    pub unique_name: String,
    pub kind: KindTag,
    pub weight: f64,
}

impl ImpactEntry {
    pub fn from_ranked(graph: &FrozenGraph, ranked: Vec<(NodeId, f64)>) -> Vec<Self> {
        ranked
            .into_iter()
            .map(|(id, weight)| {
                let node = graph.node(id);
                Self {
                    id,
                    unique_name: node.unique_name().to_string(),
                    kind: node.tag(),
                    weight,
                }
            })
            .collect()
    }

    pub fn table(entries: &[Self], config: &OutputConfig) -> String {
        let rows: Vec<Vec<String>> = entries
            .iter()
            .map(|e| {
                vec![
                    e.id.to_string(),
                    e.kind.as_str().to_string(),
                    e.unique_name.clone(),
                    weight(Some(e.weight)),
                ]
            })
            .collect();
        TableOutput::from_rows(&["Id", "Kind", "Name", "Weight"], &rows, config)
    }
}

/// Impact weights for a set of changed declarations.
#[derive(Debug, Serialize)]
pub struct ImpactReport {
    pub snapshot: String,
    pub changed: Vec<String>,
    /// Declarations with a non-zero weight, changed ones included
    pub affected: usize,
    pub entries: Vec<ImpactEntry>,
}

impl Outputter for ImpactReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{} {} in {}\n",
            "IMPACT:".cyan().bold(),
            self.changed.join(", ").yellow(),
            self.snapshot
        ));
        output.push_str(&format!(
            "{} declarations affected\n\n",
            self.affected.to_string().cyan()
        ));
        output.push_str(&ImpactEntry::table(&self.entries, config));
        output
    }
}

/// Look up every name, failing on the first unknown one.
fn resolve(graph: &FrozenGraph, names: &[String]) -> anyhow::Result<Vec<NodeId>> {
    names
        .iter()
        .map(|name| match graph.find_by_unique_name(name) {
            Some(id) => Ok(id),
            None => bail!("Unknown declaration: {}", name),
        })
        .collect()
}

/// Run the impact command
pub fn run(
    snapshot: &Path,
    changed: &[String],
    options: &ImpactOptions,
    config: &CiaConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let version = load_version(snapshot)?;
    let seeds = resolve(&version.graph, changed)?;

    let mut settings = config.impact.clone();
    if let Some(decay) = options.decay {
        settings.decay = decay;
    }
    if let Some(min_influence) = options.min_influence {
        settings.min_influence = min_influence;
    }
    let pool = worker_pool(options.threads.or(settings.threads))?;
    let weights = compute_impact(&version.graph, &seeds, &settings, &pool)
        .context("Failed to compute impact weights")?;

    let limit = options.top.or(config.limit());
    let report = ImpactReport {
        snapshot: version.name.clone(),
        changed: changed.to_vec(),
        affected: weights.iter().filter(|&&w| w > 0.0).count(),
        entries: ImpactEntry::from_ranked(&version.graph, ranked(&weights, limit)),
    };
    report.output(&OutputConfig::auto_detect(format));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cia_core::graph::{Declaration, GraphBuilder};

    fn graph() -> FrozenGraph {
        let mut builder = GraphBuilder::new();
        let root = builder.root();
        builder
            .add_declaration(root, Declaration::function("run").with_unique_name("app::run"))
            .unwrap();
        builder.freeze()
    }

    #[test]
    fn test_resolve() {
        let graph = graph();
        let ids = resolve(&graph, &["app::run".to_string()]).unwrap();
        assert_eq!(ids, vec![NodeId::new(1)]);

        let err = resolve(&graph, &["app::missing".to_string()]).unwrap_err();
        assert!(err.to_string().contains("app::missing"));
    }

    #[test]
    fn test_entries_table() {
        let graph = graph();
        let entries = ImpactEntry::from_ranked(&graph, vec![(NodeId::new(1), 1.0)]);
        let config = OutputConfig::new(OutputFormat::Table).without_truncation();
        let table = ImpactEntry::table(&entries, &config);

        assert!(table.contains("app::run"));
        assert!(table.contains("1.0000"));
        assert!(table.contains("#1"));
    }
}
