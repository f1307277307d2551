//! Show command - summarize a snapshot

use std::path::Path;

use cia_core::graph::{dependency_cycles, FrozenGraph, KindTag};
use colored::Colorize;
use serde::Serialize;

use super::load_version;
use crate::output::{OutputConfig, OutputFormat, Outputter, TableOutput};

#[derive(Debug, Serialize)]
pub struct ShowReport {
    pub name: String,
    pub files: Vec<String>,
    pub include_paths: Vec<String>,
    pub declarations: usize,
    pub edges: usize,
    pub kinds: Vec<(KindTag, usize)>,
    /// Dependency cycles by unique name, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycles: Option<Vec<Vec<String>>>,
    #[serde(skip)]
    pub tree: String,
}

impl ShowReport {
    pub fn new(name: &str, files: &[String], include_paths: &[String], graph: &FrozenGraph, cycles: bool) -> Self {
        let cycles = cycles.then(|| {
            dependency_cycles(graph, None)
                .into_iter()
                .map(|cycle| {
                    cycle
                        .into_iter()
                        .map(|id| graph.node(id).unique_name().to_string())
                        .collect()
                })
                .collect()
        });

        Self {
            name: name.to_string(),
            files: files.to_vec(),
            include_paths: include_paths.to_vec(),
            declarations: graph.len(),
            edges: graph.edge_count(),
            kinds: graph.kind_histogram(),
            cycles,
            tree: graph.tree_string(),
        }
    }
}

impl Outputter for ShowReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut output = String::new();
        output.push_str(&format!("{} {}\n", "SNAPSHOT:".cyan().bold(), self.name.yellow()));

        let kinds = self
            .kinds
            .iter()
            .map(|(tag, count)| format!("{} {}", count, tag))
            .collect::<Vec<_>>()
            .join(", ");
        let pairs = [
            ("Files", self.files.len().to_string()),
            ("Include paths", self.include_paths.join(" ")),
            ("Declarations", self.declarations.to_string()),
            ("Edges", self.edges.to_string()),
            ("Kinds", kinds),
        ];
        output.push_str(&TableOutput::format_key_value(&pairs, config));
        output.push_str("\n\n");

        output.push_str(&format!("{}\n", "TREE".yellow().bold()));
        output.push_str(&self.tree);

        if let Some(cycles) = &self.cycles {
            output.push_str(&format!("\n{}\n", "CYCLES".yellow().bold()));
            if cycles.is_empty() {
                output.push_str(&format!("{}\n", "No dependency cycles.".dimmed()));
            }
            for (i, cycle) in cycles.iter().enumerate() {
                output.push_str(&format!("{}. {}\n", i + 1, cycle.join(" -> ")));
            }
        }

        output
    }
}

/// Run the show command
pub fn run(snapshot: &Path, cycles: bool, format: OutputFormat) -> anyhow::Result<()> {
    let version = load_version(snapshot)?;
    let report = ShowReport::new(
        &version.name,
        &version.files,
        &version.include_paths,
        &version.graph,
        cycles,
    );
    report.output(&OutputConfig::auto_detect(format));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cia_core::graph::{Declaration, DependencyKind, GraphBuilder};

    fn cyclic() -> FrozenGraph {
        let mut builder = GraphBuilder::new();
        let root = builder.root();
        let ping = builder
            .add_declaration(root, Declaration::function("ping").with_unique_name("ping"))
            .unwrap();
        let pong = builder
            .add_declaration(root, Declaration::function("pong").with_unique_name("pong"))
            .unwrap();
        builder.add_dependency(ping, pong, DependencyKind::Invocation).unwrap();
        builder.add_dependency(pong, ping, DependencyKind::Invocation).unwrap();
        builder.freeze()
    }

    #[test]
    fn test_report_counts_and_cycles() {
        let graph = cyclic();
        let report = ShowReport::new("v1", &["a.cpp".to_string()], &[], &graph, true);

        assert_eq!(report.declarations, 3);
        assert_eq!(report.edges, 2);
        assert_eq!(
            report.cycles,
            Some(vec![vec!["ping".to_string(), "pong".to_string()]])
        );

        let config = OutputConfig::new(OutputFormat::Table).without_truncation();
        let table = report.to_table(&config);
        assert!(table.contains("ping -> pong"));
        assert!(table.contains("Declarations"));
    }

    #[test]
    fn test_cycles_omitted_from_json() {
        let graph = cyclic();
        let report = ShowReport::new("v1", &[], &[], &graph, false);
        let json = report.to_json();

        assert!(!json.contains("cycles"));
        assert!(!json.contains("tree"));
        assert!(json.contains("\"declarations\": 3"));
    }
}
