//! Table output formatting using the `tabled` crate

use super::{truncate, OutputConfig};
use tabled::{
    builder::Builder,
    settings::{object::Columns, style::Style, Alignment, Modify, Width},
};

/// Widest a single cell may grow before it is truncated on a TTY.
const MAX_CELL_WIDTH: usize = 60;

/// Table output formatter
pub struct TableOutput;

impl TableOutput {
    /// Create a table from rows of strings
    pub fn from_rows(headers: &[&str], rows: &[Vec<String>], config: &OutputConfig) -> String {
        if rows.is_empty() {
            return "(no results)".to_string();
        }

        let mut builder = Builder::default();
        builder.push_record(headers.iter().copied());
        for row in rows {
            if config.should_truncate() {
                builder.push_record(row.iter().map(|cell| truncate(cell, MAX_CELL_WIDTH)));
            } else {
                builder.push_record(row.iter().map(|cell| cell.as_str()));
            }
        }

        let mut table = builder.build();
        table.with(Style::rounded());
        if config.should_truncate() {
            table.with(Width::wrap(config.effective_width()));
        }
        table.to_string()
    }

    /// Format a simple key-value table
    pub fn format_key_value(pairs: &[(&str, String)], config: &OutputConfig) -> String {
        let mut builder = Builder::default();
        for (key, value) in pairs {
            builder.push_record([*key, value.as_str()]);
        }

        let mut table = builder.build();
        table.with(Style::rounded());
        table.with(Modify::new(Columns::first()).with(Alignment::right()));
        if config.should_truncate() {
            table.with(Width::wrap(config.effective_width()));
        }
        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_from_rows() {
        let headers = ["Change", "Name"];
        let rows = vec![
            vec!["added".to_string(), "app::run".to_string()],
            vec!["removed".to_string(), "app::stop".to_string()],
        ];
        let config = OutputConfig::new(OutputFormat::Table).without_truncation();
        let output = TableOutput::from_rows(&headers, &rows, &config);

        assert!(output.contains("Change"));
        assert!(output.contains("app::run"));
        assert!(output.contains("app::stop"));
    }

    #[test]
    fn test_empty_rows() {
        let config = OutputConfig::new(OutputFormat::Table);
        assert_eq!(TableOutput::from_rows(&["Name"], &[], &config), "(no results)");
    }

    #[test]
    fn test_key_value_table() {
        let pairs = [("Nodes", "12".to_string()), ("Edges", "7".to_string())];
        let config = OutputConfig::new(OutputFormat::Table).without_truncation();
        let output = TableOutput::format_key_value(&pairs, &config);

        assert!(output.contains("Nodes"));
        assert!(output.contains("12"));
    }
}
