//! Output formatting for the CIA CLI
//!
//! Every command result renders either as a human-readable table or as
//! pretty-printed JSON. Colors and truncation follow the TTY unless the
//! configuration overrides them.

use clap::ValueEnum;
use serde::Serialize;
use std::io::IsTerminal;
use std::str::FromStr;

mod json;
mod table;

pub use self::json::JsonOutput;
pub use self::table::TableOutput;

/// Output format for CLI results
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format (default)
    #[default]
    Table,
    /// JSON format for machine consumption
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: '{}'", s)),
        }
    }
}

/// Configuration for output rendering
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Disable truncation of long values
    pub no_truncate: bool,
    /// Override terminal width (None = auto-detect)
    pub width: Option<usize>,
    /// Maximum number of listed rows (None = all)
    pub limit: Option<usize>,
}

impl OutputConfig {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            no_truncate: false,
            width: None,
            limit: None,
        }
    }

    /// Create an OutputConfig with automatic TTY detection.
    ///
    /// Truncation is disabled when stdout is piped or redirected.
    pub fn auto_detect(format: OutputFormat) -> Self {
        Self {
            no_truncate: !std::io::stdout().is_terminal(),
            ..Self::new(format)
        }
    }

    /// Get the effective terminal width
    pub fn effective_width(&self) -> usize {
        self.width.unwrap_or_else(|| {
            terminal_size::terminal_size()
                .map(|(w, _)| w.0 as usize)
                .unwrap_or(100)
        })
    }

    pub fn should_truncate(&self) -> bool {
        !self.no_truncate
    }

    pub fn without_truncation(mut self) -> Self {
        self.no_truncate = true;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Types that can be rendered in every supported format.
pub trait Outputter: Serialize {
    /// Render as table format
    fn to_table(&self, config: &OutputConfig) -> String;

    /// Render as JSON format
    fn to_json(&self) -> String {
        JsonOutput::format(self)
    }

    /// Render using the format specified in config
    fn render(&self, config: &OutputConfig) -> String {
        match config.format {
            OutputFormat::Table => self.to_table(config),
            OutputFormat::Json => self.to_json(),
        }
    }

    /// Render and print to stdout
    fn output(&self, config: &OutputConfig) {
        println!("{}", self.render(config));
    }
}

/// Format an impact weight for display.
pub fn weight(value: Option<f64>) -> String {
    match value {
        Some(w) => format!("{:.4}", w),
        None => "-".to_string(),
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed
pub fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let truncated: String = s.chars().take(max_width - 3).collect();
        format!("{}...", truncated)
    }
}
