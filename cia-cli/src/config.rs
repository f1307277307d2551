//! CIA configuration loading from `.ciarc.toml`.
//!
//! Configuration is optional. Without a config file every command runs with
//! the library defaults; command-line flags override config values.
//!
//! # Example Configuration
//!
//! ```toml
//! [impact]
//! enabled = true
//! decay = 0.25
//! policy = "per_kind"
//! threads = 4
//!
//! [impact.weights]
//! member = 0.2
//! use = 0.4
//! invocation = 0.4
//! inheritance = 0.6
//! override = 0.6
//!
//! [output]
//! format = "table"
//! color = true
//! limit = 50
//! ```

use std::path::Path;

use anyhow::Context;
use cia_core::settings::ImpactSettings;
use serde::Deserialize;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".ciarc.toml";

/// Root configuration structure loaded from `.ciarc.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct CiaConfig {
    /// Impact propagation settings, passed to the library as-is.
    #[serde(default)]
    pub impact: ImpactSettings,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Output formatting preferences.
///
/// Command-line flags (e.g., `--format json`) override these settings.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Default output format: `table` or `json`.
    #[serde(default)]
    pub format: Option<String>,

    /// Whether to use colored output. Defaults to auto-detection.
    #[serde(default)]
    pub color: Option<bool>,

    /// Maximum number of listed rows.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl CiaConfig {
    /// Load configuration from `.ciarc.toml` in the given directory.
    ///
    /// A missing file yields defaults. Unreadable, unparsable or invalid
    /// configuration is logged as a warning and replaced by defaults, unless
    /// `strict` is set.
    ///
    /// # Errors
    ///
    /// Only in strict mode, for any problem with an existing config file.
    pub fn load(root: &Path, strict: bool) -> anyhow::Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let loaded = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", CONFIG_FILE))
            .and_then(|content| Self::parse(&content));

        match loaded {
            Ok(config) => Ok(config),
            Err(e) if strict => Err(e),
            Err(e) => {
                tracing::warn!("{:#}; using defaults", e);
                Ok(Self::default())
            }
        }
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Self =
            toml::from_str(content).with_context(|| format!("Failed to parse {}", CONFIG_FILE))?;
        config
            .impact
            .validate()
            .with_context(|| format!("Invalid [impact] section in {}", CONFIG_FILE))?;
        Ok(config)
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Returns the configured color preference, or `None` to auto-detect.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }

    pub fn limit(&self) -> Option<usize> {
        self.output.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cia_core::graph::DependencyKind;
    use cia_core::settings::DecayPolicy;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CiaConfig::default();
        assert!(config.impact.enabled);
        assert_eq!(config.impact.policy, DecayPolicy::Fixed);
        assert!(config.output.format.is_none());
        assert!(config.limit().is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config = CiaConfig::parse(
            r#"
[impact]
enabled = false
decay = 0.3
policy = "per_kind"
threads = 2

[impact.weights]
use = 0.5
override = 0.9

[output]
format = "json"
color = false
limit = 20
"#,
        )
        .unwrap();

        assert!(!config.impact.enabled);
        assert_eq!(config.impact.decay, 0.3);
        assert_eq!(config.impact.policy, DecayPolicy::PerKind);
        assert_eq!(config.impact.threads, Some(2));
        assert_eq!(config.impact.weights.get(DependencyKind::Use), 0.5);
        assert_eq!(config.impact.weights.get(DependencyKind::Override), 0.9);
        assert_eq!(config.impact.weights.get(DependencyKind::Member), 0.2);
        assert_eq!(config.default_format(), Some("json"));
        assert_eq!(config.use_color(), Some(false));
        assert_eq!(config.limit(), Some(20));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(CiaConfig::parse("[impact]\ndecay = 2.0\n").is_err());
        assert!(CiaConfig::parse("[impact]\nthreads = 0\n").is_err());
        assert!(CiaConfig::parse("[impact\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = CiaConfig::load(dir.path(), true).unwrap();
        assert!(config.impact.enabled);
    }

    #[test]
    fn test_load_broken_file_lenient_and_strict() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[output\nformat = ").unwrap();

        let lenient = CiaConfig::load(dir.path(), false).unwrap();
        assert!(lenient.default_format().is_none());

        let err = CiaConfig::load(dir.path(), true).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE));
    }
}
