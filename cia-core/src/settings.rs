//! Tunables for diffing and impact propagation.
//!
//! All settings deserialize with defaults for missing fields, so a partial
//! `[impact]` table in a config file is enough.

use serde::{Deserialize, Serialize};

use crate::error::{CiaError, Result};
use crate::graph::{DependencyCounts, DependencyKind, DependencyWeights};

/// How much influence survives one hop along a dependency edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayPolicy {
    /// Every edge carries `decay`, whatever its kinds and counts.
    #[default]
    Fixed,
    /// `1 - Π (1 - w_k)^count_k` over the edge's count vector.
    PerKind,
}

impl DecayPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecayPolicy::Fixed => "fixed",
            DecayPolicy::PerKind => "per_kind",
        }
    }
}

/// Impact weight propagation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactSettings {
    /// Compute impact weights as part of a diff.
    pub enabled: bool,

    /// Hop factor used by [`DecayPolicy::Fixed`].
    pub decay: f64,

    /// Hops whose influence drops below this value are not followed.
    pub min_influence: f64,

    pub policy: DecayPolicy,

    /// Per-kind hop weights used by [`DecayPolicy::PerKind`].
    pub weights: DependencyWeights,

    /// Worker threads; `None` uses the available parallelism.
    pub threads: Option<usize>,
}

impl Default for ImpactSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            decay: 0.2,
            min_influence: 1e-9,
            policy: DecayPolicy::Fixed,
            weights: DependencyWeights::default(),
            threads: None,
        }
    }
}

impl ImpactSettings {
    /// Check that every factor is a probability.
    pub fn validate(&self) -> Result<()> {
        check_unit("decay", self.decay)?;
        check_unit("min_influence", self.min_influence)?;
        for kind in DependencyKind::ALL {
            check_unit(&format!("weights.{}", kind), self.weights.get(kind))?;
        }
        if self.threads == Some(0) {
            return Err(CiaError::InvalidSettings {
                message: "threads must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Fraction of influence carried across an edge with these counts.
    pub fn hop_factor(&self, counts: &DependencyCounts) -> f64 {
        match self.policy {
            DecayPolicy::Fixed => self.decay,
            DecayPolicy::PerKind => self.weights.hop_factor(counts),
        }
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CiaError::InvalidSettings {
            message: format!("{} must be within [0, 1], got {}", name, value),
        })
    }
}

/// Settings for [`compare`](crate::differ::compare).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffSettings {
    pub impact: ImpactSettings,
}

impl DiffSettings {
    pub fn validate(&self) -> Result<()> {
        self.impact.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = DiffSettings::default();
        assert!(settings.validate().is_ok());
        assert!(settings.impact.enabled);
        assert_eq!(settings.impact.decay, 0.2);
        assert_eq!(settings.impact.policy, DecayPolicy::Fixed);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let settings = ImpactSettings {
            decay: 1.5,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("decay"));

        let mut settings = ImpactSettings::default();
        settings.weights.set(DependencyKind::Use, -0.1);
        assert!(settings.validate().is_err());

        let settings = ImpactSettings {
            threads: Some(0),
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = ImpactSettings {
            decay: f64::NAN,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: DiffSettings =
            serde_json::from_str(r#"{"impact": {"policy": "per_kind", "weights": {"use": 0.5}}}"#)
                .unwrap();
        assert_eq!(settings.impact.policy, DecayPolicy::PerKind);
        assert_eq!(settings.impact.weights.get(DependencyKind::Use), 0.5);
        assert_eq!(settings.impact.weights.get(DependencyKind::Member), 0.2);
        assert_eq!(settings.impact.decay, 0.2);
    }

    #[test]
    fn test_hop_factor_by_policy() {
        let counts = DependencyCounts::from_pairs([(DependencyKind::Inheritance, 1)]);
        let fixed = ImpactSettings::default();
        assert_eq!(fixed.hop_factor(&counts), 0.2);

        let per_kind = ImpactSettings {
            policy: DecayPolicy::PerKind,
            ..Default::default()
        };
        assert!((per_kind.hop_factor(&counts) - 0.6).abs() < 1e-12);
    }
}
