//! Change classification rows and summary statistics for a version diff.

use serde::{Deserialize, Serialize};

use crate::graph::{KindTag, NodeId};

/// Classification of a declaration across two versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Removed,
    Changed,
    Added,
    Unchanged,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
            ChangeType::Changed => "changed",
            ChangeType::Unchanged => "unchanged",
        }
    }
}

/// One reported declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeclarationChange {
    /// Added, removed, changed or unchanged
    pub change_type: ChangeType,

    /// Kind of the declaration (function, class, variable, ...)
    pub kind: KindTag,

    /// Fully qualified name
    pub unique_name: String,

    /// Id in the old version, if present there
    pub old_id: Option<NodeId>,

    /// Id in the new version, if present there
    pub new_id: Option<NodeId>,

    /// Signature in the old version
    pub old_signature: Option<String>,

    /// Signature in the new version
    pub new_signature: Option<String>,

    /// Impact weight of the new-version declaration, when computed
    pub impact: Option<f64>,
}

impl DeclarationChange {
    pub fn create(change_type: ChangeType, kind: KindTag, unique_name: impl Into<String>) -> Self {
        Self {
            change_type,
            kind,
            unique_name: unique_name.into(),
            old_id: None,
            new_id: None,
            old_signature: None,
            new_signature: None,
            impact: None,
        }
    }

    pub fn with_ids(mut self, old: Option<NodeId>, new: Option<NodeId>) -> Self {
        self.old_id = old;
        self.new_id = new;
        self
    }

    pub fn with_signatures(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_signature = old;
        self.new_signature = new;
        self
    }

    pub fn with_impact(mut self, impact: Option<f64>) -> Self {
        self.impact = impact;
        self
    }

    /// Whether both sides exist and their signatures differ.
    pub fn is_signature_change(&self) -> bool {
        match (&self.old_signature, &self.new_signature) {
            (Some(old), Some(new)) => old != new,
            _ => false,
        }
    }
}

/// Added / removed / changed counters for one kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCounts {
    pub added: u32,
    pub removed: u32,
    pub changed: u32,
}

impl ChangeCounts {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.changed == 0
    }

    fn text(&self) -> String {
        let mut parts = Vec::new();
        if self.added > 0 {
            parts.push(format!("{} added", self.added));
        }
        if self.removed > 0 {
            parts.push(format!("{} removed", self.removed));
        }
        if self.changed > 0 {
            parts.push(format!("{} changed", self.changed));
        }
        parts.join(", ")
    }
}

/// Summary statistics for a diff.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub namespaces: ChangeCounts,
    pub classes: ChangeCounts,
    pub functions: ChangeCounts,
    pub variables: ChangeCounts,
    pub parameters: ChangeCounts,
    pub enums: ChangeCounts,

    /// Root, integral and unknown declarations
    pub synthetic: ChangeCounts,

    pub unchanged: u32,
}

impl DiffSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter for a declaration of `kind`.
    pub fn record(&mut self, kind: KindTag, change_type: ChangeType) {
        if change_type == ChangeType::Unchanged {
            self.unchanged += 1;
            return;
        }
        let counts = match kind {
            KindTag::Namespace => &mut self.namespaces,
            KindTag::Class => &mut self.classes,
            KindTag::Function => &mut self.functions,
            KindTag::Variable => &mut self.variables,
            KindTag::Parameter => &mut self.parameters,
            KindTag::Enum => &mut self.enums,
            KindTag::Root | KindTag::Integral | KindTag::Unknown => &mut self.synthetic,
        };
        match change_type {
            ChangeType::Added => counts.added += 1,
            ChangeType::Removed => counts.removed += 1,
            ChangeType::Changed => counts.changed += 1,
            ChangeType::Unchanged => {}
        }
    }

    pub fn total(&self) -> ChangeCounts {
        self.by_kind().iter().fold(ChangeCounts::default(), |acc, (_, c)| ChangeCounts {
            added: acc.added + c.added,
            removed: acc.removed + c.removed,
            changed: acc.changed + c.changed,
        })
    }

    fn by_kind(&self) -> [(&'static str, ChangeCounts); 7] {
        [
            ("namespaces", self.namespaces),
            ("classes", self.classes),
            ("functions", self.functions),
            ("variables", self.variables),
            ("parameters", self.parameters),
            ("enums", self.enums),
            ("other", self.synthetic),
        ]
    }

    /// Generate human-readable summary string.
    pub fn text(&self) -> String {
        let parts: Vec<String> = self
            .by_kind()
            .iter()
            .filter(|(_, counts)| !counts.is_empty())
            .map(|(label, counts)| format!("{}: {}", label, counts.text()))
            .collect();

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join("; ")
        }
    }
}
