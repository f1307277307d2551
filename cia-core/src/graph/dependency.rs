//! Typed, counted dependency edges.

use std::fmt;
use std::ops::{AddAssign, Index, IndexMut};

use serde::{Deserialize, Serialize};

/// Number of [`DependencyKind`] variants.
pub const DEPENDENCY_KINDS: usize = 5;

/// Kind of relationship recorded by a dependency edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Member,
    Use,
    Invocation,
    Inheritance,
    Override,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; DEPENDENCY_KINDS] = [
        DependencyKind::Member,
        DependencyKind::Use,
        DependencyKind::Invocation,
        DependencyKind::Inheritance,
        DependencyKind::Override,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Member => "member",
            DependencyKind::Use => "use",
            DependencyKind::Invocation => "invocation",
            DependencyKind::Inheritance => "inheritance",
            DependencyKind::Override => "override",
        }
    }

    /// Position of this kind inside a [`DependencyCounts`] vector.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Constant weight of one dependency of this kind, used for direct
    /// weights and as the default per-kind impact weight.
    pub fn forward_weight(self) -> f64 {
        match self {
            DependencyKind::Member => 0.2,
            DependencyKind::Use => 0.4,
            DependencyKind::Invocation => 0.4,
            DependencyKind::Inheritance => 0.6,
            DependencyKind::Override => 0.6,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "member" => Some(DependencyKind::Member),
            "use" => Some(DependencyKind::Use),
            "invocation" | "call" => Some(DependencyKind::Invocation),
            "inheritance" | "inherits" => Some(DependencyKind::Inheritance),
            "override" => Some(DependencyKind::Override),
            _ => None,
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind counts of one (source, target) edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyCounts([u32; DEPENDENCY_KINDS]);

impl DependencyCounts {
    pub const ZERO: DependencyCounts = DependencyCounts([0; DEPENDENCY_KINDS]);

    pub fn new(counts: [u32; DEPENDENCY_KINDS]) -> Self {
        Self(counts)
    }

    /// A vector holding a single dependency of `kind`.
    pub fn of(kind: DependencyKind) -> Self {
        let mut counts = Self::ZERO;
        counts[kind] = 1;
        counts
    }

    /// Build a vector from `(kind, count)` pairs, summing repeated kinds.
    /// Counts saturate at `u32::MAX`.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (DependencyKind, u32)>,
    {
        let mut counts = Self::ZERO;
        for (kind, count) in pairs {
            counts[kind] = counts[kind].saturating_add(count);
        }
        counts
    }

    pub fn get(&self, kind: DependencyKind) -> u32 {
        self.0[kind.index()]
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&c| c == 0)
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|&c| c as u64).sum()
    }

    pub fn as_array(&self) -> &[u32; DEPENDENCY_KINDS] {
        &self.0
    }

    /// Non-zero entries in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (DependencyKind, u32)> + '_ {
        DependencyKind::ALL
            .iter()
            .map(move |&kind| (kind, self.get(kind)))
            .filter(|&(_, count)| count != 0)
    }

    /// Σ forward_weight(kind) × count.
    pub fn forward_weight(&self) -> f64 {
        self.iter()
            .map(|(kind, count)| kind.forward_weight() * count as f64)
            .sum()
    }
}

impl Index<DependencyKind> for DependencyCounts {
    type Output = u32;

    fn index(&self, kind: DependencyKind) -> &u32 {
        &self.0[kind.index()]
    }
}

impl IndexMut<DependencyKind> for DependencyCounts {
    fn index_mut(&mut self, kind: DependencyKind) -> &mut u32 {
        &mut self.0[kind.index()]
    }
}

/// Per-kind sum, saturating at `u32::MAX`.
impl AddAssign for DependencyCounts {
    fn add_assign(&mut self, other: Self) {
        for (mine, theirs) in self.0.iter_mut().zip(other.0) {
            *mine = mine.saturating_add(theirs);
        }
    }
}

impl fmt::Display for DependencyCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(kind, count)| format!("{}: {}", kind, count))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Impact weight per dependency kind.
///
/// Defaults to each kind's [`DependencyKind::forward_weight`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyWeights {
    pub member: f64,
    #[serde(rename = "use")]
    pub use_: f64,
    pub invocation: f64,
    pub inheritance: f64,
    #[serde(rename = "override")]
    pub override_: f64,
}

impl DependencyWeights {
    pub fn get(&self, kind: DependencyKind) -> f64 {
        match kind {
            DependencyKind::Member => self.member,
            DependencyKind::Use => self.use_,
            DependencyKind::Invocation => self.invocation,
            DependencyKind::Inheritance => self.inheritance,
            DependencyKind::Override => self.override_,
        }
    }

    pub fn set(&mut self, kind: DependencyKind, weight: f64) {
        match kind {
            DependencyKind::Member => self.member = weight,
            DependencyKind::Use => self.use_ = weight,
            DependencyKind::Invocation => self.invocation = weight,
            DependencyKind::Inheritance => self.inheritance = weight,
            DependencyKind::Override => self.override_ = weight,
        }
    }

    /// Probability that at least one of the edge's dependencies carries a
    /// change across: `1 - Π (1 - w_k)^count_k`.
    pub fn hop_factor(&self, counts: &DependencyCounts) -> f64 {
        let pass: f64 = counts
            .iter()
            .map(|(kind, count)| (1.0 - self.get(kind)).powi(count.min(i32::MAX as u32) as i32))
            .product();
        1.0 - pass
    }
}

impl Default for DependencyWeights {
    fn default() -> Self {
        Self {
            member: DependencyKind::Member.forward_weight(),
            use_: DependencyKind::Use.forward_weight(),
            invocation: DependencyKind::Invocation.forward_weight(),
            inheritance: DependencyKind::Inheritance.forward_weight(),
            override_: DependencyKind::Override.forward_weight(),
        }
    }
}
