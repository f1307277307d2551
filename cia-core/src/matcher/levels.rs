//! Equivalence levels, ordered from loosest to strictest.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Strength of a structural match between two declarations.
///
/// Each level implies every looser one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLevel {
    /// Same kind.
    PrototypeSimilar,
    /// Same kind, name and signature.
    PrototypeIdentical,
    /// Same unique name, and the parents are similar.
    Similar,
    /// Same payload and the same outgoing dependencies.
    Identical,
}

impl MatchLevel {
    pub const ALL: [MatchLevel; 4] = [
        MatchLevel::PrototypeSimilar,
        MatchLevel::PrototypeIdentical,
        MatchLevel::Similar,
        MatchLevel::Identical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchLevel::PrototypeSimilar => "prototype_similar",
            MatchLevel::PrototypeIdentical => "prototype_identical",
            MatchLevel::Similar => "similar",
            MatchLevel::Identical => "identical",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// The next looser level, if any.
    pub fn looser(self) -> Option<MatchLevel> {
        match self {
            MatchLevel::PrototypeSimilar => None,
            MatchLevel::PrototypeIdentical => Some(MatchLevel::PrototypeSimilar),
            MatchLevel::Similar => Some(MatchLevel::PrototypeIdentical),
            MatchLevel::Identical => Some(MatchLevel::Similar),
        }
    }
}

impl fmt::Display for MatchLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(MatchLevel::PrototypeSimilar < MatchLevel::PrototypeIdentical);
        assert!(MatchLevel::PrototypeIdentical < MatchLevel::Similar);
        assert!(MatchLevel::Similar < MatchLevel::Identical);
    }

    #[test]
    fn test_looser_chain() {
        let mut level = MatchLevel::Identical;
        let mut chain = vec![level];
        while let Some(next) = level.looser() {
            chain.push(next);
            level = next;
        }
        chain.reverse();
        assert_eq!(chain, MatchLevel::ALL.to_vec());
    }
}
