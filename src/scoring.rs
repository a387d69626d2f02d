//! Alignment scoring tables.

use anyhow::{bail, Result};

/// An alignment score. The DP kernel works in integers; distances derived
/// from scores are widened to `f64` once gathered into the matrix.
pub type Score = i32;

/// Substitution and gap scoring parameters for global alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringTable {
    pub matched: Score,
    pub mismatched: Score,
    /// Linear gap penalty, applied as `-penalty` per gap position.
    pub penalty: Score,
}

impl ScoringTable {
    pub fn new(matched: Score, mismatched: Score, penalty: Score) -> Self {
        ScoringTable {
            matched,
            mismatched,
            penalty,
        }
    }

    /// The substitution score between two residue symbols.
    pub fn substitution(&self, a: u8, b: u8) -> Score {
        if a == b {
            self.matched
        } else {
            self.mismatched
        }
    }

    /// Looks a scoring table up by its registered name.
    pub fn by_name(name: &str) -> Result<ScoringTable> {
        for (known, table) in PRESETS {
            if *known == name {
                return Ok(*table);
            }
        }
        bail!(
            "unknown scoring matrix '{}' (available: {})",
            name,
            ScoringTable::names().join(", ")
        );
    }

    /// The names of all registered scoring tables.
    pub fn names() -> Vec<&'static str> {
        PRESETS.iter().map(|(name, _)| *name).collect()
    }
}

/// The registered scoring table presets.
static PRESETS: &[(&str, ScoringTable)] = &[
    (
        "default",
        ScoringTable {
            matched: 1,
            mismatched: -1,
            penalty: 1,
        },
    ),
    (
        "dna",
        ScoringTable {
            matched: 5,
            mismatched: -4,
            penalty: 4,
        },
    ),
    (
        "edit",
        ScoringTable {
            matched: 0,
            mismatched: -1,
            penalty: 1,
        },
    ),
];
