//! The sequence database.
//!
//! An ordered, index-stable collection of sequences with their descriptions.
//! The database is built once during bootstrap and shared read-only (behind
//! an `Arc`) by every pipeline stage and cluster rank; it is never mutated
//! after the pipeline starts.

use crate::sequence::Sequence;

/// A single database entry: a described sequence.
#[derive(Debug, Clone)]
pub struct Entry {
    pub description: String,
    pub sequence: Sequence,
}

/// The ordered collection of sequences shared by all pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct SequenceDb {
    entries: Vec<Entry>,
}

impl SequenceDb {
    pub fn new() -> Self {
        SequenceDb::default()
    }

    /// Appends a sequence. Only valid before the database is shared with the
    /// pipeline; indices are stable from then on.
    pub fn push(&mut self, description: impl Into<String>, sequence: Sequence) {
        self.entries.push(Entry {
            description: description.into(),
            sequence,
        });
    }

    /// Absorbs all entries of another database, preserving order.
    pub fn merge(&mut self, other: SequenceDb) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> &Entry {
        &self.entries[index]
    }

    pub fn sequence(&self, index: usize) -> &Sequence {
        &self.entries[index].sequence
    }

    pub fn description(&self, index: usize) -> &str {
        &self.entries[index].description
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_stable_and_ordered() {
        let mut db = SequenceDb::new();
        db.push("first", Sequence::from("ACGT"));
        db.push("second", Sequence::from("TTTT"));

        let mut more = SequenceDb::new();
        more.push("third", Sequence::from("GG"));
        db.merge(more);

        assert_eq!(db.len(), 3);
        assert_eq!(db.description(0), "first");
        assert_eq!(db.description(2), "third");
        assert_eq!(db.sequence(1).residues(), b"TTTT");
    }
}
