//! Residue sequences.
//!
//! A sequence is immutable after construction. When a sequence is stored in a
//! fixed-capacity buffer, a padding sentinel marks its logical end; trailing
//! capacity beyond the sentinel is never scored by the alignment kernel.

/// Sentinel marking the logical end of a sequence inside a fixed-capacity
/// buffer. Residues are ASCII symbols, so the NUL byte is never a residue.
pub const PADDING: u8 = 0;

/// An immutable, ordered buffer of residue symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    residues: Vec<u8>,
    length: usize,
}

impl Sequence {
    /// Builds a sequence from raw residues. Any embedded padding byte marks
    /// the logical end of the sequence.
    pub fn new(residues: impl Into<Vec<u8>>) -> Self {
        let residues = residues.into();
        let length = residues
            .iter()
            .position(|&r| r == PADDING)
            .unwrap_or(residues.len());
        Sequence { residues, length }
    }

    /// Builds a sequence stored in a fixed-capacity buffer, filling the
    /// trailing capacity with the padding sentinel.
    pub fn with_capacity(residues: &[u8], capacity: usize) -> Self {
        let mut buffer = vec![PADDING; capacity.max(residues.len())];
        buffer[..residues.len()].copy_from_slice(residues);
        Sequence::new(buffer)
    }

    /// The full underlying buffer, including any trailing padding.
    pub fn residues(&self) -> &[u8] {
        &self.residues
    }

    /// The logical sequence length, excluding padding.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl<'a> From<&'a [u8]> for Sequence {
    fn from(residues: &'a [u8]) -> Self {
        Sequence::new(residues.to_vec())
    }
}

impl From<&str> for Sequence {
    fn from(residues: &str) -> Self {
        Sequence::new(residues.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_length_stops_at_padding() {
        let seq = Sequence::with_capacity(b"ACGT", 10);
        assert_eq!(seq.len(), 4);
        assert_eq!(seq.residues().len(), 10);
        assert_eq!(&seq.residues()[..4], b"ACGT");
        assert!(seq.residues()[4..].iter().all(|&r| r == PADDING));
    }

    #[test]
    fn unpadded_sequence_keeps_full_length() {
        let seq = Sequence::from("GATTACA");
        assert_eq!(seq.len(), 7);
        assert_eq!(seq.residues(), b"GATTACA");
    }
}
