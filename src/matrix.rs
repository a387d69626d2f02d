//! Packed triangular distance matrix.
//!
//! Pairwise distances are symmetric, so only one physical entry exists per
//! unordered index pair. Entries are addressed by a packed linear offset that
//! is a bijection between unordered pairs over `[0, n)` and
//! `[0, n*(n-1)/2)`. Workpair generation enumerates pairs in exactly this
//! order, so a gathered score buffer maps one-to-one onto the matrix storage.

/// Maps an unordered pair of distinct indices to its packed linear offset.
///
/// `packed_index(x, y) == packed_index(y, x)`; the offset is undefined for
/// `x == y` (there is no diagonal).
pub fn packed_index(x: usize, y: usize) -> usize {
    debug_assert!(x != y, "packed index undefined for equal indices");
    let (hi, lo) = if x > y { (x, y) } else { (y, x) };
    hi * (hi - 1) / 2 + lo
}

/// The number of packed entries for `count` elements.
pub fn packed_len(count: usize) -> usize {
    count * count.saturating_sub(1) / 2
}

/// Symmetric pairwise distance matrix over sequence indices.
#[derive(Debug, Clone, Default)]
pub struct DistanceMatrix {
    count: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// A zeroed matrix over `count` elements. `count <= 1` yields a trivial,
    /// entryless matrix.
    pub fn new(count: usize) -> Self {
        DistanceMatrix {
            count,
            data: vec![0.0; packed_len(count)],
        }
    }

    /// Wraps a packed buffer of distances, ordered by `packed_index`.
    pub fn from_packed(count: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), packed_len(count), "packed buffer length");
        DistanceMatrix { count, data }
    }

    /// The number of elements the matrix is defined over.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[packed_index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        self.data[packed_index(x, y)] = value;
    }

    /// The raw packed storage, in `packed_index` order.
    pub fn as_packed(&self) -> &[f64] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn packed_index_is_symmetric() {
        for x in 0..12usize {
            for y in 0..12usize {
                if x != y {
                    assert_eq!(packed_index(x, y), packed_index(y, x));
                }
            }
        }
    }

    #[test]
    fn packed_index_is_a_bijection() {
        let n = 10usize;
        let mut seen = HashSet::new();
        for x in 0..n {
            for y in 0..x {
                let offset = packed_index(x, y);
                assert!(offset < packed_len(n), "offset {offset} out of range");
                assert!(seen.insert(offset), "offset {offset} repeated");
            }
        }
        assert_eq!(seen.len(), packed_len(n));
    }

    #[test]
    fn matrix_is_symmetric_by_construction() {
        let mut matrix = DistanceMatrix::new(4);
        matrix.set(1, 3, 2.5);
        assert_eq!(matrix.get(3, 1), 2.5);
        assert_eq!(matrix.get(1, 3), 2.5);
    }

    #[test]
    fn trivial_matrices_have_no_entries() {
        assert_eq!(DistanceMatrix::new(0).as_packed().len(), 0);
        assert_eq!(DistanceMatrix::new(1).as_packed().len(), 0);
    }
}
