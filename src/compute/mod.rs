//! Compute backend seam for the DP kernel.
//!
//! The pairwise stage routes its batch of independent alignment jobs through
//! a backend selected here. The CPU path is the active implementation; the
//! accelerator variant is a documented integration point that currently
//! falls back to the CPU batch path. Whatever the backend, the kernel keeps
//! the same data-parallel shape: one DP job per sequence pair, no data
//! dependencies between jobs, and full completion before results are read
//! back.
//!
//! The DP working row is obtained through the [`RowAllocator`] seam so the
//! memory strategy (plain host memory today, pinned or device-visible
//! buffers for a future accelerator) is swappable without touching the
//! kernel. Acquisition is scoped: the [`RowGuard`] returns the buffer on
//! every exit path.

use std::sync::Mutex;

use rayon::prelude::*;

use crate::database::SequenceDb;
use crate::pairwise::needleman;
use crate::pairwise::Workpair;
use crate::scoring::{Score, ScoringTable};

/// Compute backend for the pairwise DP batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeBackend {
    /// Data-parallel scoring on the host CPU. Always available.
    Cpu,
    /// Multi-accelerator offload. Currently a no-op integration point that
    /// falls back to the CPU path.
    Accelerator,
}

impl ComputeBackend {
    /// Resolves the requested backend to an actually-usable one.
    pub fn effective(&self) -> ComputeBackend {
        match self {
            ComputeBackend::Cpu => ComputeBackend::Cpu,
            ComputeBackend::Accelerator => {
                log::debug!("accelerator backend requested but not available, using CPU batch");
                ComputeBackend::Cpu
            }
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ComputeBackend::Cpu => "CPU batch",
            ComputeBackend::Accelerator => "accelerator (falls back to CPU batch)",
        }
    }
}

/// Picks the backend for the current run configuration.
pub fn detect_backend(multigpu: bool) -> ComputeBackend {
    if multigpu {
        ComputeBackend::Accelerator
    } else {
        ComputeBackend::Cpu
    }
}

/// Swappable memory strategy for the DP working row.
pub trait RowAllocator: Send + Sync {
    /// Hands out a zeroed row of at least `len` cells.
    fn obtain(&self, len: usize) -> Vec<Score>;

    /// Takes a row back once its scope ends.
    fn restore(&self, row: Vec<Score>);
}

/// Scoped row acquisition: hands the row back to its allocator when dropped,
/// including on error and panic paths.
pub struct RowGuard<'a> {
    row: Option<Vec<Score>>,
    owner: &'a dyn RowAllocator,
}

impl RowGuard<'_> {
    pub fn as_mut_slice(&mut self) -> &mut [Score] {
        self.row.as_mut().map(Vec::as_mut_slice).unwrap_or(&mut [])
    }
}

impl Drop for RowGuard<'_> {
    fn drop(&mut self) {
        if let Some(row) = self.row.take() {
            self.owner.restore(row);
        }
    }
}

/// Acquires a scoped DP row from an allocator.
pub fn acquire(owner: &dyn RowAllocator, len: usize) -> RowGuard<'_> {
    RowGuard {
        row: Some(owner.obtain(len)),
        owner,
    }
}

/// Plain host memory, no reuse.
#[derive(Debug, Default)]
pub struct HostAllocator;

impl RowAllocator for HostAllocator {
    fn obtain(&self, len: usize) -> Vec<Score> {
        vec![0; len]
    }

    fn restore(&self, _row: Vec<Score>) {}
}

/// Host memory with row reuse across jobs of a batch.
#[derive(Debug, Default)]
pub struct PooledAllocator {
    rows: Mutex<Vec<Vec<Score>>>,
}

impl RowAllocator for PooledAllocator {
    fn obtain(&self, len: usize) -> Vec<Score> {
        let mut row = self
            .rows
            .lock()
            .ok()
            .and_then(|mut pool| pool.pop())
            .unwrap_or_default();
        row.clear();
        row.resize(len, 0);
        row
    }

    fn restore(&self, row: Vec<Score>) {
        if let Ok(mut pool) = self.rows.lock() {
            pool.push(row);
        }
    }
}

/// Scores a batch of workpairs. Jobs are independent, so the CPU path runs
/// them data-parallel; the result order matches the input pair order.
pub fn batch_score(
    db: &SequenceDb,
    pairs: &[Workpair],
    table: &ScoringTable,
    backend: ComputeBackend,
) -> Vec<Score> {
    match backend.effective() {
        ComputeBackend::Cpu | ComputeBackend::Accelerator => {
            let allocator = PooledAllocator::default();
            pairs
                .par_iter()
                .map(|pair| {
                    let one = db.sequence(pair.x as usize).residues();
                    let two = db.sequence(pair.y as usize).residues();
                    needleman::score_pair(one, two, table, &allocator)
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Sequence;

    #[test]
    fn accelerator_falls_back_to_cpu() {
        assert_eq!(
            ComputeBackend::Accelerator.effective(),
            ComputeBackend::Cpu
        );
        assert_eq!(detect_backend(true), ComputeBackend::Accelerator);
        assert_eq!(detect_backend(false), ComputeBackend::Cpu);
    }

    #[test]
    fn pooled_rows_are_reset_between_uses() {
        let allocator = PooledAllocator::default();
        {
            let mut guard = acquire(&allocator, 4);
            guard.as_mut_slice().copy_from_slice(&[9, 9, 9, 9]);
        }
        let mut guard = acquire(&allocator, 6);
        assert_eq!(guard.as_mut_slice(), &[0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn batch_order_matches_pair_order() {
        let mut db = SequenceDb::new();
        db.push("a", Sequence::from("ACGT"));
        db.push("b", Sequence::from("ACGT"));
        db.push("c", Sequence::from("TTTT"));

        let table = ScoringTable::new(1, -1, 1);
        let pairs = vec![Workpair { x: 0, y: 1 }, Workpair { x: 0, y: 2 }];
        let scores = batch_score(&db, &pairs, &table, ComputeBackend::Cpu);

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0], 4, "identical sequences score all matches");
        assert!(scores[1] < scores[0]);
    }
}
