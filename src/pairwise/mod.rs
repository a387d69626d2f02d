//! Pairwise alignment stage.
//!
//! The coordinator generates every C(n,2) workpair in packed-index order and
//! scatters contiguous slices to the worker ranks; workers score their slice
//! with the Needleman-Wunsch kernel and the per-pair scores are allgathered
//! back into one linear buffer. Because generation follows the same packed
//! order the distance matrix is addressed by, the gathered buffer *is* the
//! matrix storage, and every rank can rebuild it for the phylogeny stage.

pub mod needleman;

use std::any::TypeId;
use std::sync::Arc;

use anyhow::Result;

use crate::bootstrap::LoadConduit;
use crate::cluster::COORDINATOR;
use crate::compute::{self, detect_backend};
use crate::context::Context;
use crate::database::SequenceDb;
use crate::matrix::{packed_len, DistanceMatrix};
use crate::pipeline::{Module, Pipe};
use crate::scoring::ScoringTable;

/// One alignment job: an unordered pair of distinct sequence indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workpair {
    pub x: u32,
    pub y: u32,
}

/// Generates all workpairs for `count` sequences, in packed-index order:
/// pair `(x, y)` with `x > y` lands at offset `x*(x-1)/2 + y`. Generation is
/// deterministic, so partitioning across workers is reproducible.
pub fn generate_pairs(count: usize) -> Vec<Workpair> {
    let mut pairs = Vec::with_capacity(packed_len(count));
    for x in 1..count {
        for y in 0..x {
            pairs.push(Workpair {
                x: x as u32,
                y: y as u32,
            });
        }
    }
    pairs
}

/// Per-rank scatter counts for `total` jobs: the coordinator takes none (it
/// only aggregates), worker `w` takes `total/W` plus one of the first
/// `total%W` remainder jobs. On a single-rank substrate the sole rank takes
/// everything.
pub fn slice_counts(total: usize, size: usize) -> Vec<usize> {
    if size == 1 {
        return vec![total];
    }

    let workers = size - 1;
    let quotient = total / workers;
    let remainder = total % workers;

    let mut counts = vec![0; size];
    for (w, count) in counts.iter_mut().skip(1).enumerate() {
        *count = quotient + usize::from(w < remainder);
    }
    counts
}

/// Conduit produced by the pairwise stage: the complete distance matrix.
pub struct DistanceConduit {
    pub db: Arc<SequenceDb>,
    pub matrix: DistanceMatrix,
    /// Number of sequences the matrix is defined over.
    pub total: usize,
}

/// The pairwise alignment pipeline module.
#[derive(Debug, Default)]
pub struct PairwiseModule;

impl Module for PairwiseModule {
    fn name(&self) -> &'static str {
        "pairwise"
    }

    fn expects(&self) -> TypeId {
        TypeId::of::<LoadConduit>()
    }

    fn produces(&self) -> TypeId {
        TypeId::of::<DistanceConduit>()
    }

    fn check(&self, ctx: &Context) -> bool {
        match ScoringTable::by_name(&ctx.settings.scoring) {
            Ok(_) => true,
            Err(error) => {
                if ctx.is_coordinator() {
                    log::error!("[pairwise] {error}");
                }
                false
            }
        }
    }

    fn run(&self, ctx: &Context, pipe: Pipe) -> Result<Pipe> {
        let LoadConduit { db } = pipe.open()?;
        let table = ScoringTable::by_name(&ctx.settings.scoring)?;
        let count = db.len();

        // Zero or one sequence: a trivial matrix, no collectives needed.
        if count < 2 {
            return Ok(Pipe::new(DistanceConduit {
                matrix: DistanceMatrix::new(count),
                total: count,
                db,
            }));
        }

        let comm = ctx.comm.as_ref();
        let pairs = if comm.is_coordinator() {
            generate_pairs(count)
        } else {
            Vec::new()
        };

        let total = comm.broadcast_len(pairs.len(), COORDINATOR)?;
        let counts = slice_counts(total, comm.size());
        let local_pairs = comm.scatter_pairs(&pairs, &counts, COORDINATOR)?;

        if comm.is_coordinator() {
            log::info!("[pairwise] aligning {total} pairs across {} workers", comm.worker_count());
        }

        // Only computing ranks run the kernel; a pure coordinator
        // contributes an empty slice to the gather.
        let local_scores: Vec<f64> = if comm.worker_index().is_some() {
            let backend = detect_backend(ctx.settings.multigpu);
            compute::batch_score(&db, &local_pairs, &table, backend)
                .into_iter()
                .map(f64::from)
                .collect()
        } else {
            Vec::new()
        };

        let gathered = comm.allgather_scores(&local_scores, &counts)?;
        let matrix = DistanceMatrix::from_packed(count, gathered);

        Ok(Pipe::new(DistanceConduit {
            db,
            matrix,
            total: count,
        }))
    }
}
