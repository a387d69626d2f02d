//! Cluster collective substrate.
//!
//! The pipeline communicates exclusively through synchronous collective
//! operations behind the [`Communicator`] trait. Every collective call is a
//! rendezvous point: all participating ranks must reach the matching call in
//! the same relative order. Any substrate failure is fatal to the whole run;
//! a desynchronized collective cannot be safely resumed, so nothing is
//! retried.
//!
//! Two substrates are provided: [`ThreadedCluster`] wires in-process ranks
//! together over crossbeam channels, and [`LocalComm`] is the degenerate
//! single-rank substrate where every collective is the identity.

pub mod local;
pub mod threaded;

pub use local::LocalComm;
pub use threaded::{ThreadComm, ThreadedCluster};

use anyhow::Result;

use crate::pairwise::Workpair;
use crate::phylogeny::njoining::JoinCandidate;

/// The rank acting as the cluster coordinator.
pub const COORDINATOR: usize = 0;

/// Associative, commutative binary operator for candidate reduction.
pub type ReduceOp = fn(JoinCandidate, JoinCandidate) -> JoinCandidate;

/// The collective operations the pipeline relies on.
///
/// Payload-specific methods keep the trait object-safe; the substrate only
/// ever ships workpairs, score buffers, join candidates and lengths.
pub trait Communicator: Send + Sync {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// The role predicate: is this rank the cluster coordinator?
    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR
    }

    /// Number of ranks performing computation. On a multi-rank cluster the
    /// coordinator only aggregates; on a single-rank substrate the sole rank
    /// plays both roles.
    fn worker_count(&self) -> usize {
        if self.size() == 1 {
            1
        } else {
            self.size() - 1
        }
    }

    /// This rank's zero-based index among the computing ranks, or `None` for
    /// a coordinator that does not compute.
    fn worker_index(&self) -> Option<usize> {
        if self.size() == 1 {
            Some(0)
        } else if self.rank() == COORDINATOR {
            None
        } else {
            Some(self.rank() - 1)
        }
    }

    /// Rendezvous: returns once every rank has entered the barrier.
    fn barrier(&self) -> Result<()>;

    /// Broadcasts a length from `root`; every rank returns the root's value.
    fn broadcast_len(&self, value: usize, root: usize) -> Result<usize>;

    /// Scatters contiguous workpair slices from `root`. `counts` gives the
    /// per-rank slice lengths and must be identical on every rank; only the
    /// root's `pairs` buffer is consulted. Returns this rank's slice.
    fn scatter_pairs(
        &self,
        pairs: &[Workpair],
        counts: &[usize],
        root: usize,
    ) -> Result<Vec<Workpair>>;

    /// Gathers every rank's local scores into one linear buffer, ordered by
    /// rank, and leaves the complete buffer on every rank.
    fn allgather_scores(&self, local: &[f64], counts: &[usize]) -> Result<Vec<f64>>;

    /// Reduces every rank's candidate with `op` and returns the identical
    /// result on every rank. The fold is performed in rank order, so with an
    /// associative, commutative operator the outcome is deterministic.
    fn allreduce_candidate(&self, local: JoinCandidate, op: ReduceOp) -> Result<JoinCandidate>;
}

/// Contiguous partition of `total` items across `parts` owners: the first
/// `total % parts` owners receive one extra item.
pub fn partition(total: usize, parts: usize, index: usize) -> (usize, usize) {
    debug_assert!(index < parts);
    let quotient = total / parts;
    let remainder = total % parts;
    let count = quotient + usize::from(index < remainder);
    let offset = quotient * index + index.min(remainder);
    (offset, count)
}
