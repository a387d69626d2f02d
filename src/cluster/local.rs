//! Single-rank substrate.
//!
//! Used by tests and embedded callers: there is exactly one participant, so
//! every collective degenerates to the identity and the rank acts as both
//! coordinator and worker.

use anyhow::Result;

use super::{Communicator, ReduceOp};
use crate::pairwise::Workpair;
use crate::phylogeny::njoining::JoinCandidate;

#[derive(Debug, Default)]
pub struct LocalComm;

impl LocalComm {
    pub fn new() -> Self {
        LocalComm
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }

    fn broadcast_len(&self, value: usize, _root: usize) -> Result<usize> {
        Ok(value)
    }

    fn scatter_pairs(
        &self,
        pairs: &[Workpair],
        counts: &[usize],
        _root: usize,
    ) -> Result<Vec<Workpair>> {
        debug_assert_eq!(counts.iter().sum::<usize>(), pairs.len());
        Ok(pairs.to_vec())
    }

    fn allgather_scores(&self, local: &[f64], _counts: &[usize]) -> Result<Vec<f64>> {
        Ok(local.to_vec())
    }

    fn allreduce_candidate(&self, local: JoinCandidate, _op: ReduceOp) -> Result<JoinCandidate> {
        Ok(local)
    }
}
