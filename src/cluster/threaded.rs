//! In-process cluster over crossbeam channels.
//!
//! Ranks are connected by a full mesh of unbounded channels, one link per
//! ordered rank pair, so a receive is always addressed to a specific peer and
//! messages between any two ranks stay in FIFO order. Collectives are built
//! from point-to-point exchanges routed through the coordinator rank;
//! reductions fold in rank order before rebroadcasting, so every rank
//! observes the identical result.
//!
//! A severed link (a rank dropped its communicator, usually because it
//! failed) surfaces as an error from the current collective on every peer,
//! which tears the whole run down rather than desynchronizing it.

use anyhow::{anyhow, bail, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{Communicator, ReduceOp, COORDINATOR};
use crate::pairwise::Workpair;
use crate::phylogeny::njoining::JoinCandidate;

/// One message on a cluster link.
#[derive(Debug, Clone)]
enum Payload {
    Len(usize),
    Pairs(Vec<Workpair>),
    Scores(Vec<f64>),
    Candidate(JoinCandidate),
    Token,
}

impl Payload {
    fn kind(&self) -> &'static str {
        match self {
            Payload::Len(_) => "length",
            Payload::Pairs(_) => "workpairs",
            Payload::Scores(_) => "scores",
            Payload::Candidate(_) => "candidate",
            Payload::Token => "token",
        }
    }
}

/// Factory for the mesh of per-rank communicators.
pub struct ThreadedCluster;

impl ThreadedCluster {
    /// Creates `size` communicators wired into a full mesh. Each is meant to
    /// be moved onto its own thread.
    pub fn create(size: usize) -> Vec<ThreadComm> {
        assert!(size >= 1, "a cluster needs at least one rank");

        // links[from][to]; the diagonal is never used.
        let mut senders: Vec<Vec<Sender<Payload>>> = Vec::with_capacity(size);
        let mut receivers: Vec<Vec<Receiver<Payload>>> = (0..size).map(|_| Vec::new()).collect();

        for _from in 0..size {
            let mut row = Vec::with_capacity(size);
            for to in 0..size {
                let (tx, rx) = unbounded();
                row.push(tx);
                receivers[to].push(rx);
            }
            senders.push(row);
        }

        let mut comms = Vec::with_capacity(size);
        for (rank, (links, inboxes)) in senders.into_iter().zip(receivers).enumerate() {
            comms.push(ThreadComm {
                rank,
                size,
                links,
                inboxes,
            });
        }
        comms
    }
}

/// One rank's end of the threaded cluster.
pub struct ThreadComm {
    rank: usize,
    size: usize,
    /// Outgoing links, indexed by destination rank.
    links: Vec<Sender<Payload>>,
    /// Incoming links, indexed by source rank.
    inboxes: Vec<Receiver<Payload>>,
}

impl ThreadComm {
    fn send(&self, to: usize, payload: Payload) -> Result<()> {
        self.links[to]
            .send(payload)
            .map_err(|_| anyhow!("collective link from rank {} to {} severed", self.rank, to))
    }

    fn recv(&self, from: usize) -> Result<Payload> {
        self.inboxes[from]
            .recv()
            .map_err(|_| anyhow!("collective link from rank {} to {} severed", from, self.rank))
    }

    fn displacements(counts: &[usize]) -> Vec<usize> {
        let mut displs = Vec::with_capacity(counts.len());
        let mut offset = 0;
        for &count in counts {
            displs.push(offset);
            offset += count;
        }
        displs
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) -> Result<()> {
        if self.rank == COORDINATOR {
            for from in 1..self.size {
                match self.recv(from)? {
                    Payload::Token => {}
                    other => bail!("barrier received unexpected {} payload", other.kind()),
                }
            }
            for to in 1..self.size {
                self.send(to, Payload::Token)?;
            }
        } else {
            self.send(COORDINATOR, Payload::Token)?;
            match self.recv(COORDINATOR)? {
                Payload::Token => {}
                other => bail!("barrier received unexpected {} payload", other.kind()),
            }
        }
        Ok(())
    }

    fn broadcast_len(&self, value: usize, root: usize) -> Result<usize> {
        if self.rank == root {
            for to in 0..self.size {
                if to != root {
                    self.send(to, Payload::Len(value))?;
                }
            }
            Ok(value)
        } else {
            match self.recv(root)? {
                Payload::Len(value) => Ok(value),
                other => bail!("broadcast received unexpected {} payload", other.kind()),
            }
        }
    }

    fn scatter_pairs(
        &self,
        pairs: &[Workpair],
        counts: &[usize],
        root: usize,
    ) -> Result<Vec<Workpair>> {
        debug_assert_eq!(counts.len(), self.size);

        if self.rank == root {
            let displs = Self::displacements(counts);
            for to in 0..self.size {
                if to != root {
                    let slice = pairs[displs[to]..displs[to] + counts[to]].to_vec();
                    self.send(to, Payload::Pairs(slice))?;
                }
            }
            Ok(pairs[displs[root]..displs[root] + counts[root]].to_vec())
        } else {
            match self.recv(root)? {
                Payload::Pairs(slice) => Ok(slice),
                other => bail!("scatter received unexpected {} payload", other.kind()),
            }
        }
    }

    fn allgather_scores(&self, local: &[f64], counts: &[usize]) -> Result<Vec<f64>> {
        debug_assert_eq!(counts.len(), self.size);
        debug_assert_eq!(local.len(), counts[self.rank]);

        if self.rank == COORDINATOR {
            let displs = Self::displacements(counts);
            let total: usize = counts.iter().sum();
            let mut gathered = vec![0.0; total];

            gathered[displs[self.rank]..displs[self.rank] + local.len()].copy_from_slice(local);
            for from in 1..self.size {
                match self.recv(from)? {
                    Payload::Scores(scores) => {
                        if scores.len() != counts[from] {
                            bail!(
                                "gather from rank {} returned {} scores, expected {}",
                                from,
                                scores.len(),
                                counts[from]
                            );
                        }
                        gathered[displs[from]..displs[from] + scores.len()]
                            .copy_from_slice(&scores);
                    }
                    other => bail!("gather received unexpected {} payload", other.kind()),
                }
            }

            for to in 1..self.size {
                self.send(to, Payload::Scores(gathered.clone()))?;
            }
            Ok(gathered)
        } else {
            self.send(COORDINATOR, Payload::Scores(local.to_vec()))?;
            match self.recv(COORDINATOR)? {
                Payload::Scores(gathered) => Ok(gathered),
                other => bail!("gather received unexpected {} payload", other.kind()),
            }
        }
    }

    fn allreduce_candidate(&self, local: JoinCandidate, op: ReduceOp) -> Result<JoinCandidate> {
        if self.rank == COORDINATOR {
            let mut accumulated = local;
            for from in 1..self.size {
                match self.recv(from)? {
                    Payload::Candidate(candidate) => {
                        accumulated = op(accumulated, candidate);
                    }
                    other => bail!("reduce received unexpected {} payload", other.kind()),
                }
            }
            for to in 1..self.size {
                self.send(to, Payload::Candidate(accumulated))?;
            }
            Ok(accumulated)
        } else {
            self.send(COORDINATOR, Payload::Candidate(local))?;
            match self.recv(COORDINATOR)? {
                Payload::Candidate(result) => Ok(result),
                other => bail!("reduce received unexpected {} payload", other.kind()),
            }
        }
    }
}
