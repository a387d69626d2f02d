//! Shared execution context.
//!
//! Every cluster rank runs the same pipeline against its own `Context`. The
//! context carries the broadcast configuration, the shared sequence database
//! and the rank's end of the collective substrate; role-conditioned logic
//! queries the communicator through ordinary branches rather than separate
//! binaries.

use std::sync::Arc;

use crate::cluster::{Communicator, LocalComm};
use crate::database::SequenceDb;

/// Run configuration, identical on every rank.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Name of the scoring table to align with.
    pub scoring: String,
    /// Verbose logging requested on the command line.
    pub verbose: bool,
    /// Ask for the multi-accelerator compute backend.
    pub multigpu: bool,
    /// Number of worker ranks in the in-process cluster.
    pub workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            scoring: "default".into(),
            verbose: false,
            multigpu: false,
            workers: 1,
        }
    }
}

/// Per-rank execution context handed to every pipeline module.
#[derive(Clone)]
pub struct Context {
    pub comm: Arc<dyn Communicator>,
    pub db: Arc<SequenceDb>,
    pub settings: Settings,
}

impl Context {
    pub fn new(comm: Arc<dyn Communicator>, db: Arc<SequenceDb>, settings: Settings) -> Self {
        Context { comm, db, settings }
    }

    /// A context over the single-rank substrate, where the sole rank plays
    /// both the coordinator and worker roles.
    pub fn single(db: Arc<SequenceDb>, settings: Settings) -> Self {
        Context::new(Arc::new(LocalComm::new()), db, settings)
    }

    pub fn is_coordinator(&self) -> bool {
        self.comm.is_coordinator()
    }
}
