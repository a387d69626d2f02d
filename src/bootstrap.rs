//! Bootstrap stage: feeds the shared sequence database into the pipeline.

use std::any::TypeId;
use std::sync::Arc;

use anyhow::Result;

use crate::context::Context;
use crate::database::SequenceDb;
use crate::pipeline::{Empty, Module, Pipe};

/// Conduit produced by the bootstrap stage.
pub struct LoadConduit {
    pub db: Arc<SequenceDb>,
}

/// First pipeline module: wraps the already-loaded database into a conduit
/// and reports what the run is working on.
#[derive(Debug, Default)]
pub struct LoadModule;

impl Module for LoadModule {
    fn name(&self) -> &'static str {
        "loading"
    }

    fn expects(&self) -> TypeId {
        TypeId::of::<Empty>()
    }

    fn produces(&self) -> TypeId {
        TypeId::of::<LoadConduit>()
    }

    fn run(&self, ctx: &Context, pipe: Pipe) -> Result<Pipe> {
        pipe.open::<Empty>()?;

        if ctx.is_coordinator() && !ctx.db.is_empty() {
            log::info!("[loading] loaded a total of {} sequences", ctx.db.len());
        }

        Ok(Pipe::new(LoadConduit { db: ctx.db.clone() }))
    }
}
