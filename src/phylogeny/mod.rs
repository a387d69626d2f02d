//! Phylogeny stage: builds the guide tree from the pairwise distances.

pub mod njoining;
pub mod tree;

use std::any::TypeId;
use std::sync::Arc;

use anyhow::Result;

use crate::context::Context;
use crate::database::SequenceDb;
use crate::pairwise::DistanceConduit;
use crate::pipeline::{Module, Pipe};

pub use tree::{GuideTree, NodeHandle, TreeNode};

/// Conduit produced by the phylogeny stage: the rooted guide tree.
pub struct TreeConduit {
    pub db: Arc<SequenceDb>,
    pub tree: GuideTree,
}

/// The neighbor-joining pipeline module.
#[derive(Debug, Default)]
pub struct PhylogenyModule;

impl Module for PhylogenyModule {
    fn name(&self) -> &'static str {
        "phylogeny"
    }

    fn expects(&self) -> TypeId {
        TypeId::of::<DistanceConduit>()
    }

    fn produces(&self) -> TypeId {
        TypeId::of::<TreeConduit>()
    }

    fn run(&self, ctx: &Context, pipe: Pipe) -> Result<Pipe> {
        let DistanceConduit { db, matrix, total } = pipe.open()?;

        if ctx.is_coordinator() {
            log::info!("[phylogeny] joining {total} sequences");
        }

        let tree = njoining::run(ctx, &matrix, total)?;
        Ok(Pipe::new(TreeConduit { db, tree }))
    }
}
