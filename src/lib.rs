//! Distributed pairwise sequence distances and neighbor-joining guide trees.
//!
//! The computation is organized as a validated pipeline of stages running
//! identically on every cluster rank: load the sequences, score every pair
//! with Needleman-Wunsch, then join neighbors into a rooted guide tree.

pub mod bootstrap;
pub mod cluster; // Collective substrate: threaded cluster + single-rank fallback
pub mod compute; // Compute backend seam and DP row allocators
pub mod context;
pub mod database;
pub mod driver;
pub mod io; // FASTA ingestion and the extension-keyed parser registry
pub mod matrix;
pub mod pairwise;
pub mod phylogeny;
pub mod pipeline;
pub mod scoring;
pub mod sequence;
