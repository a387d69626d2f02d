//! Run orchestration.
//!
//! Loads the input files once, stands up the in-process cluster and runs the
//! same validated pipeline on every rank. The coordinator rank runs on the
//! calling thread and is the one whose final conduit becomes the result.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Result};

use crate::bootstrap::LoadModule;
use crate::cluster::ThreadedCluster;
use crate::context::{Context, Settings};
use crate::database::SequenceDb;
use crate::io::ParserRegistry;
use crate::pairwise::PairwiseModule;
use crate::phylogeny::{PhylogenyModule, TreeConduit};
use crate::pipeline::{Pipe, Pipeline, PipelineBuilder, Timed, Wrap};

/// Parses every input file into one shared database, in command-line order.
pub fn load_database(files: &[PathBuf]) -> Result<SequenceDb> {
    let registry = ParserRegistry::default();
    let mut db = SequenceDb::new();

    for path in files {
        let loaded = registry.load(path, &mut db)?;
        log::debug!("[loading] {}: {loaded} sequences", path.display());
    }
    Ok(db)
}

fn build_pipeline() -> Result<Pipeline> {
    PipelineBuilder::new()
        .append(Wrap::around(Box::new(LoadModule), Box::new(Timed)))
        .append(Wrap::around(Box::new(PairwiseModule), Box::new(Timed)))
        .append(Wrap::around(Box::new(PhylogenyModule), Box::new(Timed)))
        .build()
}

fn render(pipe: Pipe, db: &SequenceDb) -> Result<String> {
    let TreeConduit { tree, .. } = pipe.open()?;
    Ok(tree.to_newick(db))
}

/// Runs the full computation over the configured cluster and returns the
/// guide tree in Newick notation.
pub fn run(files: &[PathBuf], settings: Settings) -> Result<String> {
    let db = Arc::new(load_database(files)?);

    // Zero workers collapses to the single-rank substrate, where the sole
    // rank plays both the coordinator and worker roles.
    if settings.workers == 0 {
        let ctx = Context::single(db.clone(), settings);
        let pipe = build_pipeline()?.run(&ctx)?;
        return render(pipe, &db);
    }

    let mut ranks = ThreadedCluster::create(settings.workers + 1).into_iter();
    let coordinator = ranks
        .next()
        .ok_or_else(|| anyhow!("cluster creation yielded no ranks"))?;

    let mut handles = Vec::new();
    for comm in ranks {
        let ctx = Context::new(Arc::new(comm), db.clone(), settings.clone());
        handles.push(thread::spawn(move || build_pipeline()?.run(&ctx).map(|_| ())));
    }

    let ctx = Context::new(Arc::new(coordinator), db.clone(), settings);
    let outcome = build_pipeline()?.run(&ctx);

    // Collect every worker before deciding the overall outcome: a severed
    // collective on the coordinator usually has its root cause on a worker.
    let mut worker_failure = None;
    for handle in handles {
        let joined = handle
            .join()
            .unwrap_or_else(|_| Err(anyhow!("a worker rank panicked")));
        if let Err(error) = joined {
            worker_failure.get_or_insert(error);
        }
    }

    match (outcome, worker_failure) {
        (Ok(pipe), None) => render(pipe, &db),
        (_, Some(cause)) => Err(cause.context("a worker rank failed")),
        (Err(error), None) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn fixture(name: &str, contents: &str) -> PathBuf {
        let dir = Path::new("target/driver_fixtures");
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn merges_files_in_command_line_order() {
        let first = fixture("first.fasta", ">a\nACGT\n");
        let second = fixture("second.fasta", ">b\nTGCA\n>c\nAAAA\n");

        let db = load_database(&[first, second]).unwrap();
        assert_eq!(db.len(), 3);
        assert_eq!(db.description(0), "a");
        assert_eq!(db.description(2), "c");
    }

    #[test]
    fn unknown_format_aborts_the_load() {
        let bogus = fixture("notes.txt", "not sequence data");
        assert!(load_database(&[bogus]).is_err());
    }

    #[test]
    fn single_rank_run_produces_a_rooted_newick() {
        let input = fixture("trio.fasta", ">a\nGATTACA\n>b\nGCATGCU\n>c\nGATTACA\n");
        let settings = Settings {
            workers: 0,
            ..Settings::default()
        };

        let newick = run(&[input], settings).unwrap();
        assert!(newick.ends_with(';'));
        for label in ["a", "b", "c"] {
            assert!(newick.contains(label), "missing leaf {label} in {newick}");
        }
    }

    #[test]
    fn one_worker_matches_the_single_rank_result() {
        // A sole worker scans exactly the pairs the single-rank substrate
        // does, in the same order, so even tied candidates resolve alike.
        let input = fixture(
            "quartet.fasta",
            ">a\nGATTACA\n>b\nGCATGCU\n>c\nGATTACAGATTACA\n>d\nTTTTTTT\n",
        );

        let alone = run(
            &[input.clone()],
            Settings {
                workers: 0,
                ..Settings::default()
            },
        )
        .unwrap();

        let clustered = run(
            &[input],
            Settings {
                workers: 1,
                ..Settings::default()
            },
        )
        .unwrap();
        assert_eq!(alone, clustered);
    }

    #[test]
    fn wider_clusters_still_produce_well_formed_trees() {
        let input = fixture(
            "quintet.fasta",
            ">a\nGATTACA\n>b\nGCATGCU\n>c\nGATTACAGATTACA\n>d\nTTTTTTT\n>e\nACGTACGT\n",
        );

        for workers in [2, 3, 4] {
            let newick = run(
                &[input.clone()],
                Settings {
                    workers,
                    ..Settings::default()
                },
            )
            .unwrap();

            assert!(newick.ends_with(';'), "unterminated tree: {newick}");
            for label in ["a", "b", "c", "d", "e"] {
                assert!(newick.contains(label), "missing leaf {label} in {newick}");
            }
        }
    }
}
