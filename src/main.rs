//! Command-line entry point.

use std::path::PathBuf;
use std::process::exit;

use clap::error::ErrorKind;
use clap::{ArgAction, Parser};

use guidetree::context::Settings;
use guidetree::driver;

#[derive(Parser, Debug)]
#[command(name = "guidetree")]
#[command(about = "Pairwise sequence alignment and neighbor-joining guide trees", long_about = None)]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(short = 'v', long = "version", action = ArgAction::Version, value_parser = clap::value_parser!(bool))]
    version: Option<bool>,

    /// Enable verbose logging.
    #[arg(short = 'b', long = "verbose")]
    verbose: bool,

    /// Use every available accelerator device.
    #[arg(short = 'm', long = "multigpu")]
    multigpu: bool,

    /// Input sequence files, loaded in the given order.
    #[arg(short = 'f', long = "file", required = true, num_args = 1..)]
    files: Vec<PathBuf>,

    /// Scoring table to align with.
    #[arg(short = 'x', long = "matrix", default_value = "default")]
    matrix: String,

    /// Number of worker ranks.
    #[arg(short = 'w', long = "workers", default_value_t = 1)]
    workers: usize,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            // Unrecognized options are reported but never fail the process.
            if error.kind() == ErrorKind::UnknownArgument {
                let _ = error.print();
                exit(0);
            }
            error.exit();
        }
    };

    init_logging(cli.verbose);

    let settings = Settings {
        scoring: cli.matrix,
        verbose: cli.verbose,
        multigpu: cli.multigpu,
        workers: cli.workers,
    };

    match driver::run(&cli.files, settings) {
        Ok(newick) => println!("{newick}"),
        Err(error) => {
            log::error!("{error:#}");
            exit(1);
        }
    }
}
