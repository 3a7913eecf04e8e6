//! Accepts current outputs as the new ground truth.
//!
//! Without an argument every generated `.obj` under the tests directory is
//! copied over its `_ground_truth.obj`. With a path, only that file is.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use fieldforge_config::Config;
use fieldforge_harness::{accept, accept_all};
use tracing::{error, info};

/// CLI arguments for re-baselining.
#[derive(Parser, Debug)]
#[command(name = "set_ground_truth", about = "Overwrite ground truth with current outputs")]
struct Args {
    /// Output to accept, relative to the tests directory. Accepts all
    /// outputs when omitted.
    relative_obj_path: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config_dir = Config::config_dir();
    let config = match Config::load_or_default(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    fieldforge_log::init_logging(None, cfg!(debug_assertions), Some(&config));

    let tests_dir = config.tests_dir(&config_dir);
    let result = match &args.relative_obj_path {
        Some(relative) => accept(&tests_dir, relative).map(|path| vec![path]),
        None => accept_all(&tests_dir),
    };

    match result {
        Ok(written) => {
            info!("Updated {} ground truth file(s)", written.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
