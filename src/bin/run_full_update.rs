//! Runs the whole update: clear stocks, download the price list, update
//! prices and stocks.

use std::path::PathBuf;

use clap::Parser;
use wb_price_sync::app::{self, FullUpdateFlags};
use wb_price_sync::{init_logging, load_env_file, Env};

/// Full Wildberries update cycle
#[derive(Parser, Debug)]
#[command(name = "run_full_update")]
#[command(version, about, long_about = None)]
struct Args {
    /// Read settings from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Log the batches that would be sent without sending them
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Run the remaining steps after a failure (overrides CONTINUE_ON_ERROR)
    #[arg(long, default_value_t = false)]
    continue_on_error: bool,

    /// Do not wait STOCK_SETTLE_SECS after clearing
    #[arg(long, default_value_t = false)]
    skip_settle: bool,
}

fn main() {
    let args = Args::parse();
    let loaded = load_env_file(args.env_file.as_deref());
    init_logging();

    if let Err(e) = loaded {
        log::error!("{e}");
        std::process::exit(1);
    }

    let flags = FullUpdateFlags {
        continue_on_error: args.continue_on_error,
        skip_settle: args.skip_settle,
        dry_run: args.dry_run,
    };
    log::info!("Starting full update");
    let report = match app::run_full_update(&Env::from_process(), flags) {
        Ok(report) => report,
        Err(e) => {
            log::error!("Full update not started: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };

    println!("Full update report:\n{report}");
    if report.succeeded() {
        log::info!("Full update finished successfully");
    } else {
        log::error!("Full update finished with {} failed step(s)", report.failures());
        std::process::exit(1);
    }
}
