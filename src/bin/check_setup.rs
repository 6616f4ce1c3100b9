//! Verifies configuration, local files and connectivity without changing
//! anything remote.

use std::path::PathBuf;

use clap::Parser;
use wb_price_sync::{app, init_logging, load_env_file, Env};

/// Check that everything needed for the update is in place
#[derive(Parser, Debug)]
#[command(name = "check_setup")]
#[command(version, about, long_about = None)]
struct Args {
    /// Read settings from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    let loaded = load_env_file(args.env_file.as_deref());
    init_logging();

    let loaded = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let report = app::check_setup(&Env::from_process(), loaded.as_deref());
    println!("Setup check:\n{report}");
    if report.all_ok() {
        log::info!("All checks passed");
    } else {
        log::error!("Some checks failed");
        std::process::exit(1);
    }
}
