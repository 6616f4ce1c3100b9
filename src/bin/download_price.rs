//! Downloads the newest mailed price list and splits it into one file per
//! brand.

use std::path::PathBuf;

use clap::Parser;
use wb_price_sync::{app, init_logging, load_env_file, Env};

/// Fetch the supplier price list from the mailbox
#[derive(Parser, Debug)]
#[command(name = "download_price")]
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

    if let Err(e) = loaded {
        log::error!("{e}");
        std::process::exit(1);
    }

    log::info!("Starting price download");
    match app::download_price(&Env::from_process()) {
        Ok(summary) => {
            log::info!("Price download done: {summary}");
            for file in &summary.split.files {
                log::info!("  {} -> {} ({} rows)", file.brand, file.path.display(), file.rows);
            }
        }
        Err(e) => {
            log::error!("Price download failed: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
