//! Pushes marked-up prices and stock quantities from the brand files.

use std::path::PathBuf;

use clap::Parser;
use wb_price_sync::{app, init_logging, load_env_file, Env};

/// Update Wildberries prices and stocks from the per-brand files
#[derive(Parser, Debug)]
#[command(name = "update_wb_stocks_prices")]
#[command(version, about, long_about = None)]
struct Args {
    /// Read settings from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Log the batches that would be sent without sending them
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn main() {
    let args = Args::parse();
    let loaded = load_env_file(args.env_file.as_deref());
    init_logging();

    if let Err(e) = loaded {
        log::error!("{e}");
        std::process::exit(1);
    }

    log::info!("Starting price and stock update");
    match app::update_wb_stocks_prices(&Env::from_process(), args.dry_run) {
        Ok(summary) => log::info!("Price and stock update done: {summary}"),
        Err(e) => {
            log::error!("Price and stock update failed: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
