//! Sets the stock of every known SKU to zero in every seller warehouse.

use std::path::PathBuf;

use clap::Parser;
use wb_price_sync::{app, init_logging, load_env_file, Env};

/// Zero all Wildberries stocks
#[derive(Parser, Debug)]
#[command(name = "clear_wb_stocks")]
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

    log::info!("Starting stock clearing");
    match app::clear_wb_stocks(&Env::from_process(), args.dry_run) {
        Ok(summary) => log::info!("Stock clearing done: {summary}"),
        Err(e) => {
            log::error!("Stock clearing failed: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
