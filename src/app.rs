//! Command entry points shared by the binaries: load the settings each
//! command needs, build the clients and run the steps.

use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::catalog::CatalogMapping;
use crate::config::{
    Config, Env, ImapSettings, PathSettings, PipelineSettings, PricingSettings, WbSettings,
};
use crate::mailbox::AttachmentQuery;
use crate::steps::{
    self, download_attachment, open_mailbox, process_attachment, run_checks, run_pipeline,
    update_prices_and_stocks, CheckReport, ClearSummary, FailurePolicy, FetchSummary, LiveProbe,
    PipelineReport, PipelineStep, SubmitOptions, UpdateOptions, UpdateSummary,
};
use crate::wildberries::WildberriesClient;

/// Flags of `run_full_update` that override the environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullUpdateFlags {
    pub continue_on_error: bool,
    pub skip_settle: bool,
    pub dry_run: bool,
}

fn submit_options(wb: &WbSettings, dry_run: bool) -> SubmitOptions {
    SubmitOptions {
        batch_size: wb.batch_size,
        request_delay: wb.http.request_delay,
        dry_run,
    }
}

fn load_mapping(paths: &PathSettings) -> Result<Option<CatalogMapping>> {
    CatalogMapping::load(paths).context("Failed to load the cross-reference files")
}

pub fn clear_wb_stocks(env: &Env, dry_run: bool) -> Result<ClearSummary> {
    let wb = WbSettings::from_env(env)?;
    let paths = PathSettings::from_env(env)?;
    clear_with(&wb, &paths, dry_run)
}

fn clear_with(wb: &WbSettings, paths: &PathSettings, dry_run: bool) -> Result<ClearSummary> {
    let client = WildberriesClient::new(wb)?;
    let mapping = load_mapping(paths)?;
    let summary = steps::clear_stocks(&client, mapping.as_ref(), &submit_options(wb, dry_run))
        .context("Stock clearing failed")?;
    if summary.stocks.has_failures() {
        warn!("Some stock batches were rejected: {}", summary.stocks);
    }
    Ok(summary)
}

pub fn download_price(env: &Env) -> Result<FetchSummary> {
    let imap = ImapSettings::from_env(env)?;
    let paths = PathSettings::from_env(env)?;
    let pricing = PricingSettings::from_env(env)?;
    fetch_with(&imap, &paths, &pricing)
}

fn fetch_with(
    imap: &ImapSettings,
    paths: &PathSettings,
    pricing: &PricingSettings,
) -> Result<FetchSummary> {
    let mapping = load_mapping(paths)?;
    if mapping.is_none() {
        warn!("Splitting without the cross-reference files; identifiers are kept as supplied");
    }
    let query = AttachmentQuery::from_settings(imap)?;

    info!("Connecting to {}:{}", imap.server, imap.port);
    let mut session = open_mailbox(imap)
        .with_context(|| format!("Cannot open the mailbox on {}", imap.server))?;
    let found = download_attachment(&mut session, &query)
        .context("No price list attachment could be downloaded")?;

    process_attachment(&found, paths, &pricing.brands, mapping.as_ref())
        .context("Failed to process the price list")
}

pub fn update_wb_stocks_prices(env: &Env, dry_run: bool) -> Result<UpdateSummary> {
    let wb = WbSettings::from_env(env)?;
    let paths = PathSettings::from_env(env)?;
    let pricing = PricingSettings::from_env(env)?;
    update_with(&wb, &paths, &pricing, dry_run)
}

fn update_with(
    wb: &WbSettings,
    paths: &PathSettings,
    pricing: &PricingSettings,
    dry_run: bool,
) -> Result<UpdateSummary> {
    let Some(mapping) = load_mapping(paths)? else {
        bail!(
            "No Articles or Barcodes file in {}; nmIDs cannot be resolved",
            paths.base_dir.display()
        );
    };
    if mapping.is_empty() {
        bail!("The cross-reference files contain no usable rows");
    }

    let client = WildberriesClient::new(wb)?;
    let options = UpdateOptions {
        brands: pricing.brands.clone(),
        multiplier: pricing.multiplier,
        discount: wb.discount,
        warehouse_id: wb.warehouse_id,
        submit: submit_options(wb, dry_run),
    };
    let summary = update_prices_and_stocks(&client, &paths.target_dir, &mapping, &options)
        .context("Price and stock update failed")?;

    for report in &summary.reports {
        let note = match (&report.read_error, report.file_missing) {
            (Some(e), _) => format!(" (unreadable: {e})"),
            (None, true) => " (file missing)".to_string(),
            (None, false) => String::new(),
        };
        info!(
            "  {}: {} row(s), {} resolved, {} skipped{note}",
            report.brand, report.rows, report.resolved, report.skipped
        );
    }
    if summary.has_failures() {
        warn!("Some batches were rejected: {summary}");
    }
    Ok(summary)
}

/// Clear, wait for the marketplace to settle, fetch, update.
pub fn run_full_update(env: &Env, flags: FullUpdateFlags) -> Result<PipelineReport> {
    let config = Config::from_env(env).context("Configuration is incomplete")?;
    let Config {
        wb,
        imap,
        paths,
        pricing,
        pipeline,
    } = config;

    let policy = failure_policy(&pipeline, flags.continue_on_error);
    let settle = if flags.skip_settle || flags.dry_run {
        std::time::Duration::ZERO
    } else {
        pipeline.settle
    };
    info!(
        "Full update: policy {policy:?}, settle {}s{}",
        settle.as_secs(),
        if flags.dry_run { ", dry run" } else { "" }
    );

    let steps = vec![
        PipelineStep::new("clear stocks", || {
            clear_with(&wb, &paths, flags.dry_run).map(|s| s.to_string())
        })
        .pause_after(settle),
        PipelineStep::new("download price", || {
            fetch_with(&imap, &paths, &pricing).map(|s| s.to_string())
        }),
        PipelineStep::new("update prices and stocks", || {
            update_with(&wb, &paths, &pricing, flags.dry_run).map(|s| s.to_string())
        }),
    ];
    Ok(run_pipeline(steps, policy))
}

fn failure_policy(pipeline: &PipelineSettings, continue_flag: bool) -> FailurePolicy {
    if continue_flag || pipeline.continue_on_error {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Abort
    }
}

pub fn check_setup(env: &Env, dotenv_file: Option<&Path>) -> CheckReport {
    run_checks(env, dotenv_file, &mut LiveProbe)
}
