//! Batched submission shared by the clearer and the updater.

use std::fmt;
use std::time::Duration;

use log::{info, warn};

use crate::error::Result;
use crate::retry::Pacer;
use crate::wildberries::{batches, MarketplaceApi, PriceItem, StockItem};

#[derive(Debug, Clone)]
pub struct SubmitOptions {
    pub batch_size: usize,
    pub request_delay: Duration,
    /// Log what would be sent, call no mutating endpoint
    pub dry_run: bool,
}

/// Outcome counters for a series of batch submissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTally {
    pub batches_sent: usize,
    pub batches_failed: usize,
    pub items_sent: usize,
    pub items_failed: usize,
}

impl BatchTally {
    pub fn add(&mut self, other: BatchTally) {
        self.batches_sent += other.batches_sent;
        self.batches_failed += other.batches_failed;
        self.items_sent += other.items_sent;
        self.items_failed += other.items_failed;
    }

    pub fn has_failures(&self) -> bool {
        self.batches_failed > 0
    }
}

impl fmt::Display for BatchTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} batch(es) sent, {} failed; {} item(s) sent, {} failed",
            self.batches_sent, self.batches_failed, self.items_sent, self.items_failed
        )
    }
}

/// Sends `items` to one warehouse in batches. A rejected batch is logged and
/// counted; a connectivity failure aborts and is returned.
pub fn submit_stocks(
    api: &dyn MarketplaceApi,
    warehouse_id: u64,
    items: &[StockItem],
    options: &SubmitOptions,
    pacer: &mut Pacer,
) -> Result<BatchTally> {
    let mut tally = BatchTally::default();
    let total = items.len().div_ceil(options.batch_size.max(1));
    for (i, batch) in batches(items, options.batch_size).enumerate() {
        let number = i + 1;
        if options.dry_run {
            info!(
                "[dry run] Would send stock batch {number}/{total} ({} items) to warehouse {warehouse_id}",
                batch.len()
            );
            tally.batches_sent += 1;
            tally.items_sent += batch.len();
            continue;
        }
        pacer.wait();
        match api.update_stocks(warehouse_id, batch) {
            Ok(()) => {
                info!(
                    "Stock batch {number}/{total} ({} items) accepted by warehouse {warehouse_id}",
                    batch.len()
                );
                tally.batches_sent += 1;
                tally.items_sent += batch.len();
            }
            Err(e) if e.is_connectivity() => return Err(e),
            Err(e) => {
                warn!(
                    "Stock batch {number}/{total} ({} items) rejected by warehouse {warehouse_id}: {e}",
                    batch.len()
                );
                tally.batches_failed += 1;
                tally.items_failed += batch.len();
            }
        }
    }
    Ok(tally)
}

/// Sends `items` to the price endpoint in batches, same failure rules as
/// [`submit_stocks`].
pub fn submit_prices(
    api: &dyn MarketplaceApi,
    items: &[PriceItem],
    options: &SubmitOptions,
    pacer: &mut Pacer,
) -> Result<BatchTally> {
    let mut tally = BatchTally::default();
    let total = items.len().div_ceil(options.batch_size.max(1));
    for (i, batch) in batches(items, options.batch_size).enumerate() {
        let number = i + 1;
        if options.dry_run {
            info!(
                "[dry run] Would upload price batch {number}/{total} ({} items)",
                batch.len()
            );
            tally.batches_sent += 1;
            tally.items_sent += batch.len();
            continue;
        }
        pacer.wait();
        match api.upload_prices(batch) {
            Ok(()) => {
                info!("Price batch {number}/{total} ({} items) accepted", batch.len());
                tally.batches_sent += 1;
                tally.items_sent += batch.len();
            }
            Err(e) if e.is_connectivity() => return Err(e),
            Err(e) => {
                warn!(
                    "Price batch {number}/{total} ({} items) rejected: {e}",
                    batch.len()
                );
                tally.batches_failed += 1;
                tally.items_failed += batch.len();
            }
        }
    }
    Ok(tally)
}
