//! Zeroes the stock of every known SKU in every seller warehouse.

use std::collections::BTreeSet;
use std::fmt;

use log::{info, warn};

use super::submit::{submit_stocks, BatchTally, SubmitOptions};
use crate::catalog::CatalogMapping;
use crate::error::{Result, SyncError};
use crate::retry::Pacer;
use crate::wildberries::{list_all_skus, MarketplaceApi, StockItem, CARDS_PAGE_LIMIT};

#[derive(Debug, Clone, Default)]
pub struct ClearSummary {
    pub skus: usize,
    pub warehouses: usize,
    pub stocks: BatchTally,
}

impl fmt::Display for ClearSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} SKU(s) across {} warehouse(s): {}",
            self.skus, self.warehouses, self.stocks
        )
    }
}

/// Collects SKUs from the card listing plus the local barcode file and sets
/// each to zero in every warehouse.
pub fn clear_stocks(
    api: &dyn MarketplaceApi,
    mapping: Option<&CatalogMapping>,
    options: &SubmitOptions,
) -> Result<ClearSummary> {
    let warehouses = api.warehouses()?;
    if warehouses.is_empty() {
        return Err(SyncError::Marketplace(
            "the seller account has no warehouses".to_string(),
        ));
    }
    info!("Found {} warehouse(s)", warehouses.len());

    let mut skus: BTreeSet<String> = list_all_skus(api, CARDS_PAGE_LIMIT)?.into_iter().collect();
    let from_cards = skus.len();
    if let Some(mapping) = mapping {
        skus.extend(mapping.barcodes());
        info!(
            "{} SKU(s) from cards, {} after merging the barcode file",
            from_cards,
            skus.len()
        );
    }

    let mut summary = ClearSummary {
        skus: skus.len(),
        warehouses: warehouses.len(),
        ..ClearSummary::default()
    };
    if skus.is_empty() {
        warn!("No SKUs found, nothing to clear");
        return Ok(summary);
    }

    let items: Vec<StockItem> = skus
        .into_iter()
        .map(|sku| StockItem { sku, amount: 0 })
        .collect();
    let mut pacer = Pacer::new(options.request_delay);
    for warehouse in &warehouses {
        info!(
            "Clearing {} SKU(s) in warehouse {} ({})",
            items.len(),
            warehouse.id,
            warehouse.name
        );
        let tally = submit_stocks(api, warehouse.id, &items, options, &mut pacer)?;
        summary.stocks.add(tally);
    }

    info!("Stock clearing finished: {summary}");
    Ok(summary)
}

#[cfg(test)]
#[path = "clear_tests.rs"]
mod tests;
