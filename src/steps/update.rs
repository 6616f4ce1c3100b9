//! Pushes prices and stock quantities from the per-brand files.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use log::{debug, error, info, warn};
use rust_decimal::Decimal;

use super::submit::{submit_prices, submit_stocks, BatchTally, SubmitOptions};
use crate::catalog::{looks_like_barcode, CatalogMapping};
use crate::error::{Result, SyncError};
use crate::pricelist::{brand_file_name, read_brand_file, PriceRecord};
use crate::pricing::{markup, parse_price, parse_quantity, wire_price};
use crate::retry::Pacer;
use crate::wildberries::{MarketplaceApi, PriceItem, StockItem, Warehouse};

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub brands: Vec<String>,
    pub multiplier: Decimal,
    pub discount: u32,
    /// Only this warehouse receives stock updates when set
    pub warehouse_id: Option<u64>,
    pub submit: SubmitOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrandReport {
    pub brand: String,
    pub rows: usize,
    pub resolved: usize,
    pub skipped: usize,
    pub file_missing: bool,
    /// Set when the file exists but could not be read
    pub read_error: Option<String>,
}

/// Everything that will be sent, built from the brand files before any
/// request is made.
#[derive(Debug, Clone, Default)]
pub struct UpdatePlan {
    pub prices: Vec<PriceItem>,
    pub stocks: Vec<StockItem>,
    pub reports: Vec<BrandReport>,
    pub stock_skipped_no_barcode: usize,
    pub stock_skipped_duplicate_barcode: usize,
}

impl UpdatePlan {
    pub fn rows_processed(&self) -> usize {
        self.reports.iter().map(|r| r.rows).sum()
    }

    pub fn rows_skipped(&self) -> usize {
        self.reports.iter().map(|r| r.skipped).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSummary {
    pub rows_processed: usize,
    pub rows_skipped: usize,
    pub stock_skipped_no_barcode: usize,
    pub stock_skipped_duplicate_barcode: usize,
    pub warehouses: usize,
    pub stocks: BatchTally,
    pub prices: BatchTally,
    pub reports: Vec<BrandReport>,
}

impl UpdateSummary {
    pub fn has_failures(&self) -> bool {
        self.stocks.has_failures() || self.prices.has_failures()
    }
}

impl fmt::Display for UpdateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} row(s) processed, {} skipped; stocks: {}; prices: {}",
            self.rows_processed, self.rows_skipped, self.stocks, self.prices
        )
    }
}

/// Reads every configured brand file and resolves its rows to price and
/// stock items. Rows that cannot be used are logged and counted.
pub fn plan_updates(
    target_dir: &Path,
    mapping: &CatalogMapping,
    options: &UpdateOptions,
) -> Result<UpdatePlan> {
    let mut plan = UpdatePlan::default();
    let mut seen_nm: HashSet<u64> = HashSet::new();
    let mut seen_sku: HashSet<String> = HashSet::new();

    for brand in &options.brands {
        let path = target_dir.join(brand_file_name(brand));
        let mut report = BrandReport {
            brand: brand.clone(),
            ..BrandReport::default()
        };
        if !path.is_file() {
            warn!("Brand file {} not found, brand {brand} skipped", path.display());
            report.file_missing = true;
            plan.reports.push(report);
            continue;
        }

        let records = match read_brand_file(&path) {
            Ok(records) => records,
            Err(e) => {
                error!("Cannot read brand file {}: {e}", path.display());
                report.read_error = Some(e.to_string());
                plan.reports.push(report);
                continue;
            }
        };
        let file = path.display().to_string();
        report.rows = records.len();
        for (index, record) in records.iter().enumerate() {
            // 1-based line number in the file, after the header
            let line = index + 2;
            match plan_row(record, mapping, options, &mut seen_nm) {
                Ok((price, barcode, amount)) => {
                    report.resolved += 1;
                    let nm_id = price.nm_id;
                    plan.prices.push(price);
                    match barcode {
                        Some(sku) if seen_sku.insert(sku.clone()) => {
                            plan.stocks.push(StockItem { sku, amount });
                        }
                        Some(sku) => {
                            warn!(
                                "{file}:{line}: barcode {sku} already queued, stock of nmID {nm_id} not updated"
                            );
                            plan.stock_skipped_duplicate_barcode += 1;
                        }
                        None => {
                            debug!(
                                "{file}:{line}: no barcode for article '{}', stock not updated",
                                record.article
                            );
                            plan.stock_skipped_no_barcode += 1;
                        }
                    }
                }
                Err(reason) => {
                    warn!(
                        "{file}:{line}: skipped article '{}' / '{}': {reason}",
                        record.article, record.identifier
                    );
                    report.skipped += 1;
                }
            }
        }
        info!(
            "Brand {}: {} row(s), {} resolved, {} skipped",
            report.brand, report.rows, report.resolved, report.skipped
        );
        plan.reports.push(report);
    }

    if plan.stock_skipped_no_barcode > 0 {
        warn!(
            "{} row(s) have no barcode; their prices are updated but not their stock",
            plan.stock_skipped_no_barcode
        );
    }
    Ok(plan)
}

/// Resolves one row to a price item, its barcode when known, and the
/// stock quantity.
fn plan_row(
    record: &PriceRecord,
    mapping: &CatalogMapping,
    options: &UpdateOptions,
    seen_nm: &mut HashSet<u64>,
) -> std::result::Result<(PriceItem, Option<String>, u32), String> {
    let price = parse_price(&record.price).map_err(|e| e.to_string())?;
    let amount = parse_quantity(&record.quantity).map_err(|e| e.to_string())?;
    if price.is_zero() {
        return Err("price is zero".to_string());
    }
    let resolved = mapping
        .resolve(&record.article, &record.identifier)
        .ok_or_else(|| "not found in the catalog mapping".to_string())?;
    if seen_nm.contains(&resolved.nm_id) {
        return Err(format!("duplicate of nmID {} seen earlier", resolved.nm_id));
    }

    let exact = markup(price, options.multiplier).map_err(|e| e.to_string())?;
    let submitted = wire_price(price, options.multiplier).map_err(|e| e.to_string())?;
    seen_nm.insert(resolved.nm_id);
    debug!(
        "nmID {}: {} x {} = {exact} (sent {submitted})",
        resolved.nm_id, price, options.multiplier
    );

    let barcode = resolved.barcode.or_else(|| {
        looks_like_barcode(&record.identifier).then(|| {
            record
                .identifier
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect()
        })
    });
    Ok((
        PriceItem {
            nm_id: resolved.nm_id,
            price: submitted,
            discount: options.discount,
        },
        barcode,
        amount,
    ))
}

/// Picks the warehouses that receive stock updates.
pub fn target_warehouses(
    warehouses: Vec<Warehouse>,
    wanted: Option<u64>,
) -> Result<Vec<Warehouse>> {
    if warehouses.is_empty() {
        return Err(SyncError::Marketplace(
            "the seller account has no warehouses".to_string(),
        ));
    }
    match wanted {
        None => Ok(warehouses),
        Some(id) => {
            let known: Vec<String> = warehouses.iter().map(|w| w.id.to_string()).collect();
            warehouses
                .into_iter()
                .find(|w| w.id == id)
                .map(|w| vec![w])
                .ok_or_else(|| {
                    SyncError::config(
                        "WB_WAREHOUSE_ID",
                        format!("warehouse {id} not found (known: {})", known.join(", ")),
                    )
                })
        }
    }
}

/// Sends the plan: stock batches to every target warehouse first, then the
/// price batches.
pub fn submit_plan(
    api: &dyn MarketplaceApi,
    plan: &UpdatePlan,
    options: &UpdateOptions,
) -> Result<UpdateSummary> {
    let mut summary = UpdateSummary {
        rows_processed: plan.rows_processed(),
        rows_skipped: plan.rows_skipped(),
        stock_skipped_no_barcode: plan.stock_skipped_no_barcode,
        stock_skipped_duplicate_barcode: plan.stock_skipped_duplicate_barcode,
        reports: plan.reports.clone(),
        ..UpdateSummary::default()
    };
    if plan.prices.is_empty() && plan.stocks.is_empty() {
        warn!("Nothing to submit");
        return Ok(summary);
    }

    let warehouses = target_warehouses(api.warehouses()?, options.warehouse_id)?;
    summary.warehouses = warehouses.len();
    let mut pacer = Pacer::new(options.submit.request_delay);

    for warehouse in &warehouses {
        info!(
            "Updating {} stock item(s) in warehouse {} ({})",
            plan.stocks.len(),
            warehouse.id,
            warehouse.name
        );
        let tally = submit_stocks(api, warehouse.id, &plan.stocks, &options.submit, &mut pacer)?;
        summary.stocks.add(tally);
    }

    info!("Uploading {} price item(s)", plan.prices.len());
    summary.prices = submit_prices(api, &plan.prices, &options.submit, &mut pacer)?;

    info!("Price and stock update finished: {summary}");
    Ok(summary)
}

/// Plans and submits in one go.
pub fn update_prices_and_stocks(
    api: &dyn MarketplaceApi,
    target_dir: &Path,
    mapping: &CatalogMapping,
    options: &UpdateOptions,
) -> Result<UpdateSummary> {
    let plan = plan_updates(target_dir, mapping, options)?;
    info!(
        "Planned {} price item(s) and {} stock item(s) from {} row(s)",
        plan.prices.len(),
        plan.stocks.len(),
        plan.rows_processed()
    );
    submit_plan(api, &plan, options)
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;
