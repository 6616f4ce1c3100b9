//! Wildberries seller API: warehouses, stocks, content cards and prices.

mod client;
pub mod models;

pub use client::WildberriesClient;
pub use models::{Card, CardsCursor, CardsPage, PriceItem, StockItem, Warehouse};

use std::collections::BTreeSet;

use log::{debug, info, warn};

use crate::error::Result;

/// Page size for the card listing (provider maximum)
pub const CARDS_PAGE_LIMIT: usize = 100;

/// Calls the steps need from the marketplace. Implemented by
/// [`WildberriesClient`] and by in-memory fakes in tests.
pub trait MarketplaceApi {
    fn warehouses(&self) -> Result<Vec<Warehouse>>;

    fn cards_page(&self, limit: usize, cursor: &CardsCursor) -> Result<CardsPage>;

    fn update_stocks(&self, warehouse_id: u64, items: &[StockItem]) -> Result<()>;

    fn upload_prices(&self, items: &[PriceItem]) -> Result<()>;
}

/// Walks the card listing to the end and returns every SKU, sorted and
/// without duplicates.
pub fn list_all_skus(api: &dyn MarketplaceApi, limit: usize) -> Result<Vec<String>> {
    let limit = limit.max(1);
    let mut skus = BTreeSet::new();
    let mut cursor = CardsCursor::default();
    let mut pages = 0usize;
    let mut cards_seen = 0usize;

    loop {
        let page = api.cards_page(limit, &cursor)?;
        pages += 1;
        cards_seen += page.cards.len();
        debug!(
            "Cards page {pages}: {} cards, total reported {}",
            page.cards.len(),
            page.cursor.total
        );
        for card in &page.cards {
            skus.extend(card.skus().map(str::to_string));
        }

        if page.cards.len() < limit {
            break;
        }
        let next = page.cursor.next_position();
        if next == cursor || (next.updated_at.is_none() && next.nm_id.is_none()) {
            warn!("Card listing cursor did not advance after page {pages}, stopping");
            break;
        }
        cursor = next;
    }

    info!(
        "Listed {cards_seen} cards in {pages} page(s), {} unique SKUs",
        skus.len()
    );
    Ok(skus.into_iter().collect())
}

/// Splits `items` into consecutive chunks of at most `size` entries.
pub fn batches<T>(items: &[T], size: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(size.max(1))
}

#[cfg(test)]
pub(crate) mod fake;

#[cfg(test)]
#[path = "wildberries_tests.rs"]
mod tests;
