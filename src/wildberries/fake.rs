//! In-memory marketplace used by unit tests of the steps.

use std::cell::RefCell;
use std::collections::HashSet;

use super::models::CardSize;
use super::{Card, CardsCursor, CardsPage, MarketplaceApi, PriceItem, StockItem, Warehouse};
use crate::error::{Result, SyncError};

#[derive(Default)]
pub struct FakeMarketplace {
    pub warehouses: Vec<Warehouse>,
    pub cards: Vec<Card>,
    /// Warehouses whose stock updates are rejected with HTTP 400
    pub rejecting_warehouses: HashSet<u64>,
    pub reject_prices: bool,
    pub unreachable: bool,
    pub stock_calls: RefCell<Vec<(u64, Vec<StockItem>)>>,
    pub price_calls: RefCell<Vec<Vec<PriceItem>>>,
    pub page_calls: RefCell<usize>,
}

impl FakeMarketplace {
    pub fn with_warehouses(ids: &[u64]) -> Self {
        Self {
            warehouses: ids
                .iter()
                .map(|&id| Warehouse {
                    id,
                    name: format!("Warehouse {id}"),
                    office_id: None,
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn card(nm_id: u64, skus: &[&str]) -> Card {
        Card {
            nm_id,
            vendor_code: format!("V{nm_id}"),
            brand: "BOSCH".to_string(),
            sizes: vec![CardSize {
                skus: skus.iter().map(|s| s.to_string()).collect(),
            }],
        }
    }

    pub fn stock_items_sent(&self, warehouse_id: u64) -> Vec<StockItem> {
        self.stock_calls
            .borrow()
            .iter()
            .filter(|(id, _)| *id == warehouse_id)
            .flat_map(|(_, items)| items.clone())
            .collect()
    }

    pub fn prices_sent(&self) -> Vec<PriceItem> {
        self.price_calls.borrow().iter().flatten().cloned().collect()
    }

    fn offline() -> SyncError {
        SyncError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ))
    }

    fn rejected(endpoint: &str) -> SyncError {
        SyncError::HttpStatus {
            endpoint: endpoint.to_string(),
            status: reqwest::StatusCode::BAD_REQUEST,
            body: "{\"error\":\"rejected\"}".to_string(),
        }
    }
}

impl MarketplaceApi for FakeMarketplace {
    fn warehouses(&self) -> Result<Vec<Warehouse>> {
        if self.unreachable {
            return Err(Self::offline());
        }
        Ok(self.warehouses.clone())
    }

    fn cards_page(&self, limit: usize, cursor: &CardsCursor) -> Result<CardsPage> {
        if self.unreachable {
            return Err(Self::offline());
        }
        *self.page_calls.borrow_mut() += 1;
        let start = match cursor.nm_id {
            Some(last) => self
                .cards
                .iter()
                .position(|c| c.nm_id == last)
                .map_or(self.cards.len(), |i| i + 1),
            None => 0,
        };
        let cards: Vec<Card> = self.cards.iter().skip(start).take(limit).cloned().collect();
        let mut page = CardsPage {
            cards,
            ..CardsPage::default()
        };
        if let Some(last) = page.cards.last() {
            page.cursor.nm_id = Some(last.nm_id);
            page.cursor.updated_at = Some("2024-01-01T00:00:00Z".to_string());
        }
        page.cursor.total = page.cards.len() as u64;
        Ok(page)
    }

    fn update_stocks(&self, warehouse_id: u64, items: &[StockItem]) -> Result<()> {
        if self.unreachable {
            return Err(Self::offline());
        }
        if self.rejecting_warehouses.contains(&warehouse_id) {
            return Err(Self::rejected("stocks"));
        }
        self.stock_calls
            .borrow_mut()
            .push((warehouse_id, items.to_vec()));
        Ok(())
    }

    fn upload_prices(&self, items: &[PriceItem]) -> Result<()> {
        if self.unreachable {
            return Err(Self::offline());
        }
        if self.reject_prices {
            return Err(Self::rejected("prices"));
        }
        self.price_calls.borrow_mut().push(items.to_vec());
        Ok(())
    }
}
