use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::models::{
    CardsListRequest, CardsPage, PriceItem, PriceUploadRequest, StockItem, StockUpdateRequest,
    UploadTaskResponse, Warehouse,
};
use super::{CardsCursor, MarketplaceApi};
use crate::config::WbSettings;
use crate::error::{Result, SyncError};
use crate::retry::RetryPolicy;

/// Blocking client for the three Wildberries API hosts.
pub struct WildberriesClient {
    client: Client,
    api_token: String,
    marketplace_url: String,
    prices_url: String,
    content_url: String,
    retry: RetryPolicy,
}

impl WildberriesClient {
    pub fn new(settings: &WbSettings) -> Result<Self> {
        info!("Creating Wildberries API client");
        debug!("API token length: {}", settings.api_token.len());
        let client = Client::builder()
            .timeout(settings.http.timeout)
            .user_agent(concat!("wb_price_sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_token: settings.api_token.clone(),
            marketplace_url: settings.marketplace_url.clone(),
            prices_url: settings.prices_url.clone(),
            content_url: settings.content_url.clone(),
            retry: RetryPolicy::from_settings(&settings.http),
        })
    }

    /// Sends the request built by `build`, retrying transient failures, and
    /// returns the raw body of a successful response.
    fn execute<F>(&self, endpoint: &str, build: F) -> Result<String>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.retry.run(endpoint, || {
            let response = build(&self.client)
                .header("Authorization", &self.api_token)
                .send()?;
            let status = response.status();
            debug!("{endpoint} response status: {status}");
            let body = response.text()?;
            if !status.is_success() {
                return Err(SyncError::HttpStatus {
                    endpoint: endpoint.to_string(),
                    status,
                    body: truncate(&body, 500),
                });
            }
            debug!("{endpoint} response body: {}", truncate(&body, 2000));
            Ok(body)
        })
    }

    fn execute_json<T, F>(&self, endpoint: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let body = self.execute(endpoint, build)?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl MarketplaceApi for WildberriesClient {
    fn warehouses(&self) -> Result<Vec<Warehouse>> {
        let url = format!("{}/api/v3/warehouses", self.marketplace_url);
        debug!("Fetching warehouses from: {url}");
        self.execute_json("warehouses", |c| c.get(&url))
    }

    fn cards_page(&self, limit: usize, cursor: &CardsCursor) -> Result<CardsPage> {
        let url = format!("{}/content/v2/get/cards/list", self.content_url);
        let request = CardsListRequest::new(limit, cursor);
        debug!("Requesting cards page: limit={limit}, cursor={cursor:?}");
        self.execute_json("cards list", |c| c.post(&url).json(&request))
    }

    fn update_stocks(&self, warehouse_id: u64, items: &[StockItem]) -> Result<()> {
        let url = format!("{}/api/v3/stocks/{warehouse_id}", self.marketplace_url);
        let request = StockUpdateRequest { stocks: items };
        debug!(
            "Sending {} stock items to warehouse {warehouse_id}",
            items.len()
        );
        self.execute("stocks", |c| c.put(&url).json(&request))?;
        Ok(())
    }

    fn upload_prices(&self, items: &[PriceItem]) -> Result<()> {
        let url = format!("{}/api/v2/upload/task", self.prices_url);
        let request = PriceUploadRequest { data: items };
        debug!("Uploading {} price items", items.len());
        let body = self.execute("prices", |c| c.post(&url).json(&request))?;
        if body.trim().is_empty() {
            return Ok(());
        }
        // Some answers are not JSON objects; only an explicit error flag fails.
        if let Ok(answer) = serde_json::from_str::<UploadTaskResponse>(&body) {
            if answer.error {
                return Err(SyncError::Marketplace(format!(
                    "price upload rejected: {}",
                    answer.error_text
                )));
            }
        }
        Ok(())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
