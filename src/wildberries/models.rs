use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "officeId", default, skip_serializing_if = "Option::is_none")]
    pub office_id: Option<u64>,
}

/// One stock entry; `sku` is the product barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    pub sku: String,
    pub amount: u32,
}

#[derive(Debug, Serialize)]
pub struct StockUpdateRequest<'a> {
    pub stocks: &'a [StockItem],
}

/// One price entry. The marketplace accepts whole currency units only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceItem {
    #[serde(rename = "nmID")]
    pub nm_id: u64,
    pub price: u64,
    pub discount: u32,
}

#[derive(Debug, Serialize)]
pub struct PriceUploadRequest<'a> {
    pub data: &'a [PriceItem],
}

/// Answer of the price upload endpoint. A 200 can still carry `error: true`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadTaskResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(rename = "errorText", default)]
    pub error_text: String,
}

/// Position in the card listing. An empty cursor requests the first page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardsCursor {
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(rename = "nmID", default, skip_serializing_if = "Option::is_none")]
    pub nm_id: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CardsListRequest {
    pub settings: CardsListSettings,
}

#[derive(Debug, Serialize)]
pub struct CardsListSettings {
    pub cursor: CardsRequestCursor,
    pub filter: CardsFilter,
}

#[derive(Debug, Serialize)]
pub struct CardsRequestCursor {
    pub limit: usize,
    #[serde(flatten)]
    pub position: CardsCursor,
}

#[derive(Debug, Serialize)]
pub struct CardsFilter {
    /// -1 lists cards with and without photos
    #[serde(rename = "withPhoto")]
    pub with_photo: i32,
}

impl CardsListRequest {
    pub fn new(limit: usize, position: &CardsCursor) -> Self {
        Self {
            settings: CardsListSettings {
                cursor: CardsRequestCursor {
                    limit,
                    position: position.clone(),
                },
                filter: CardsFilter { with_photo: -1 },
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardsPage {
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub cursor: CardsResponseCursor,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardsResponseCursor {
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<String>,
    #[serde(rename = "nmID", default)]
    pub nm_id: Option<u64>,
    #[serde(default)]
    pub total: u64,
}

impl CardsResponseCursor {
    pub fn next_position(&self) -> CardsCursor {
        CardsCursor {
            updated_at: self.updated_at.clone(),
            nm_id: self.nm_id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Card {
    #[serde(rename = "nmID")]
    pub nm_id: u64,
    #[serde(rename = "vendorCode", default)]
    pub vendor_code: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub sizes: Vec<CardSize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardSize {
    #[serde(default)]
    pub skus: Vec<String>,
}

impl Card {
    pub fn skus(&self) -> impl Iterator<Item = &str> {
        self.sizes
            .iter()
            .flat_map(|s| s.skus.iter())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}
