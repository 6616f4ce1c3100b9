//! Tests for the blocking Wildberries client against a mock server.

use std::time::Duration;

use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::config::HttpSettings;

fn settings_for(uri: &str, max_retries: u32) -> WbSettings {
    WbSettings {
        api_token: "test_token".to_string(),
        marketplace_url: uri.to_string(),
        prices_url: uri.to_string(),
        content_url: uri.to_string(),
        batch_size: 100,
        discount: 0,
        warehouse_id: None,
        http: HttpSettings {
            timeout: Duration::from_secs(5),
            max_retries,
            retry_backoff: Duration::ZERO,
            request_delay: Duration::ZERO,
        },
    }
}

fn api_with_mock(uri: &str) -> WildberriesClient {
    WildberriesClient::new(&settings_for(uri, 0)).unwrap()
}

// ── warehouses ──

#[test]
fn lists_warehouses_with_token_header() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(method("GET"))
            .and(path("/api/v3/warehouses"))
            .and(header("Authorization", "test_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 507, "name": "Main", "officeId": 15},
                {"id": 508, "name": "Reserve"}
            ])))
            .expect(1)
            .mount(&server),
    );

    let warehouses = api_with_mock(&server.uri()).warehouses().unwrap();

    assert_eq!(warehouses.len(), 2);
    assert_eq!(warehouses[0].id, 507);
    assert_eq!(warehouses[0].office_id, Some(15));
    assert_eq!(warehouses[1].name, "Reserve");
}

#[test]
fn unauthorized_is_reported_with_body() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(method("GET"))
            .and(path("/api/v3/warehouses"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .mount(&server),
    );

    let err = api_with_mock(&server.uri()).warehouses().unwrap_err();

    match err {
        SyncError::HttpStatus { status, body, .. } => {
            assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);
            assert_eq!(body, "token expired");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ── stocks ──

#[test]
fn puts_stock_batch_to_warehouse() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(method("PUT"))
            .and(path("/api/v3/stocks/507"))
            .and(body_json(json!({
                "stocks": [
                    {"sku": "4600000000011", "amount": 0},
                    {"sku": "4600000000028", "amount": 3}
                ]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server),
    );

    let items = vec![
        StockItem {
            sku: "4600000000011".to_string(),
            amount: 0,
        },
        StockItem {
            sku: "4600000000028".to_string(),
            amount: 3,
        },
    ];
    api_with_mock(&server.uri())
        .update_stocks(507, &items)
        .unwrap();
}

#[test]
fn retries_throttled_stock_update() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(method("PUT"))
            .and(path("/api/v3/stocks/1"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server),
    );
    rt.block_on(
        Mock::given(method("PUT"))
            .and(path("/api/v3/stocks/1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server),
    );

    let client = WildberriesClient::new(&settings_for(&server.uri(), 2)).unwrap();
    client
        .update_stocks(
            1,
            &[StockItem {
                sku: "x".to_string(),
                amount: 0,
            }],
        )
        .unwrap();

    let received = rt.block_on(server.received_requests()).unwrap_or_default();
    assert_eq!(received.len(), 2);
}

#[test]
fn conflict_is_not_retried() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(method("PUT"))
            .and(path("/api/v3/stocks/1"))
            .respond_with(ResponseTemplate::new(409).set_body_string("unknown sku"))
            .mount(&server),
    );

    let client = WildberriesClient::new(&settings_for(&server.uri(), 3)).unwrap();
    let result = client.update_stocks(
        1,
        &[StockItem {
            sku: "x".to_string(),
            amount: 0,
        }],
    );

    assert!(result.is_err());
    let received = rt.block_on(server.received_requests()).unwrap_or_default();
    assert_eq!(received.len(), 1);
}

// ── prices ──

#[test]
fn uploads_price_batch() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(method("POST"))
            .and(path("/api/v2/upload/task"))
            .and(body_json(json!({
                "data": [{"nmID": 12345678, "price": 150, "discount": 0}]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"id": 1}, "error": false, "errorText": ""})),
            )
            .expect(1)
            .mount(&server),
    );

    api_with_mock(&server.uri())
        .upload_prices(&[PriceItem {
            nm_id: 12345678,
            price: 150,
            discount: 0,
        }])
        .unwrap();
}

#[test]
fn price_upload_error_flag_is_a_rejection() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(method("POST"))
            .and(path("/api/v2/upload/task"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"error": true, "errorText": "price too low"})),
            )
            .mount(&server),
    );

    let err = api_with_mock(&server.uri())
        .upload_prices(&[PriceItem {
            nm_id: 1,
            price: 1,
            discount: 0,
        }])
        .unwrap_err();

    assert!(err.to_string().contains("price too low"));
    assert!(!err.is_connectivity());
}

// ── cards ──

#[test]
fn requests_cards_page_with_cursor() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(method("POST"))
            .and(path("/content/v2/get/cards/list"))
            .and(body_partial_json(json!({
                "settings": {
                    "cursor": {"limit": 100, "updatedAt": "2024-05-01T10:00:00Z", "nmID": 77},
                    "filter": {"withPhoto": -1}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cards": [
                    {"nmID": 78, "vendorCode": "0 986 452 041", "brand": "BOSCH",
                     "sizes": [{"skus": ["4047024370390"]}]}
                ],
                "cursor": {"updatedAt": "2024-05-01T11:00:00Z", "nmID": 78, "total": 1}
            })))
            .expect(1)
            .mount(&server),
    );

    let cursor = CardsCursor {
        updated_at: Some("2024-05-01T10:00:00Z".to_string()),
        nm_id: Some(77),
    };
    let page = api_with_mock(&server.uri())
        .cards_page(100, &cursor)
        .unwrap();

    assert_eq!(page.cards.len(), 1);
    assert_eq!(page.cards[0].vendor_code, "0 986 452 041");
    assert_eq!(page.cards[0].skus().collect::<Vec<_>>(), vec!["4047024370390"]);
    assert_eq!(page.cursor.nm_id, Some(78));
}

#[test]
fn first_cards_page_omits_cursor_position() {
    let request = CardsListRequest::new(100, &CardsCursor::default());
    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(
        value,
        json!({"settings": {"cursor": {"limit": 100}, "filter": {"withPhoto": -1}}})
    );
}
