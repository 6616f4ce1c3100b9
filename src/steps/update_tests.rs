//! Unit tests for planning and submitting price/stock updates.

use std::fs;
use std::time::Duration;

use rust_decimal_macros::dec;
use tempfile::TempDir;

use super::*;
use crate::pricelist::split::write_brand_file;
use crate::pricelist::table::Row;
use crate::wildberries::fake::FakeMarketplace;

fn row(cells: &[&str]) -> Row {
    cells.iter().map(|c| c.to_string()).collect()
}

fn mapping() -> CatalogMapping {
    CatalogMapping::from_rows(
        &[
            row(&["1", "AG 01007", "11110001"]),
            row(&["2", "0 986 452 041", "11110002"]),
            row(&["3", "W 712/75", "11110003"]),
        ],
        &[
            row(&["1", "AG 01007", "11110001", "", "", "", "4600000000011"]),
            row(&["4", "HU 719", "11110004", "", "", "", "4600000000042"]),
        ],
    )
}

fn record(brand: &str, article: &str, identifier: &str, price: &str, qty: &str) -> PriceRecord {
    PriceRecord {
        brand: brand.to_string(),
        article: article.to_string(),
        identifier: identifier.to_string(),
        price: price.to_string(),
        quantity: qty.to_string(),
    }
}

fn options(brands: &[&str]) -> UpdateOptions {
    UpdateOptions {
        brands: brands.iter().map(|b| b.to_string()).collect(),
        multiplier: dec!(1.5),
        discount: 0,
        warehouse_id: None,
        submit: SubmitOptions {
            batch_size: 100,
            request_delay: Duration::ZERO,
            dry_run: false,
        },
    }
}

fn write_brand(dir: &Path, brand: &str, records: &[PriceRecord]) {
    write_brand_file(&dir.join(brand_file_name(brand)), records).unwrap();
}

mod plan_tests {
    use super::*;

    #[test]
    fn resolves_rows_and_applies_markup() {
        let dir = TempDir::new().unwrap();
        write_brand(
            dir.path(),
            "BOSCH",
            &[
                record("BOSCH", "AG01007", "4600000000011", "100,00", "5"),
                record("BOSCH", "0986452041", "Oil filter", "200.50", "2"),
            ],
        );

        let plan = plan_updates(dir.path(), &mapping(), &options(&["BOSCH"])).unwrap();

        assert_eq!(
            plan.prices,
            vec![
                PriceItem {
                    nm_id: 11110001,
                    price: 150,
                    discount: 0
                },
                PriceItem {
                    nm_id: 11110002,
                    price: 301,
                    discount: 0
                },
            ]
        );
        assert_eq!(
            plan.stocks,
            vec![StockItem {
                sku: "4600000000011".to_string(),
                amount: 5
            }]
        );
        assert_eq!(plan.stock_skipped_no_barcode, 1);
    }

    #[test]
    fn unresolved_and_invalid_rows_are_skipped_and_counted() {
        let dir = TempDir::new().unwrap();
        write_brand(
            dir.path(),
            "MANN",
            &[
                record("MANN", "UNKNOWN-1", "n/a", "10", "1"),
                record("MANN", "W712/75", "", "по запросу", "1"),
                record("MANN", "W712/75", "", "450", "-2"),
                record("MANN", "W712/75", "", "450", "3"),
            ],
        );

        let plan = plan_updates(dir.path(), &mapping(), &options(&["MANN"])).unwrap();

        let report = &plan.reports[0];
        assert_eq!(report.rows, 4);
        assert_eq!(report.resolved, 1);
        assert_eq!(report.skipped, 3);
        assert_eq!(plan.prices.len(), 1);
        assert_eq!(plan.prices[0].price, 675);
    }

    #[test]
    fn duplicate_nm_id_keeps_first_occurrence() {
        let dir = TempDir::new().unwrap();
        write_brand(
            dir.path(),
            "BOSCH",
            &[
                record("BOSCH", "AG01007", "", "100", "1"),
                record("BOSCH", "ag 01007", "", "999", "9"),
            ],
        );
        write_brand(
            dir.path(),
            "TRIALLI",
            &[record("TRIALLI", "X", "4600000000011", "50", "1")],
        );

        let plan =
            plan_updates(dir.path(), &mapping(), &options(&["BOSCH", "TRIALLI"])).unwrap();

        assert_eq!(plan.prices.len(), 1);
        assert_eq!(plan.prices[0].price, 150);
        assert_eq!(plan.stocks.len(), 1);
        assert_eq!(plan.stocks[0].amount, 1);
        assert_eq!(plan.rows_skipped(), 2);
    }

    #[test]
    fn barcode_identifier_resolves_unknown_article() {
        let dir = TempDir::new().unwrap();
        write_brand(
            dir.path(),
            "MANN",
            &[record("MANN", "HU719/7X", "4600000000042", "10", "4")],
        );

        let plan = plan_updates(dir.path(), &mapping(), &options(&["MANN"])).unwrap();

        assert_eq!(plan.prices[0].nm_id, 11110004);
        assert_eq!(plan.stocks[0].sku, "4600000000042");
    }

    #[test]
    fn missing_brand_file_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let plan = plan_updates(dir.path(), &mapping(), &options(&["LADA"])).unwrap();
        assert!(plan.reports[0].file_missing);
        assert_eq!(plan.rows_processed(), 0);
    }

    #[test]
    fn unreadable_brand_file_does_not_stop_other_brands() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(brand_file_name("BOSCH")),
            "Код;Наименование\n1;Фильтр\n",
        )
        .unwrap();
        write_brand(
            dir.path(),
            "MANN",
            &[record("MANN", "W712/75", "", "450", "3")],
        );

        let plan = plan_updates(dir.path(), &mapping(), &options(&["BOSCH", "MANN"])).unwrap();

        assert!(plan.reports[0].read_error.is_some());
        assert!(!plan.reports[0].file_missing);
        assert_eq!(plan.reports[1].resolved, 1);
        assert_eq!(plan.prices[0].nm_id, 11110003);
    }

    #[test]
    fn overflowing_price_skips_the_row() {
        let dir = TempDir::new().unwrap();
        write_brand(
            dir.path(),
            "BOSCH",
            &[
                record(
                    "BOSCH",
                    "AG01007",
                    "4600000000011",
                    "70000000000000000000000000000",
                    "5",
                ),
                record("BOSCH", "W712/75", "", "450", "3"),
            ],
        );

        let plan = plan_updates(dir.path(), &mapping(), &options(&["BOSCH"])).unwrap();

        assert_eq!(plan.reports[0].skipped, 1);
        assert_eq!(plan.prices.len(), 1);
        assert_eq!(plan.prices[0].nm_id, 11110003);
    }

    #[test]
    fn rejected_price_does_not_claim_the_nm_id() {
        let dir = TempDir::new().unwrap();
        write_brand(
            dir.path(),
            "BOSCH",
            &[
                record("BOSCH", "AG01007", "", "30000000000000000000", "1"),
                record("BOSCH", "AG01007", "", "100", "1"),
            ],
        );

        let plan = plan_updates(dir.path(), &mapping(), &options(&["BOSCH"])).unwrap();

        assert_eq!(
            plan.prices,
            vec![PriceItem {
                nm_id: 11110001,
                price: 150,
                discount: 0
            }]
        );
        assert_eq!(plan.reports[0].skipped, 1);
    }

    #[test]
    fn shared_barcode_updates_stock_once_and_is_counted() {
        let dir = TempDir::new().unwrap();
        write_brand(
            dir.path(),
            "MANN",
            &[
                record("MANN", "0986452041", "4600000000099", "10", "4"),
                record("MANN", "W712/75", "4600000000099", "20", "7"),
            ],
        );

        let plan = plan_updates(dir.path(), &mapping(), &options(&["MANN"])).unwrap();

        assert_eq!(plan.prices.len(), 2);
        assert_eq!(
            plan.stocks,
            vec![StockItem {
                sku: "4600000000099".to_string(),
                amount: 4
            }]
        );
        assert_eq!(plan.stock_skipped_duplicate_barcode, 1);
        assert_eq!(plan.stock_skipped_no_barcode, 0);
    }

    #[test]
    fn discount_is_passed_through() {
        let dir = TempDir::new().unwrap();
        write_brand(
            dir.path(),
            "BOSCH",
            &[record("BOSCH", "AG01007", "", "100", "1")],
        );
        let mut opts = options(&["BOSCH"]);
        opts.discount = 15;

        let plan = plan_updates(dir.path(), &mapping(), &opts).unwrap();

        assert_eq!(plan.prices[0].discount, 15);
    }
}

mod submit_tests {
    use super::*;

    fn plan_with(prices: usize, stocks: usize) -> UpdatePlan {
        UpdatePlan {
            prices: (0..prices as u64)
                .map(|n| PriceItem {
                    nm_id: 1000 + n,
                    price: 150,
                    discount: 0,
                })
                .collect(),
            stocks: (0..stocks)
                .map(|n| StockItem {
                    sku: format!("46{n:011}"),
                    amount: 1,
                })
                .collect(),
            ..UpdatePlan::default()
        }
    }

    #[test]
    fn every_item_lands_in_exactly_one_batch_per_warehouse() {
        let api = FakeMarketplace::with_warehouses(&[10, 20]);
        let plan = plan_with(250, 250);

        let summary = submit_plan(&api, &plan, &options(&[])).unwrap();

        let price_sizes: Vec<usize> = api.price_calls.borrow().iter().map(Vec::len).collect();
        assert_eq!(price_sizes, vec![100, 100, 50]);
        assert_eq!(api.prices_sent(), plan.prices);
        assert_eq!(api.stock_items_sent(10), plan.stocks);
        assert_eq!(api.stock_items_sent(20), plan.stocks);
        assert_eq!(summary.stocks.items_sent, 500);
        assert_eq!(summary.prices.items_sent, 250);
    }

    #[test]
    fn configured_warehouse_only() {
        let api = FakeMarketplace::with_warehouses(&[10, 20]);
        let mut opts = options(&[]);
        opts.warehouse_id = Some(20);

        let summary = submit_plan(&api, &plan_with(1, 3), &opts).unwrap();

        assert_eq!(summary.warehouses, 1);
        assert!(api.stock_items_sent(10).is_empty());
        assert_eq!(api.stock_items_sent(20).len(), 3);
    }

    #[test]
    fn unknown_configured_warehouse_is_an_error() {
        let api = FakeMarketplace::with_warehouses(&[10]);
        let mut opts = options(&[]);
        opts.warehouse_id = Some(99);

        let err = submit_plan(&api, &plan_with(1, 1), &opts).unwrap_err();

        assert!(err.to_string().contains("WB_WAREHOUSE_ID"));
        assert!(api.price_calls.borrow().is_empty());
    }

    #[test]
    fn price_rejection_is_counted() {
        let api = FakeMarketplace {
            reject_prices: true,
            ..FakeMarketplace::with_warehouses(&[10])
        };

        let summary = submit_plan(&api, &plan_with(2, 2), &options(&[])).unwrap();

        assert_eq!(summary.prices.batches_failed, 1);
        assert_eq!(summary.stocks.items_sent, 2);
        assert!(summary.has_failures());
    }

    #[test]
    fn dry_run_reads_warehouses_but_sends_nothing() {
        let api = FakeMarketplace::with_warehouses(&[10]);
        let mut opts = options(&[]);
        opts.submit.dry_run = true;

        let summary = submit_plan(&api, &plan_with(3, 3), &opts).unwrap();

        assert_eq!(summary.prices.items_sent, 3);
        assert!(api.price_calls.borrow().is_empty());
        assert!(api.stock_calls.borrow().is_empty());
    }

    #[test]
    fn empty_plan_makes_no_calls() {
        let api = FakeMarketplace {
            unreachable: true,
            ..FakeMarketplace::default()
        };
        let summary = submit_plan(&api, &UpdatePlan::default(), &options(&[])).unwrap();
        assert_eq!(summary.warehouses, 0);
    }
}

#[test]
fn brand_file_round_trip_reads_written_rows() {
    let dir = TempDir::new().unwrap();
    write_brand(
        dir.path(),
        "BOSCH",
        &[record("BOSCH", "AG01007", "", "100", "1")],
    );
    let content = fs::read_to_string(dir.path().join("brand_BOSCH.csv")).unwrap();
    assert!(content.starts_with("\"brand\";"));
}
