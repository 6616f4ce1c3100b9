//! Unit tests for price parsing and markup.

use super::*;
use rust_decimal_macros::dec;

mod parse_price_tests {
    use super::*;

    #[test]
    fn parses_comma_decimal() {
        assert_eq!(parse_price("1,87").unwrap(), dec!(1.87));
    }

    #[test]
    fn parses_dot_decimal() {
        assert_eq!(parse_price("1.87").unwrap(), dec!(1.87));
    }

    #[test]
    fn ignores_thousands_spaces() {
        assert_eq!(parse_price("1 234,50").unwrap(), dec!(1234.50));
        assert_eq!(parse_price("12\u{a0}500").unwrap(), dec!(12500));
    }

    #[test]
    fn strips_quotes() {
        assert_eq!(parse_price("\"100\"").unwrap(), dec!(100));
    }

    #[test]
    fn fails_for_invalid_input() {
        assert!(parse_price("по запросу").is_err());
        assert!(parse_price("").is_err());
        assert!(parse_price("-5").is_err());
    }
}

mod parse_quantity_tests {
    use super::*;

    #[test]
    fn parses_plain_number() {
        assert_eq!(parse_quantity("12").unwrap(), 12);
    }

    #[test]
    fn truncates_fraction() {
        assert_eq!(parse_quantity("3,9").unwrap(), 3);
    }

    #[test]
    fn accepts_supplier_markers() {
        assert_eq!(parse_quantity(">10").unwrap(), 10);
        assert_eq!(parse_quantity("50+").unwrap(), 50);
    }

    #[test]
    fn rejects_negative_and_text() {
        assert!(parse_quantity("-1").is_err());
        assert!(parse_quantity("много").is_err());
    }
}

mod markup_tests {
    use super::*;

    #[test]
    fn hundred_times_one_and_a_half() {
        assert_eq!(markup(dec!(100.00), dec!(1.5)).unwrap(), dec!(150.00));
        assert_eq!(wire_price(dec!(100.00), dec!(1.5)).unwrap(), 150);
    }

    #[test]
    fn rounds_half_up_to_kopecks() {
        // 0.01 * 1.5 = 0.015
        assert_eq!(markup(dec!(0.01), dec!(1.5)).unwrap(), dec!(0.02));
    }

    #[test]
    fn wire_price_rounds_half_up() {
        // 99.67 * 1.5 = 149.505
        assert_eq!(wire_price(dec!(99.67), dec!(1.5)).unwrap(), 150);
        // 99.66 * 1.5 = 149.49
        assert_eq!(wire_price(dec!(99.66), dec!(1.5)).unwrap(), 149);
        // 1.0 * 1.5 = 1.5
        assert_eq!(wire_price(dec!(1), dec!(1.5)).unwrap(), 2);
    }

    #[test]
    fn wire_price_uses_exact_product() {
        // 149.4975 would become 149.50 after kopeck rounding, then 150
        assert_eq!(wire_price(dec!(99.665), dec!(1.5)).unwrap(), 149);
    }

    #[test]
    fn overflowing_product_is_a_data_error() {
        let price = parse_price("70000000000000000000000000000").unwrap();
        assert!(matches!(
            wire_price(price, dec!(1.5)),
            Err(SyncError::Data { .. })
        ));
        assert!(markup(price, dec!(1.5)).is_err());
    }

    #[test]
    fn product_beyond_u64_is_a_data_error() {
        let price = parse_price("30000000000000000000").unwrap();
        assert!(wire_price(price, dec!(1.5)).is_err());
    }
}
