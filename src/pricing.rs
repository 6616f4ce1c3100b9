//! Parsing of supplier price/quantity cells and the marketplace markup.

use log::debug;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{Result, SyncError};

/// Parses a supplier price. Accepts comma or dot decimals, ignores spaces
/// (including non-breaking ones used as thousands separators) and quotes.
pub fn parse_price(raw: &str) -> Result<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '"' && *c != '\'')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    debug!("Parsing price: '{raw}' -> '{cleaned}'");
    if cleaned.is_empty() {
        return Err(SyncError::data("price", "empty price"));
    }
    let price: Decimal = cleaned
        .parse()
        .map_err(|_| SyncError::data("price", format!("'{raw}' is not a number")))?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(SyncError::data("price", format!("'{raw}' is negative")));
    }
    Ok(price)
}

/// Parses a stock quantity. Supplier markers like `>10` or `10+` count as
/// the number itself, fractions are truncated.
pub fn parse_quantity(raw: &str) -> Result<u32> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '"' | '>' | '<' | '+'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Err(SyncError::data("quantity", "empty quantity"));
    }
    let quantity: Decimal = cleaned
        .parse()
        .map_err(|_| SyncError::data("quantity", format!("'{raw}' is not a number")))?;
    if quantity.is_sign_negative() && !quantity.is_zero() {
        return Err(SyncError::data("quantity", format!("'{raw}' is negative")));
    }
    quantity
        .trunc()
        .to_u32()
        .ok_or_else(|| SyncError::data("quantity", format!("'{raw}' is out of range")))
}

fn marked_up(price: Decimal, multiplier: Decimal) -> Result<Decimal> {
    price
        .checked_mul(multiplier)
        .ok_or_else(|| SyncError::data("price", format!("{price} x {multiplier} is out of range")))
}

/// Marked-up price rounded half-up to kopecks, for reports.
pub fn markup(price: Decimal, multiplier: Decimal) -> Result<Decimal> {
    Ok(marked_up(price, multiplier)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Marked-up price as submitted: whole units, rounded half-up from the
/// exact product.
pub fn wire_price(price: Decimal, multiplier: Decimal) -> Result<u64> {
    let exact = marked_up(price, multiplier)?;
    exact
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or_else(|| SyncError::data("price", format!("{exact} cannot be submitted")))
}

#[cfg(test)]
#[path = "pricing_tests.rs"]
mod tests;
