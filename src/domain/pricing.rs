//! Fixed-point money helpers.
//!
//! Amounts are stored as integer cents and surfaced as two-decimal
//! `Decimal`s.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::DomainError;
use crate::models::order_item;

/// Largest menu price accepted (6 digits, 2 of them decimals).
pub const MAX_MENU_PRICE_CENTS: i64 = 999_999;

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Convert an amount with at most two decimal places into cents.
pub fn to_cents(amount: Decimal) -> Result<i64, DomainError> {
    let rounded = amount.round_dp(2);
    if rounded != amount {
        return Err(DomainError::validation(
            "Ensure that there are no more than 2 decimal places.",
        ));
    }
    (rounded * Decimal::ONE_HUNDRED)
        .trunc()
        .to_i64()
        .ok_or_else(|| DomainError::validation("Amount is out of range."))
}

/// Validate a catalog price and return it in cents.
pub fn menu_price_cents(price: Decimal) -> Result<i64, DomainError> {
    let cents =
        to_cents(price).map_err(|e| DomainError::field("price", e.to_string()))?;
    if cents < 0 {
        return Err(DomainError::field(
            "price",
            "Ensure this value is greater than or equal to 0.",
        ));
    }
    if cents > MAX_MENU_PRICE_CENTS {
        return Err(DomainError::field(
            "price",
            "Ensure that there are no more than 6 digits in total.",
        ));
    }
    Ok(cents)
}

/// Price of a line: unit price times quantity.
pub fn line_price_cents(unit_price_cents: i64, quantity: i32) -> i64 {
    unit_price_cents * i64::from(quantity)
}

/// Order total derived from the order's current lines.
pub fn order_total_cents<'a, I>(lines: I) -> i64
where
    I: IntoIterator<Item = &'a order_item::Model>,
{
    lines.into_iter().map(|line| line.price_cents).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn line(id: i32, price_cents: i64) -> order_item::Model {
        order_item::Model {
            id,
            order_id: 1,
            menu_item_id: id,
            quantity: 1,
            unit_price_cents: price_cents,
            price_cents,
        }
    }

    #[test]
    fn test_cents_conversion() {
        assert_eq!(to_cents(Decimal::from_str("8.99").unwrap()).unwrap(), 899);
        assert_eq!(to_cents(Decimal::from_str("12").unwrap()).unwrap(), 1200);
        assert_eq!(from_cents(1798).to_string(), "17.98");
        assert_eq!(from_cents(0).to_string(), "0.00");
    }

    #[test]
    fn test_rejects_sub_cent_amounts() {
        assert!(to_cents(Decimal::from_str("8.999").unwrap()).is_err());
    }

    #[test]
    fn test_menu_price_bounds() {
        assert!(menu_price_cents(Decimal::from_str("-0.01").unwrap()).is_err());
        assert!(menu_price_cents(Decimal::from_str("10000.00").unwrap()).is_err());
        assert_eq!(
            menu_price_cents(Decimal::from_str("9999.99").unwrap()).unwrap(),
            MAX_MENU_PRICE_CENTS
        );
        assert_eq!(menu_price_cents(Decimal::ZERO).unwrap(), 0);
    }

    #[test]
    fn test_line_and_total() {
        assert_eq!(line_price_cents(899, 2), 1798);
        assert_eq!(line_price_cents(999, 3), 2997);
        assert_eq!(order_total_cents(&[line(1, 1798), line(2, 499)]), 2297);
        assert_eq!(order_total_cents(Vec::<order_item::Model>::new().iter()), 0);
    }
}
