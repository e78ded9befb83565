//! Money helpers
//!
//! Prices and totals are `rust_decimal::Decimal`, stored in SQLite as TEXT.

use crate::{Error, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a stored decimal column
pub fn from_db(value: &str) -> Result<Decimal> {
    Decimal::from_str(value)
        .map_err(|e| Error::Internal(format!("Failed to parse amount '{}': {}", value, e)))
}

/// Format a decimal for storage
pub fn to_db(value: &Decimal) -> String {
    value.normalize().to_string()
}

/// quantity × unit price; a product outside the decimal range is rejected
pub fn line_total(quantity: i64, unit_price: Decimal) -> Result<Decimal> {
    Decimal::from(quantity).checked_mul(unit_price).ok_or_else(|| {
        Error::InvalidInput(format!(
            "Line total overflows: {} x {}",
            quantity, unit_price
        ))
    })
}

/// Sum of amounts; an overflowing sum is rejected
pub fn checked_sum<I>(amounts: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| Error::InvalidInput("Invoice total overflows".to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_is_exact() {
        let price = Decimal::new(1999, 2);
        assert_eq!(line_total(3, price).unwrap(), Decimal::new(5997, 2));
        assert_eq!(line_total(0, price).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_line_total_overflow_is_an_error() {
        let price = Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0);
        let result = line_total(1_000_000_000_000, price);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(line_total(2, Decimal::MAX).is_err());
    }

    #[test]
    fn test_checked_sum() {
        let amounts = [Decimal::new(1000, 2), Decimal::new(2550, 2)];
        assert_eq!(checked_sum(amounts).unwrap(), Decimal::new(3550, 2));
        assert_eq!(checked_sum(Vec::<Decimal>::new()).unwrap(), Decimal::ZERO);
        assert!(matches!(
            checked_sum([Decimal::MAX, Decimal::ONE]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_storage_round_trip() {
        let price = Decimal::new(2500, 2);
        assert_eq!(to_db(&price), "25");
        assert_eq!(from_db(&to_db(&price)).unwrap(), price);
    }

    #[test]
    fn test_from_db_rejects_garbage() {
        assert!(from_db("ten dollars").is_err());
    }
}
