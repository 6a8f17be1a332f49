//! Money arithmetic
//!
//! Prices are fixed-point [`Decimal`] amounts with two fractional digits.
//! Every stored amount goes through [`round_price`] so that totals computed
//! at order creation and amounts charged at the gateway agree exactly.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Fractional digits kept for every stored amount
pub const PRICE_SCALE: u32 = 2;

/// Highest listing price accepted.
///
/// `MAX_PRICE × u32::MAX` in cents still fits an `i64`, so a line total can
/// always be charged.
pub const MAX_PRICE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 2);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),

    #[error("amount has more than {PRICE_SCALE} fractional digits: {0}")]
    SubMinorUnit(Decimal),

    #[error("amount does not fit in minor units: {0}")]
    Overflow(Decimal),

    #[error("price exceeds the maximum of {MAX_PRICE}: {0}")]
    TooLarge(Decimal),
}

/// Round to two decimal places, half away from zero.
pub fn round_price(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate and normalize a listing price.
pub fn normalize_price(price: Decimal) -> Result<Decimal, MoneyError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(MoneyError::Negative(price));
    }
    let price = round_price(price);
    if price > MAX_PRICE {
        return Err(MoneyError::TooLarge(price));
    }
    Ok(price)
}

/// `unit_price × quantity`, rounded with the price rule.
pub fn line_total(unit_price: Decimal, quantity: u32) -> Result<Decimal, MoneyError> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .map(round_price)
        .ok_or(MoneyError::Overflow(unit_price))
}

/// Exact sum of line totals.
pub fn sum_totals<I>(totals: I) -> Result<Decimal, MoneyError>
where
    I: IntoIterator<Item = Decimal>,
{
    totals
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, t| {
            acc.checked_add(t).ok_or(MoneyError::Overflow(t))
        })
        .map(round_price)
}

/// Convert a major-unit amount to integer minor units (cents).
///
/// Scaling is exact: an amount with sub-cent digits is rejected rather than
/// rounded, so the gateway is never asked to charge a different figure than
/// the one stored on the order.
pub fn to_minor_units(amount: Decimal) -> Result<i64, MoneyError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MoneyError::Negative(amount));
    }
    let scaled = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(MoneyError::Overflow(amount))?;
    if !scaled.fract().is_zero() {
        return Err(MoneyError::SubMinorUnit(amount));
    }
    scaled.trunc().to_i64().ok_or(MoneyError::Overflow(amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round_price_half_away_from_zero() {
        assert_eq!(round_price(d("1.005")), d("1.01"));
        assert_eq!(round_price(d("1.004")), d("1.00"));
        assert_eq!(round_price(d("45")), d("45"));
    }

    #[test]
    fn test_normalize_price_rejects_negative() {
        assert_eq!(
            normalize_price(d("-0.01")),
            Err(MoneyError::Negative(d("-0.01")))
        );
        assert_eq!(normalize_price(d("0")), Ok(d("0")));
        assert_eq!(normalize_price(d("19.999")), Ok(d("20.00")));
    }

    #[test]
    fn test_normalize_price_caps_listing_price() {
        assert_eq!(normalize_price(d("1000000.00")), Ok(MAX_PRICE));
        assert!(matches!(
            normalize_price(d("1000000.01")),
            Err(MoneyError::TooLarge(_))
        ));
        assert!(matches!(
            normalize_price(Decimal::MAX),
            Err(MoneyError::TooLarge(_))
        ));
    }

    #[test]
    fn test_max_price_line_is_chargeable() {
        let total = line_total(MAX_PRICE, u32::MAX).unwrap();
        assert!(to_minor_units(total).is_ok());
    }

    #[test]
    fn test_line_totals_sum_exactly() {
        // 0.1 + 0.2 style drift must not appear
        let totals = vec![
            line_total(d("0.10"), 1).unwrap(),
            line_total(d("0.20"), 1).unwrap(),
        ];
        assert_eq!(sum_totals(totals), Ok(d("0.30")));

        assert_eq!(line_total(d("12.34"), 3), Ok(d("37.02")));
    }

    #[test]
    fn test_arithmetic_overflow_is_an_error() {
        let half = Decimal::MAX / Decimal::TWO;
        assert!(matches!(line_total(half, 3), Err(MoneyError::Overflow(_))));
        assert!(matches!(
            sum_totals([half, half, half]),
            Err(MoneyError::Overflow(_))
        ));
    }

    #[test]
    fn test_to_minor_units_exact() {
        assert_eq!(to_minor_units(d("45.00")), Ok(4500));
        assert_eq!(to_minor_units(d("0.29")), Ok(29));
        assert_eq!(to_minor_units(d("19.99")), Ok(1999));
        assert_eq!(to_minor_units(d("0")), Ok(0));
    }

    #[test]
    fn test_to_minor_units_rejects_fractions_of_a_cent() {
        assert_eq!(
            to_minor_units(d("1.005")),
            Err(MoneyError::SubMinorUnit(d("1.005")))
        );
        assert!(matches!(
            to_minor_units(d("-1")),
            Err(MoneyError::Negative(_))
        ));
    }
}
