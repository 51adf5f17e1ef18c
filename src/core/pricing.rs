//! Quantity normalization and money arithmetic for order lines.
//!
//! Quantities depend on the item's unit: pieces are whole numbers, weights
//! keep gram precision. Money is kept in whole currency units (rupiah); each
//! line is rounded before lines are summed.
//!
//! Values are stored as `f64` but every calculation here runs in
//! [`Decimal`], converting only at the edges.

use crate::{
    entities::Unit,
    errors::{Error, Result},
};
use rust_decimal::prelude::*;
use serde::Serialize;

/// Decimal places kept for `KG` quantities
pub const KG_DECIMALS: u32 = 3;

/// Decimal places kept for money (whole rupiah)
pub const MONEY_DECIMALS: u32 = 0;

/// Converts a stored `f64` to [`Decimal`].
///
/// Inputs are validated as finite before they get here; anything that
/// still cannot be represented is logged and treated as zero.
#[inline]
#[must_use]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(value = ?value, "Non-finite f64 in order arithmetic, using zero");
        Decimal::ZERO
    })
}

/// Converts a [`Decimal`] back to `f64` for storage.
#[inline]
#[must_use]
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn round_half_up(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Normalizes a requested quantity for the given unit.
///
/// `PCS` truncates to a whole number, `KG` rounds half away from zero to
/// [`KG_DECIMALS`] places. Negative, zero and non-finite input all
/// normalize to `0.0`.
#[must_use]
pub fn normalize_quantity(unit: Unit, quantity: f64) -> f64 {
    if !quantity.is_finite() || quantity <= 0.0 {
        return 0.0;
    }

    let quantity = to_decimal(quantity);
    let normalized = match unit {
        Unit::Pcs => quantity.trunc(),
        Unit::Kg => round_half_up(quantity, KG_DECIMALS),
    };
    to_f64(normalized)
}

/// Rounded total for one line.
#[must_use]
pub fn line_total(quantity: f64, price: f64) -> f64 {
    let total = to_decimal(quantity).saturating_mul(to_decimal(price));
    to_f64(round_half_up(total, MONEY_DECIMALS))
}

/// Sums stored amounts without picking up binary rounding noise.
#[must_use]
pub fn sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    to_f64(
        values
            .into_iter()
            .map(to_decimal)
            .fold(Decimal::ZERO, Decimal::saturating_add),
    )
}

/// Checks that an amount is finite and not negative.
pub fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

/// Header money fields derived from the lines
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    /// Sum of rounded line totals
    pub subtotal: f64,
    /// Flat discount
    pub discount: f64,
    /// Shipping (seller orders only)
    pub delivery_fee: f64,
    /// `max(0, subtotal - discount + delivery_fee)`
    pub total: f64,
}

/// Derives header totals; the total never goes below zero.
#[must_use]
pub fn compute_totals(subtotal: f64, discount: f64, delivery_fee: f64) -> Totals {
    let total = to_decimal(subtotal)
        .saturating_sub(to_decimal(discount))
        .saturating_add(to_decimal(delivery_fee))
        .max(Decimal::ZERO);
    Totals {
        subtotal,
        discount,
        delivery_fee,
        total: to_f64(total),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_pcs_truncates() {
        assert_eq!(normalize_quantity(Unit::Pcs, 2.9), 2.0);
        assert_eq!(normalize_quantity(Unit::Pcs, 0.5), 0.0);
        assert_eq!(normalize_quantity(Unit::Pcs, 7.0), 7.0);
    }

    #[test]
    fn test_kg_rounds_to_grams() {
        assert_eq!(normalize_quantity(Unit::Kg, 1.23456), 1.235);
        assert_eq!(normalize_quantity(Unit::Kg, 0.1 + 0.2), 0.3);
        assert_eq!(normalize_quantity(Unit::Kg, 0.0004), 0.0);
    }

    #[test]
    fn test_kg_half_gram_rounds_up() {
        // 0.5005 is stored as 0.50049999... in binary
        assert_eq!(normalize_quantity(Unit::Kg, 0.5005), 0.501);
        assert_eq!(normalize_quantity(Unit::Kg, 1.0005), 1.001);
        assert_eq!(normalize_quantity(Unit::Kg, 2.0015), 2.002);
    }

    #[test]
    fn test_invalid_quantities_become_zero() {
        assert_eq!(normalize_quantity(Unit::Pcs, -3.0), 0.0);
        assert_eq!(normalize_quantity(Unit::Kg, -0.5), 0.0);
        assert_eq!(normalize_quantity(Unit::Kg, f64::NAN), 0.0);
        assert_eq!(normalize_quantity(Unit::Pcs, f64::INFINITY), 0.0);
    }

    #[test]
    fn test_line_total_rounds_each_line() {
        // 1.235 kg at 12_345 = 15_246.075
        assert_eq!(line_total(1.235, 12_345.0), 15_246.0);
        assert_eq!(line_total(3.0, 5_000.0), 15_000.0);
    }

    #[test]
    fn test_line_total_half_rupiah_rounds_up() {
        // 0.043 x 2_500 = 107.5 exactly, which f64 computes as 107.49999...
        assert_eq!(line_total(0.043, 2_500.0), 108.0);
        assert_eq!(line_total(0.145, 1_500.0), 218.0);
    }

    #[test]
    fn test_sum_has_no_float_noise() {
        assert_eq!(sum([0.1, 0.2]), 0.3);
        assert_eq!(sum([10_000.0, 2_500.0, 0.0]), 12_500.0);
        assert_eq!(sum(Vec::new()), 0.0);
    }

    #[test]
    fn test_total_is_floored_at_zero() {
        let totals = compute_totals(10_000.0, 25_000.0, 0.0);
        assert_eq!(totals.total, 0.0);

        let totals = compute_totals(10_000.0, 2_000.0, 0.0);
        assert_eq!(totals.total, 8_000.0);
    }

    #[test]
    fn test_delivery_fee_is_added() {
        let totals = compute_totals(10_000.0, 2_000.0, 5_000.0);
        assert_eq!(totals.total, 13_000.0);
        assert_eq!(totals.subtotal, 10_000.0);
        assert_eq!(totals.delivery_fee, 5_000.0);

        let totals = compute_totals(0.3, 0.1, 0.0);
        assert_eq!(totals.total, 0.2);
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(0.0).is_ok());
        assert!(validate_amount(1_500.0).is_ok());
        assert!(matches!(
            validate_amount(-1.0),
            Err(Error::InvalidAmount { amount: -1.0 })
        ));
        assert!(validate_amount(f64::NAN).is_err());
    }
}
