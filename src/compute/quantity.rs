//! Decimal quantities with units.

use crate::analysis::units::{InvalidUnit, ParsedUnit};
use crate::compute::rates::RateTable;
use crate::store::Unit;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    #[error("unit mismatch: cannot combine '{left}' with '{right}'")]
    UnitMismatch { left: Unit, right: Unit },
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
    #[error(transparent)]
    InvalidUnit(#[from] InvalidUnit),
}

/// A magnitude with a canonical unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quantity {
    pub magnitude: Decimal,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(magnitude: Decimal, unit: impl Into<Unit>) -> Self {
        Self { magnitude, unit: unit.into() }
    }

    pub fn zero(unit: Unit) -> Self {
        Self { magnitude: Decimal::ZERO, unit }
    }

    /// Sums `self` and `other`, converting `other` into `self`'s unit when they differ.
    pub fn add(&self, other: &Quantity, rates: &RateTable) -> Result<Quantity, QuantityError> {
        let rhs = other.convert(&self.unit, rates)?;
        let magnitude = self.magnitude.checked_add(rhs.magnitude).ok_or(QuantityError::Overflow)?;
        Ok(Quantity { magnitude, unit: self.unit.clone() })
    }

    pub fn sub(&self, other: &Quantity, rates: &RateTable) -> Result<Quantity, QuantityError> {
        let rhs = other.convert(&self.unit, rates)?;
        let magnitude = self.magnitude.checked_sub(rhs.magnitude).ok_or(QuantityError::Overflow)?;
        Ok(Quantity { magnitude, unit: self.unit.clone() })
    }

    pub fn mul(&self, other: &Quantity) -> Result<Quantity, QuantityError> {
        let magnitude = self.magnitude.checked_mul(other.magnitude).ok_or(QuantityError::Overflow)?;
        let mut unit = ParsedUnit::parse(self.unit.as_str())?;
        unit.multiply(&ParsedUnit::parse(other.unit.as_str())?);
        Ok(Quantity { magnitude, unit: Unit(unit.canonical()) })
    }

    pub fn div(&self, other: &Quantity) -> Result<Quantity, QuantityError> {
        if other.magnitude.is_zero() {
            return Err(QuantityError::DivisionByZero);
        }
        let magnitude = self.magnitude.checked_div(other.magnitude).ok_or(QuantityError::Overflow)?;
        let mut unit = ParsedUnit::parse(self.unit.as_str())?;
        unit.divide(&ParsedUnit::parse(other.unit.as_str())?);
        Ok(Quantity { magnitude, unit: Unit(unit.canonical()) })
    }

    pub fn neg(&self) -> Quantity {
        Quantity { magnitude: -self.magnitude, unit: self.unit.clone() }
    }

    /// Expresses the quantity in `target` using a supplied rate. Rates are never inferred.
    pub fn convert(&self, target: &Unit, rates: &RateTable) -> Result<Quantity, QuantityError> {
        if &self.unit == target {
            return Ok(self.clone());
        }
        let rate = rates.rate(&self.unit, target).ok_or_else(|| QuantityError::UnitMismatch {
            left: target.clone(),
            right: self.unit.clone(),
        })?;
        let magnitude = self.magnitude.checked_mul(rate).ok_or(QuantityError::Overflow)?;
        Ok(Quantity { magnitude, unit: target.clone() })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.magnitude.normalize();
        if self.unit.is_dimensionless() {
            write!(f, "{}", magnitude)
        } else {
            write!(f, "{} {}", magnitude, self.unit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::rates::RateEntry;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn usd(m: Decimal) -> Quantity { Quantity::new(m, "USD") }

    #[test]
    fn test_add_mismatched_units_without_rate_fails() {
        let err = usd(dec!(1)).add(&Quantity::new(dec!(1), "EUR"), &RateTable::default()).unwrap_err();
        assert_eq!(
            err,
            QuantityError::UnitMismatch { left: Unit::from("USD"), right: Unit::from("EUR") }
        );
    }

    #[test]
    fn test_add_converts_rhs_into_lhs_unit() {
        let rates = RateTable::new(vec![RateEntry::new("EUR", "USD", dec!(1.10))]);
        let sum = usd(dec!(100)).add(&Quantity::new(dec!(50), "EUR"), &rates).unwrap();
        assert_eq!(sum, usd(dec!(155.00)));

        // The inverse of a supplied rate is usable too.
        let sum = Quantity::new(dec!(11), "EUR").add(&usd(dec!(11)), &rates).unwrap();
        assert_eq!(sum.unit, Unit::from("EUR"));
        assert_eq!(sum.magnitude.round_dp(2), dec!(21.00));
    }

    #[test]
    fn test_mul_and_div_combine_units() {
        let price = Quantity::new(dec!(12.50), "USD/share");
        let count = Quantity::new(dec!(40), "share");
        assert_eq!(price.mul(&count).unwrap(), usd(dec!(500.00)));

        let half = usd(dec!(300)).mul(&Quantity::new(dec!(0.5), Unit::dimensionless())).unwrap();
        assert_eq!(half, usd(dec!(150.0)));

        let ratio = usd(dec!(3)).div(&usd(dec!(4))).unwrap();
        assert_eq!(ratio, Quantity::new(dec!(0.75), Unit::dimensionless()));
    }

    #[test]
    fn test_div_by_zero_is_an_error() {
        let err = usd(dec!(3)).div(&Quantity::new(Decimal::ZERO, Unit::dimensionless())).unwrap_err();
        assert_eq!(err, QuantityError::DivisionByZero);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let err = usd(Decimal::MAX).add(&usd(Decimal::MAX), &RateTable::default()).unwrap_err();
        assert_eq!(err, QuantityError::Overflow);
    }

    #[test]
    fn test_display() {
        assert_eq!(usd(dec!(1500.00)).to_string(), "1500 USD");
        assert_eq!(Quantity::new(dec!(0.250), Unit::dimensionless()).to_string(), "0.25");
    }

    proptest! {
        #[test]
        fn prop_add_same_unit_sums_magnitudes(a in -1_000_000_000i64..1_000_000_000, b in -1_000_000_000i64..1_000_000_000, scale in 0u32..4) {
            let qa = Quantity::new(Decimal::new(a, scale), "USD");
            let qb = Quantity::new(Decimal::new(b, scale), "USD");
            let sum = qa.add(&qb, &RateTable::default()).unwrap();
            prop_assert_eq!(sum.magnitude, qa.magnitude + qb.magnitude);
            prop_assert_eq!(sum.unit, Unit::from("USD"));
        }

        #[test]
        fn prop_add_incompatible_units_fails(a in any::<i32>(), b in any::<i32>()) {
            let qa = Quantity::new(Decimal::from(a), "USD");
            let qb = Quantity::new(Decimal::from(b), "BTC");
            let is_mismatch = matches!(qa.add(&qb, &RateTable::default()), Err(QuantityError::UnitMismatch { .. }));
            prop_assert!(is_mismatch);
        }
    }
}
