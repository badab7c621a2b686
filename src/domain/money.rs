use crate::error::{OrderError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-negative monetary value.
///
/// Wraps `rust_decimal::Decimal` so order totals are exact; all arithmetic is
/// checked and reports overflow instead of wrapping or rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(OrderError::invalid(format!(
                "amount must not be negative: {}",
                value
            )));
        }
        Ok(Self(value.normalize()))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Exact sum. Fails instead of rounding when the result does not fit.
    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        let scale = self.0.scale().max(rhs.0.scale());
        let lhs = rescaled_mantissa(self.0, scale)?;
        let rhs = rescaled_mantissa(rhs.0, scale)?;
        let sum = lhs.checked_add(rhs).ok_or_else(overflow)?;
        Self::from_parts(sum, scale)
    }

    /// Multiplies a unit price by a quantity, exactly.
    pub fn checked_times(self, quantity: u32) -> Result<Self> {
        let product = self
            .0
            .mantissa()
            .checked_mul(i128::from(quantity))
            .ok_or_else(overflow)?;
        Self::from_parts(product, self.0.scale())
    }

    /// Builds `mantissa * 10^-scale`, dropping only trailing zeros to fit
    /// the 96-bit mantissa.
    fn from_parts(mut mantissa: i128, mut scale: u32) -> Result<Self> {
        loop {
            match Decimal::try_from_i128_with_scale(mantissa, scale) {
                Ok(value) => return Ok(Self(value.normalize())),
                Err(_) if scale > 0 && mantissa % 10 == 0 => {
                    mantissa /= 10;
                    scale -= 1;
                }
                Err(_) => return Err(overflow()),
            }
        }
    }
}

fn overflow() -> OrderError {
    OrderError::invalid("amount cannot be represented exactly")
}

fn rescaled_mantissa(value: Decimal, scale: u32) -> Result<i128> {
    10i128
        .checked_pow(scale - value.scale())
        .and_then(|factor| value.mantissa().checked_mul(factor))
        .ok_or_else(overflow)
}

impl TryFrom<Decimal> for Money {
    type Error = OrderError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
