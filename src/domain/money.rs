use crate::error::RentalError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-negative monetary value.
///
/// Wraps `rust_decimal::Decimal` so deposits and prices can never be built
/// from a negative number. Subtraction is only available through
/// [`Balance::checked_debit`], which refuses to go below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Balance(Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, RentalError> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(RentalError::InvalidInput(format!(
                "amount must not be negative, got {value}"
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns the remaining balance after paying `amount`, or `None` when
    /// the balance does not cover it.
    pub fn checked_debit(self, amount: Balance) -> Option<Balance> {
        if self.0 >= amount.0 {
            Some(Self(self.0 - amount.0))
        } else {
            None
        }
    }

    /// Multiplies a per-unit price by a whole number of units. Fails with
    /// `InvalidInput` when the product does not fit in a `Decimal`.
    pub fn times(self, units: u32) -> Result<Balance, RentalError> {
        self.0
            .checked_mul(Decimal::from(units))
            .map(Self)
            .ok_or_else(|| overflow(format!("{self} x {units}")))
    }

    /// Adds two balances. Fails with `InvalidInput` on overflow.
    pub fn checked_add(self, amount: Balance) -> Result<Balance, RentalError> {
        self.0
            .checked_add(amount.0)
            .map(Self)
            .ok_or_else(|| overflow(format!("{self} + {amount}")))
    }
}

fn overflow(operation: String) -> RentalError {
    RentalError::InvalidInput(format!("amount out of range: {operation}"))
}

impl TryFrom<Decimal> for Balance {
    type Error = RentalError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Balance> for Decimal {
    fn from(balance: Balance) -> Self {
        balance.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A rental duration in whole days, always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct RentalLength(u32);

impl RentalLength {
    pub fn new(days: i64) -> Result<Self, RentalError> {
        if days <= 0 {
            return Err(RentalError::InvalidInput(format!(
                "rental length must be a positive number of days, got {days}"
            )));
        }
        u32::try_from(days).map(Self).map_err(|_| {
            RentalError::InvalidInput(format!("rental length of {days} days is too long"))
        })
    }

    pub fn days(&self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for RentalLength {
    type Error = RentalError;

    fn try_from(days: i64) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl From<RentalLength> for u32 {
    fn from(length: RentalLength) -> Self {
        length.0
    }
}
