use crate::error::StoreError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use rust_decimal_macros::dec;
use std::fmt;

/// Number of decimal places every price is kept at.
pub const PRICE_SCALE: u32 = 2;

/// Largest price, line total or order total: ten digits, two of them decimals.
pub const MAX_PRICE: Decimal = dec!(99999999.99);

/// A non-negative monetary value with two decimal places.
///
/// This is a wrapper around `rust_decimal::Decimal`: values with more places
/// are rounded half away from zero on construction, and the scale is pinned
/// to two so that `10` renders as `10.00`. Values above [`MAX_PRICE`] are
/// rejected, and so is arithmetic that would leave that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, StoreError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(StoreError::validation("Price must not be negative"));
        }
        let price = Self::rounded(value);
        if price.0 > MAX_PRICE {
            return Err(StoreError::validation(format!(
                "Price must be at most {MAX_PRICE}"
            )));
        }
        Ok(price)
    }

    fn rounded(value: Decimal) -> Self {
        let mut value =
            value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(PRICE_SCALE);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Line total for `quantity` units at this price.
    pub fn times(self, quantity: Quantity) -> Result<Self, StoreError> {
        self.0
            .checked_mul(Decimal::from(quantity.get()))
            .ok_or_else(overflow)
            .and_then(Self::new)
            .map_err(|_| overflow())
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, StoreError> {
        self.0
            .checked_add(rhs.0)
            .ok_or_else(overflow)
            .and_then(Self::new)
            .map_err(|_| overflow())
    }

    /// Sum of `prices`, failing instead of leaving the price range.
    pub fn total<I: IntoIterator<Item = Self>>(prices: I) -> Result<Self, StoreError> {
        prices
            .into_iter()
            .try_fold(Self::ZERO, |total, price| total.checked_add(price))
    }
}

fn overflow() -> StoreError {
    StoreError::validation(format!("Total exceeds the maximum price of {MAX_PRICE}"))
}

impl TryFrom<Decimal> for Price {
    type Error = StoreError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A line quantity. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Result<Self, StoreError> {
        if value >= 1 {
            Ok(Self(value))
        } else {
            Err(StoreError::validation("Quantity must be at least 1"))
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, StoreError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| StoreError::validation("Quantity overflow"))
    }
}

impl TryFrom<u32> for Quantity {
    type Error = StoreError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
