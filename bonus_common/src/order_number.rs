//! Purchase order numbers.
//!
//! An order number is a non-empty string of ASCII digits whose Luhn checksum is zero. Anything else is rejected at the
//! boundary, so an [`OrderNumber`] value is always valid once constructed.
use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderNumberError {
    #[error("Order number is empty")]
    Empty,
    #[error("Order number contains a non-digit character '{ch}' at position {position}")]
    InvalidCharacter { position: usize, ch: char },
    #[error("Order number {0} fails the Luhn checksum")]
    ChecksumMismatch(String),
}

//--------------------------------------     OrderNumber     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Validates `raw` and wraps it. Leading and trailing whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, OrderNumberError> {
        let digits = raw.trim();
        if digits.is_empty() {
            return Err(OrderNumberError::Empty);
        }
        if let Some((position, ch)) = digits.chars().enumerate().find(|(_, c)| !c.is_ascii_digit()) {
            return Err(OrderNumberError::InvalidCharacter { position, ch });
        }
        if luhn_sum(digits) % 10 != 0 {
            return Err(OrderNumberError::ChecksumMismatch(digits.to_string()));
        }
        Ok(Self(digits.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Sums the digits from right to left, doubling every second digit and folding doubled values above 9.
/// The caller guarantees that `digits` only contains ASCII digits.
fn luhn_sum(digits: &str) -> u32 {
    digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum()
}

impl FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = OrderNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderNumber> for String {
    fn from(value: OrderNumber) -> Self {
        value.0
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
