//! Token amount type.
//!
//! Balances and prices are whole, non-negative token counts. Negative values
//! are unrepresentable; all arithmetic is checked.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A non-negative number of tokens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero amount constant.
    pub const ZERO: Self = Self(0);

    /// Maximum possible amount.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates an amount from a token count.
    #[must_use]
    pub const fn new(tokens: u64) -> Self {
        Self(tokens)
    }

    /// Returns the token count.
    #[must_use]
    pub const fn tokens(self) -> u64 {
        self.0
    }

    /// Checked addition. Returns `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked subtraction. Returns `None` on underflow.
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Returns true if this amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(tokens: u64) -> Self {
        Self(tokens)
    }
}

impl FromStr for Amount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('-') {
            return Err(CoreError::InvalidAmount("negative values not allowed".into()));
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| CoreError::InvalidAmount(format!("invalid number: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn checked_add_returns_none_on_overflow() {
        assert_eq!(Amount::MAX.checked_add(Amount::new(1)), None);
        assert_eq!(Amount::new(5).checked_add(Amount::new(3)), Some(Amount::new(8)));
    }

    #[test]
    fn checked_sub_returns_none_on_underflow() {
        assert_eq!(Amount::new(1).checked_sub(Amount::new(5)), None);
        assert_eq!(Amount::new(10).checked_sub(Amount::new(3)), Some(Amount::new(7)));
    }

    #[test_case("42", Some(42) ; "whole number")]
    #[test_case(" 7 ", Some(7) ; "surrounding whitespace")]
    #[test_case("0", Some(0) ; "zero")]
    #[test_case("-1", None ; "negative")]
    #[test_case("1.5", None ; "fractional")]
    #[test_case("abc", None ; "garbage")]
    fn from_str_cases(input: &str, expected: Option<u64>) {
        let parsed = input.parse::<Amount>().ok().map(Amount::tokens);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&Amount::new(100)).unwrap();
        assert_eq!(json, "100");
        let back: Amount = serde_json::from_str("40").unwrap();
        assert_eq!(back, Amount::new(40));
    }

    #[test]
    fn display_is_token_count() {
        assert_eq!(Amount::new(60).to_string(), "60");
    }
}
