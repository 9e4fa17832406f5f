use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// ISO code of the only currency the ledger holds.
pub const CURRENCY_CODE: &str = "NGN";

/// Number of minor units (kobo) in one naira.
pub const MINOR_PER_MAJOR: i64 = 100;

/// Money amount represented as **integer kobo**.
///
/// Balances, fees and transaction amounts are stored as plain `i64` kobo;
/// this type carries one across error reports and operator-facing output.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!(Money::new(12_34).to_string(), "₦12.34");
/// assert_eq!(Money::from_major(1000).minor(), 100_000);
/// assert_eq!("1500.5".parse::<Money>().unwrap().minor(), 150_050);
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Creates an amount from whole naira.
    #[must_use]
    pub const fn from_major(major: i64) -> Self {
        Self(major * MINOR_PER_MAJOR)
    }

    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let naira = abs / MINOR_PER_MAJOR as u64;
        let kobo = abs % MINOR_PER_MAJOR as u64;
        write!(f, "{sign}₦{naira}.{kobo:02}")
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a non-negative naira amount such as `1500`, `1500.5` or
    /// `1,500.50` into kobo. Thousands separators are dropped; at most two
    /// decimals are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::Validation(format!("invalid amount: {s:?}"));

        let digits: String = s.trim().trim_start_matches('₦').replace(',', "");
        let (major, kobo) = match digits.split_once('.') {
            Some((major, kobo)) => (major, kobo),
            None => (digits.as_str(), ""),
        };
        if major.is_empty() || !major.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if kobo.len() > 2 || !kobo.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let major: i64 = major.parse().map_err(|_| invalid())?;
        let kobo: i64 = format!("{kobo:0<2}").parse().map_err(|_| invalid())?;
        major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|minor| minor.checked_add(kobo))
            .map(Money)
            .ok_or_else(|| EngineError::Validation("amount too large".to_string()))
    }
}
