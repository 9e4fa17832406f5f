//! The module contains the errors the ledger can throw.
//!
//! Every error raised after a unit of work has started aborts the unit: the
//! surrounding database transaction is dropped without commit, so no partial
//! write is ever observable.
//!
//! - [`Validation`] malformed input (missing field, non-positive amount).
//! - [`NotFound`] wallet, order, product, gig or transaction absent.
//! - [`InsufficientFunds`] a debit would drive a balance below zero.
//! - [`Unauthorized`] the actor does not own the resource.
//! - [`InvalidStateTransition`] the resource is not in a state that allows
//!   the operation.
//! - [`Concurrency`] the wallet row lock could not be acquired.
//! - [`Gateway`] the payment provider failed or its payload was rejected.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`NotFound`]: EngineError::NotFound
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`Unauthorized`]: EngineError::Unauthorized
//!  [`InvalidStateTransition`]: EngineError::InvalidStateTransition
//!  [`Concurrency`]: EngineError::Concurrency
//!  [`Gateway`]: EngineError::Gateway
use sea_orm::DbErr;
use thiserror::Error;

use crate::Money;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Insufficient funds: required {required}, available {available}, shortfall {shortfall}")]
    InsufficientFunds {
        required: Money,
        available: Money,
        shortfall: Money,
    },
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
    #[error("Concurrency error: {0}")]
    Concurrency(String),
    #[error("Payment gateway error: {0}")]
    Gateway(String),
    #[error(transparent)]
    Database(DbErr),
}

impl EngineError {
    /// Builds an [`EngineError::InsufficientFunds`] from the amount a unit
    /// needs and the amount the wallet holds.
    pub fn insufficient(required: i64, available: i64) -> Self {
        Self::InsufficientFunds {
            required: Money::new(required),
            available: Money::new(available),
            shortfall: Money::new((required - available).max(0)),
        }
    }
}

const LOCK_CONTENTION_MARKERS: [&str; 5] = [
    "database is locked",
    "database table is locked",
    "deadlock",
    "could not obtain lock",
    "lock wait timeout",
];

impl From<DbErr> for EngineError {
    fn from(value: DbErr) -> Self {
        let message = value.to_string().to_lowercase();
        if LOCK_CONTENTION_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
        {
            return Self::Concurrency(value.to_string());
        }
        Self::Database(value)
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (
                Self::InsufficientFunds {
                    required: r1,
                    available: a1,
                    shortfall: s1,
                },
                Self::InsufficientFunds {
                    required: r2,
                    available: a2,
                    shortfall: s2,
                },
            ) => r1 == r2 && a1 == a2 && s1 == s2,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::InvalidStateTransition(a), Self::InvalidStateTransition(b)) => a == b,
            (Self::Concurrency(a), Self::Concurrency(b)) => a == b,
            (Self::Gateway(a), Self::Gateway(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
