//! Error handling for dripcalc
//!
//! Structural failures (bad lot input, no price data) are typed so callers
//! can match on them. Everything above the core uses anyhow for context
//! chaining and error propagation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Core error types for a return calculation
#[derive(Error, Debug)]
pub enum DripError {
    /// Negative share count or price on a lot that takes part in the calculation.
    /// `index` is 0 for the initial lot and n for the n-th additional lot.
    #[error("invalid lot #{index}: {reason}")]
    InvalidLot { index: usize, reason: String },

    #[error("invalid dividend on {date}: amount per share is negative ({amount})")]
    InvalidDividend { date: NaiveDate, amount: Decimal },

    #[error("no price data available for {ticker}")]
    EmptyPriceSeries { ticker: String },

    #[error("pricing error: {0}")]
    Pricing(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Config(String),

    /// An intermediate amount does not fit in a `Decimal`
    #[error("amount out of range: {0}")]
    Overflow(String),
}

impl DripError {
    pub fn overflow(what: impl Into<String>) -> Self {
        DripError::Overflow(what.into())
    }
}

/// Result type alias for application-level operations
pub type Result<T> = anyhow::Result<T>;
