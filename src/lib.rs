//! dripcalc - dividend reinvestment and total return calculator
//!
//! Given purchase lots, a dividend history and daily closes, this library
//! replays the holding period event by event, optionally reinvesting each
//! dividend (DRIP), and reports the position's total return.

pub mod aggregator;
pub mod calculator;
pub mod config;
pub mod error;
pub mod models;
pub mod pricing;
pub mod reports;
pub mod simulator;
pub mod timeline;
pub mod utils;

pub use calculator::{calculate, Calculation, CalculationRequest, InvestmentResult};
pub use error::DripError;
pub use models::{DividendEvent, MarketData, PricePoint, PriceSeries, PurchaseLot};
