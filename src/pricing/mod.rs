// Pricing module - market data providers for the calculation pipeline

pub mod csv_source;
pub mod yahoo;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::config::YahooConfig;
pub use crate::models::MarketData;

/// Where price and dividend history comes from.
///
/// Each `load` call fetches fresh data; nothing is shared between
/// calculations.
#[derive(Debug, Clone)]
pub enum MarketDataSource {
    Yahoo(YahooConfig),
    Files {
        prices: PathBuf,
        dividends: Option<PathBuf>,
    },
}

impl MarketDataSource {
    /// Load prices and dividends for `ticker`, with prices restricted to
    /// dates on or after `from`.
    pub async fn load(&self, ticker: &str, from: NaiveDate) -> Result<MarketData> {
        let market = match self {
            MarketDataSource::Yahoo(config) => yahoo::fetch_market_data(ticker, from, config)
                .await
                .with_context(|| format!("Yahoo Finance fetch failed for {}", ticker))?,
            MarketDataSource::Files { prices, dividends } => {
                csv_source::load_market_data(prices, dividends.as_deref())?
            }
        };

        let market = market.since(from);
        info!(
            "Loaded {} prices and {} dividends for {} since {}",
            market.prices.len(),
            market.dividends.len(),
            ticker,
            from
        );
        Ok(market)
    }

    pub fn describe(&self) -> String {
        match self {
            MarketDataSource::Yahoo(_) => "Yahoo Finance".to_string(),
            MarketDataSource::Files { prices, .. } => format!("{}", prices.display()),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, MarketDataSource::Yahoo(_))
    }
}
