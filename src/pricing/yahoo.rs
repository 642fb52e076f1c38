use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::YahooConfig;
use crate::error::DripError;
use crate::models::{DividendEvent, MarketData, PricePoint, PriceSeries};

/// Yahoo Finance chart response
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
    events: Option<Events>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    currency: Option<String>,
    /// Exchange offset from UTC in seconds
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct Events {
    dividends: Option<HashMap<String, DividendRecord>>,
}

#[derive(Debug, Deserialize)]
struct DividendRecord {
    amount: f64,
    date: i64,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

fn pricing_error(message: impl Into<String>) -> anyhow::Error {
    DripError::Pricing(message.into()).into()
}

/// Build the chart URL for daily closes and dividend events from `from` until now
pub fn chart_url(base_url: &str, ticker: &str, from: NaiveDate, to: NaiveDate) -> Result<String> {
    let from_timestamp = from
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| pricing_error("Invalid from date"))?
        .and_utc()
        .timestamp();
    let to_timestamp = to
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| pricing_error("Invalid to date"))?
        .and_utc()
        .timestamp();

    Ok(format!(
        "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=div",
        base_url.trim_end_matches('/'),
        ticker,
        from_timestamp,
        to_timestamp
    ))
}

/// Fetch daily closes and dividends for `ticker` from `from` until today.
///
/// The ticker is used as given (e.g. `AAPL`, `VOD.L`).
pub async fn fetch_market_data(
    ticker: &str,
    from: NaiveDate,
    config: &YahooConfig,
) -> Result<MarketData> {
    let today = Utc::now().date_naive();
    let url = chart_url(&config.base_url, ticker, from, today)?;
    info!("Fetching history for {} since {} from Yahoo Finance", ticker, from);
    debug!("GET {}", url);

    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to send request to Yahoo Finance")?;

    if !response.status().is_success() {
        return Err(pricing_error(format!(
            "Yahoo Finance returned error status: {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .await
        .context("Failed to read Yahoo Finance response")?;

    parse_chart_response(&body)
}

/// Parse a chart response body into market data.
pub fn parse_chart_response(body: &str) -> Result<MarketData> {
    let data: YahooChartResponse =
        serde_json::from_str(body).context("Failed to parse Yahoo Finance response")?;

    if let Some(error) = data.chart.error {
        return Err(pricing_error(format!(
            "Yahoo Finance API error: {} - {}",
            error.code, error.description
        )));
    }

    let result = data
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| pricing_error("No data returned from Yahoo Finance"))?;

    let offset = result.meta.gmtoffset.unwrap_or(0);
    if let Some(currency) = &result.meta.currency {
        debug!("Quote currency: {}", currency);
    }

    // A ticker with no trades in the range comes back without timestamps
    let timestamps = result.timestamp.unwrap_or_default();
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .and_then(|q| q.close)
        .unwrap_or_default();

    let mut points = Vec::with_capacity(timestamps.len());
    for (i, &timestamp) in timestamps.iter().enumerate() {
        let date = exchange_date(timestamp, offset)?;
        let Some(close) = closes.get(i).copied().flatten() else {
            debug!("No close for {}, skipping", date);
            continue;
        };
        match Decimal::try_from(close) {
            Ok(close) => points.push(PricePoint::new(date, close)),
            Err(_) => warn!("Unrepresentable close {} on {}, skipping", close, date),
        }
    }

    let mut dividends = Vec::new();
    for record in result
        .events
        .and_then(|e| e.dividends)
        .unwrap_or_default()
        .into_values()
    {
        let date = exchange_date(record.date, offset)?;
        let amount = Decimal::try_from(record.amount)
            .map_err(|_| pricing_error(format!("Invalid dividend amount {}", record.amount)))?;
        dividends.push(DividendEvent::new(date, amount));
    }

    debug!(
        "Parsed {} closes and {} dividends",
        points.len(),
        dividends.len()
    );
    Ok(MarketData::new(PriceSeries::new(points), dividends))
}

fn exchange_date(timestamp: i64, gmtoffset: i64) -> Result<NaiveDate> {
    chrono::DateTime::from_timestamp(timestamp + gmtoffset, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| pricing_error(format!("Invalid timestamp {}", timestamp)))
}
