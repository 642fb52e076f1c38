//! Local CSV market data
//!
//! Price files carry `date,close`; dividend files carry `date,amount`.
//! Dates are `YYYY-MM-DD`. Header names are matched case-insensitively and a
//! few common aliases are accepted (`Close`, `Adj Close`, `Dividends`).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::DripError;
use crate::models::{DividendEvent, MarketData, PricePoint, PriceSeries};

pub fn load_market_data(prices: &Path, dividends: Option<&Path>) -> Result<MarketData> {
    let prices = read_prices(prices)?;
    let dividends = match dividends {
        Some(path) => read_dividends(path)?,
        None => Vec::new(),
    };
    Ok(MarketData::new(prices, dividends))
}

pub fn read_prices<P: AsRef<Path>>(path: P) -> Result<PriceSeries> {
    let rows = read_rows(path.as_ref(), &["close", "adj close", "price"])?;
    let points = rows
        .into_iter()
        .map(|row| PricePoint::new(row.date, row.value))
        .collect::<Vec<_>>();
    Ok(PriceSeries::new(points))
}

/// Negative amounts are rejected with the offending line number.
pub fn read_dividends<P: AsRef<Path>>(path: P) -> Result<Vec<DividendEvent>> {
    let path = path.as_ref();
    let rows = read_rows(path, &["amount", "dividend", "dividends"])?;
    rows.into_iter()
        .map(|row| -> Result<DividendEvent> {
            if row.value < Decimal::ZERO {
                return Err(DripError::Parse(format!(
                    "{} line {}: negative dividend amount '{}'",
                    path.display(),
                    row.line,
                    row.value
                ))
                .into());
            }
            Ok(DividendEvent::new(row.date, row.value))
        })
        .collect()
}

struct Row {
    line: usize,
    date: NaiveDate,
    value: Decimal,
}

/// Read `(date, value)` rows. Blank rows are skipped; malformed rows fail
/// with the line number so the file can be fixed.
fn read_rows(path: &Path, value_headers: &[&str]) -> Result<Vec<Row>> {
    info!("Reading market data CSV: {:?}", path);

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    let date_idx = find_column(&headers, &["date"])
        .ok_or_else(|| DripError::Parse(format!("{}: missing 'date' column", path.display())))?;
    let value_idx = find_column(&headers, value_headers).ok_or_else(|| {
        DripError::Parse(format!(
            "{}: missing value column (expected one of: {})",
            path.display(),
            value_headers.join(", ")
        ))
    })?;
    debug!("CSV columns: date={}, value={}", date_idx, value_idx);

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.context("Failed to read CSV record")?;
        let line = idx + 2;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let date_str = record.get(date_idx).unwrap_or_default();
        let value_str = record.get(value_idx).unwrap_or_default();
        if value_str.is_empty() || value_str.eq_ignore_ascii_case("null") {
            warn!("Skipping line {}: no value for {}", line, date_str);
            continue;
        }

        let date = parse_date(date_str).ok_or_else(|| {
            DripError::Parse(format!(
                "{} line {}: invalid date '{}', use YYYY-MM-DD",
                path.display(),
                line,
                date_str
            ))
        })?;
        let value = Decimal::from_str(value_str).map_err(|_| {
            DripError::Parse(format!(
                "{} line {}: invalid number '{}'",
                path.display(),
                line,
                value_str
            ))
        })?;
        rows.push(Row { line, date, value });
    }

    info!("Parsed {} rows from {:?}", rows.len(), path);
    Ok(rows)
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part
fn parse_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
