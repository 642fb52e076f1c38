//! Combined CSV report: one summary row followed by the dividend ledger.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use rust_decimal::Decimal;
use tracing::info;

use crate::calculator::Calculation;
use crate::utils::{round_currency, round_shares};

const SUMMARY_HEADER: [&str; 12] = [
    "Ticker",
    "Initial Purchase Date",
    "Initial Shares",
    "Additional Shares",
    "DRIP Shares",
    "Total Shares",
    "Total Cost Basis",
    "Current Price",
    "Current Value",
    "Total Dividends",
    "Total Gain/Loss",
    "Total Gain/Loss %",
];

const LEDGER_HEADER: [&str; 6] = [
    "Date",
    "Dividend Per Share",
    "Shares at Time",
    "Total Dividends",
    "Reference Price",
    "Shares Reinvested",
];

/// `{TICKER}_investment_report.csv`
pub fn default_export_file_name(ticker: &str) -> String {
    format!("{}_investment_report.csv", ticker.to_uppercase())
}

fn plain(value: Decimal) -> String {
    value.normalize().to_string()
}

fn section(rows: impl FnOnce(&mut Writer<Vec<u8>>) -> csv::Result<()>) -> Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    rows(&mut writer).context("Failed to write CSV rows")?;
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e))?;
    Ok(String::from_utf8(bytes)?)
}

/// Render the full report as CSV text
pub fn to_csv(calculation: &Calculation) -> Result<String> {
    let r = &calculation.result;

    let summary = section(|w| {
        w.write_record(SUMMARY_HEADER)?;
        w.write_record([
            r.ticker.clone(),
            r.initial_purchase_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            plain(r.initial_shares),
            plain(r.additional_shares),
            plain(r.dripped_shares),
            plain(r.total_shares),
            format!("{:.2}", r.total_cost_basis),
            format!("{:.2}", r.current_price),
            format!("{:.2}", r.current_value),
            format!("{:.2}", r.total_dividends),
            format!("{:.2}", r.total_gain_loss),
            format!("{:.2}", r.total_gain_loss_pct),
        ])
    })?;

    let ledger = section(|w| {
        w.write_record(LEDGER_HEADER)?;
        for entry in &calculation.ledger {
            w.write_record([
                entry.date.format("%Y-%m-%d").to_string(),
                plain(entry.amount_per_share),
                plain(round_shares(entry.shares_held_at_event)),
                plain(round_shares(entry.cash_received)),
                entry
                    .reference_price
                    .map(|p| plain(round_currency(p)))
                    .unwrap_or_default(),
                plain(round_shares(entry.reinvested_shares)),
            ])?;
        }
        Ok(())
    })?;

    Ok(format!(
        "INVESTMENT SUMMARY\n{}\nDIVIDEND DETAILS\n{}",
        summary, ledger
    ))
}

/// Write the report to `path`, or to the default file name in the current
/// directory when `path` is `None`. Returns the path written.
pub fn write_csv(calculation: &Calculation, path: Option<&Path>) -> Result<PathBuf> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(default_export_file_name(&calculation.result.ticker)));
    let content = to_csv(calculation)?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!("Report exported to {:?}", path);
    Ok(path)
}
