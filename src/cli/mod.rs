use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use dripcalc::error::DripError;
use dripcalc::models::PurchaseLot;

pub mod formatters;

#[derive(Parser)]
#[command(name = "dripcalc")]
#[command(version, about = "Dividend reinvestment (DRIP) and total return calculator")]
#[command(
    long_about = "Replay a stock position's purchases and dividends day by day, optionally reinvesting every dividend at the closing price, and report the total return."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Calculate the total return of a position
    Calc(CalcArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CalcArgs {
    /// Ticker symbol as the data source knows it (e.g. KO, VOD.L)
    pub ticker: String,

    /// Initial purchase date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    /// Shares bought in the initial purchase
    #[arg(long, allow_negative_numbers = true)]
    pub shares: Decimal,

    /// Price paid per share in the initial purchase
    #[arg(long, allow_negative_numbers = true)]
    pub price: Decimal,

    /// Additional purchase as DATE:SHARES:PRICE (repeatable)
    #[arg(long = "lot", value_name = "DATE:SHARES:PRICE", value_parser = parse_lot)]
    pub lots: Vec<PurchaseLot>,

    /// Reinvest dividends (default from config, normally on)
    #[arg(long, conflicts_with = "no_drip")]
    pub drip: bool,

    /// Keep dividends as cash
    #[arg(long = "no-drip")]
    pub no_drip: bool,

    /// Read closing prices from a CSV file (date,close) instead of Yahoo Finance
    #[arg(long, value_name = "FILE")]
    pub prices: Option<PathBuf>,

    /// Dividend CSV file (date,amount); only used with --prices
    #[arg(long, value_name = "FILE", requires = "prices")]
    pub dividends: Option<PathBuf>,

    /// Export the report to CSV ({TICKER}_investment_report.csv unless a path is given)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    pub export: Option<Option<PathBuf>>,
}

impl CalcArgs {
    /// Resolve the DRIP flag against the configured default
    pub fn drip_enabled(&self, default: bool) -> bool {
        if self.no_drip {
            false
        } else if self.drip {
            true
        } else {
            default
        }
    }
}

/// Parse `DATE:SHARES:PRICE`. Empty fields are left unset so the lot is
/// skipped, like a blank row in a purchase form.
pub fn parse_lot(value: &str) -> Result<PurchaseLot, DripError> {
    let parts: Vec<&str> = value.split(':').map(str::trim).collect();
    let [date, shares, price] = parts.as_slice() else {
        return Err(DripError::Parse(format!(
            "Invalid lot '{}'. Use DATE:SHARES:PRICE (e.g. 2024-03-01:5:58.20)",
            value
        )));
    };

    let date = if date.is_empty() {
        None
    } else {
        Some(NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
            DripError::Parse(format!("Invalid lot date '{}'. Use YYYY-MM-DD format.", date))
        })?)
    };

    Ok(PurchaseLot {
        date,
        shares: parse_amount(shares, "shares")?,
        price_per_share: parse_amount(price, "price")?,
    })
}

fn parse_amount(value: &str, field: &str) -> Result<Decimal, DripError> {
    if value.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(value)
        .map_err(|_| DripError::Parse(format!("Invalid lot {} '{}'", field, value)))
}
