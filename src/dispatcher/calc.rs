//! `calc` command: load market data, run the calculation, print or export it

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::cli::formatters::format_calculation_table;
use crate::cli::CalcArgs;
use dripcalc::calculator::{calculate, CalculationRequest};
use dripcalc::config::{Config, OFFLINE_ENV};
use dripcalc::models::{MarketData, PurchaseLot};
use dripcalc::pricing::MarketDataSource;
use dripcalc::reports;

fn build_request(args: &CalcArgs, config: &Config) -> CalculationRequest {
    let initial = PurchaseLot::new(args.date, args.shares, args.price);
    let drip_enabled = args.drip_enabled(config.drip);
    args.lots
        .iter()
        .cloned()
        .fold(CalculationRequest::new(&args.ticker, initial, drip_enabled), |request, lot| {
            request.with_lot(lot)
        })
}

fn select_source(args: &CalcArgs, config: &Config) -> Result<MarketDataSource> {
    match &args.prices {
        Some(prices) => Ok(MarketDataSource::Files {
            prices: prices.clone(),
            dividends: args.dividends.clone(),
        }),
        None if config.offline => bail!(
            "Offline mode ({}) is set; pass --prices to use local market data",
            OFFLINE_ENV
        ),
        None => Ok(MarketDataSource::Yahoo(config.yahoo.clone())),
    }
}

async fn load_with_spinner(
    source: &MarketDataSource,
    ticker: &str,
    from: chrono::NaiveDate,
    quiet: bool,
) -> Result<MarketData> {
    if quiet || !source.is_network() {
        return source.load(ticker, from).await;
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Fetching {} history from {}", ticker, source.describe()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = source.load(ticker, from).await;
    spinner.finish_and_clear();
    result
}

pub async fn dispatch_calc(args: CalcArgs, json_output: bool, config: &Config) -> Result<()> {
    let request = build_request(&args, config);
    let source = select_source(&args, config)?;

    let from = request
        .earliest_purchase_date()
        .or(request.initial_lot.date)
        .ok_or_else(|| anyhow!("No purchase date given"))?;
    info!(
        "Calculating {} from {} using {}",
        request.ticker,
        from,
        source.describe()
    );

    let market = load_with_spinner(&source, &request.ticker, from, json_output)
        .await
        .with_context(|| format!("Failed to load market data for {}", request.ticker))?;

    let calculation = calculate(&request, &market)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&calculation)?);
    } else {
        print!("{}", format_calculation_table(&calculation));
    }

    if let Some(path) = &args.export {
        let written = reports::write_csv(&calculation, path.as_deref())?;
        if json_output {
            info!("Report exported to {:?}", written);
        } else {
            println!(
                "\n{} Report exported to {}",
                "✓".green().bold(),
                written.display()
            );
        }
    }

    Ok(())
}
