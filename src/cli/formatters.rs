//! Output formatting module for CLI display
//!
//! Keeps terminal presentation separate from the calculation itself.

use colored::Colorize;
use dripcalc::calculator::Calculation;
use dripcalc::utils::{format_currency, format_currency_precise, format_percent, format_shares};
use rust_decimal::Decimal;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl MetricRow {
    fn new(metric: &str, value: String) -> Self {
        Self {
            metric: metric.to_string(),
            value,
        }
    }
}

fn signed(text: String, value: Decimal) -> String {
    if value >= Decimal::ZERO {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

fn metric_table(rows: Vec<MetricRow>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());
    table.to_string()
}

/// Format a calculation for terminal table output
pub fn format_calculation_table(calculation: &Calculation) -> String {
    let r = &calculation.result;
    let mut output = String::new();

    let mode = if r.drip_enabled {
        "dividends reinvested"
    } else {
        "dividends kept as cash"
    };
    output.push_str(&format!(
        "\n{} {} Investment Summary ({})\n\n",
        "📈".cyan().bold(),
        r.ticker.bold(),
        mode
    ));

    let purchase_date = r
        .initial_purchase_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let summary = vec![
        MetricRow::new("Initial Purchase Date", purchase_date),
        MetricRow::new("Total Cost Basis", format_currency(r.total_cost_basis)),
        MetricRow::new("Current Price", format_currency(r.current_price)),
        MetricRow::new("Current Value", format_currency(r.current_value)),
        MetricRow::new("Total Dividends", format_currency(r.total_dividends)),
        MetricRow::new(
            "Total Gain/Loss",
            signed(format_currency(r.total_gain_loss), r.total_gain_loss),
        ),
        MetricRow::new(
            "Total Return",
            signed(format_percent(r.total_gain_loss_pct), r.total_gain_loss_pct),
        ),
    ];
    output.push_str(&metric_table(summary));

    output.push_str(&format!("\n\n{} Share Breakdown\n\n", "📊".cyan().bold()));
    let shares = vec![
        MetricRow::new("Initial Shares", format_shares(r.initial_shares)),
        MetricRow::new("Additional Shares", format_shares(r.additional_shares)),
        MetricRow::new("DRIP Shares", format_shares(r.dripped_shares)),
        MetricRow::new("Total Shares", format_shares(r.total_shares)),
    ];
    output.push_str(&metric_table(shares));

    output.push_str(&format!("\n\n{} Dividend History\n\n", "💰".cyan().bold()));
    if calculation.ledger.is_empty() {
        output.push_str("No dividend data available\n");
    } else {
        output.push_str(&format_ledger(calculation));
        output.push('\n');
    }

    if !calculation.warnings.is_empty() {
        output.push('\n');
        for warning in &calculation.warnings {
            output.push_str(&format!("{} {}\n", "⚠".yellow().bold(), warning));
        }
    }

    output
}

fn format_ledger(calculation: &Calculation) -> String {
    #[derive(Tabled)]
    struct LedgerRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Dividend/Share")]
        amount: String,
        #[tabled(rename = "Shares Held")]
        shares: String,
        #[tabled(rename = "Cash")]
        cash: String,
        #[tabled(rename = "Ref. Price")]
        price: String,
        #[tabled(rename = "Reinvested")]
        reinvested: String,
    }

    let drip = calculation.result.drip_enabled;
    let rows: Vec<LedgerRow> = calculation
        .ledger
        .iter()
        .map(|e| LedgerRow {
            date: e.date.format("%Y-%m-%d").to_string(),
            amount: format_currency_precise(e.amount_per_share),
            shares: format_shares(e.shares_held_at_event),
            cash: format_currency(e.cash_received),
            price: e
                .reference_price
                .map(format_currency)
                .unwrap_or_else(|| "N/A".to_string()),
            reinvested: if drip {
                format_shares(e.reinvested_shares)
            } else {
                "-".to_string()
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());
    table.to_string()
}
