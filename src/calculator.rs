//! Calculation pipeline
//!
//! `calculate` is a pure function of its request and market data: it builds
//! a fresh timeline and simulator state on every call, so repeated runs with
//! the same inputs give identical results and nothing carries over between
//! requests.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregator::{aggregate, ReturnSummary};
use crate::error::DripError;
use crate::models::{LotKind, MarketData, PurchaseLot};
use crate::simulator::{simulate, LedgerEntry, SimulationWarning};
use crate::timeline::{build_timeline, include_lots};
use crate::utils::{round_currency, round_shares};

/// User input for one calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub ticker: String,
    pub initial_lot: PurchaseLot,
    #[serde(default)]
    pub additional_lots: Vec<PurchaseLot>,
    pub drip_enabled: bool,
}

impl CalculationRequest {
    pub fn new(ticker: impl Into<String>, initial_lot: PurchaseLot, drip_enabled: bool) -> Self {
        Self {
            ticker: ticker.into(),
            initial_lot,
            additional_lots: Vec::new(),
            drip_enabled,
        }
    }

    pub fn with_lot(mut self, lot: PurchaseLot) -> Self {
        self.additional_lots.push(lot);
        self
    }

    /// First date on which any lot was bought; market data is needed from here on
    ///
    /// Uses the same inclusion rules as the calculation itself. `None` when
    /// no lot takes part or the lots are invalid.
    pub fn earliest_purchase_date(&self) -> Option<NaiveDate> {
        include_lots(&self.initial_lot, &self.additional_lots)
            .ok()?
            .iter()
            .map(|lot| lot.date)
            .min()
    }
}

/// The result record, rounded for presentation and export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentResult {
    pub ticker: String,
    pub initial_purchase_date: Option<NaiveDate>,
    pub drip_enabled: bool,
    pub initial_shares: Decimal,
    pub additional_shares: Decimal,
    pub dripped_shares: Decimal,
    /// Always `initial_shares + additional_shares + dripped_shares`
    pub total_shares: Decimal,
    pub total_cost_basis: Decimal,
    pub current_price: Decimal,
    pub current_value: Decimal,
    pub total_dividends: Decimal,
    pub total_gain_loss: Decimal,
    pub total_gain_loss_pct: Decimal,
    pub dividend_count: usize,
}

impl InvestmentResult {
    fn from_summary(
        request: &CalculationRequest,
        initial_shares: Decimal,
        additional_shares: Decimal,
        dividend_count: usize,
        summary: &ReturnSummary,
    ) -> Result<Self, DripError> {
        let initial_shares = round_shares(initial_shares);
        let additional_shares = round_shares(additional_shares);
        let dripped_shares = round_shares(summary.dripped_shares);
        let total_shares = initial_shares
            .checked_add(additional_shares)
            .and_then(|shares| shares.checked_add(dripped_shares))
            .ok_or_else(|| DripError::overflow("total shares"))?;

        Ok(Self {
            ticker: request.ticker.clone(),
            initial_purchase_date: request.initial_lot.date,
            drip_enabled: request.drip_enabled,
            initial_shares,
            additional_shares,
            dripped_shares,
            total_shares,
            total_cost_basis: round_currency(summary.cost_basis),
            current_price: round_currency(summary.current_price),
            current_value: round_currency(summary.current_value),
            total_dividends: round_currency(summary.total_dividends),
            total_gain_loss: round_currency(summary.total_gain_loss),
            total_gain_loss_pct: round_currency(summary.total_gain_loss_pct),
            dividend_count,
        })
    }
}

/// Everything one calculation produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calculation {
    pub result: InvestmentResult,
    pub summary: ReturnSummary,
    pub ledger: Vec<LedgerEntry>,
    pub warnings: Vec<SimulationWarning>,
}

/// Run timeline builder, DRIP simulator and return aggregator for one request.
///
/// Fails when the price series is empty, when a lot or dividend carries
/// negative values, or when an amount outgrows `Decimal`. A dividend without
/// a usable price only shows up as a warning.
pub fn calculate(
    request: &CalculationRequest,
    market: &MarketData,
) -> Result<Calculation, DripError> {
    let latest = market
        .prices
        .latest()
        .ok_or_else(|| DripError::EmptyPriceSeries {
            ticker: request.ticker.clone(),
        })?;

    let lots = include_lots(&request.initial_lot, &request.additional_lots)?;
    let timeline = build_timeline(&lots, &market.dividends)?;
    debug!(
        "Timeline for {}: {} events ({} dividends)",
        request.ticker,
        timeline.len(),
        timeline.dividend_count()
    );

    let outcome = simulate(&timeline, &market.prices, request.drip_enabled)?;
    let summary = aggregate(&outcome.state, latest.close, &lots)?;

    let (initial_shares, additional_shares) = lots.iter().try_fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(init, add), lot| {
            let sum = match lot.kind {
                LotKind::Initial => init.checked_add(lot.shares).map(|init| (init, add)),
                LotKind::Additional => add.checked_add(lot.shares).map(|add| (init, add)),
            };
            sum.ok_or_else(|| DripError::overflow(format!("share count at lot #{}", lot.index)))
        },
    )?;

    let result = InvestmentResult::from_summary(
        request,
        initial_shares,
        additional_shares,
        outcome.ledger.len(),
        &summary,
    )?;

    info!(
        "{}: {} shares, value {}, dividends {}, gain {} ({}%)",
        result.ticker,
        result.total_shares,
        result.current_value,
        result.total_dividends,
        result.total_gain_loss,
        result.total_gain_loss_pct
    );

    Ok(Calculation {
        result,
        summary,
        ledger: outcome.ledger,
        warnings: outcome.warnings,
    })
}
