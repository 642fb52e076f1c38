//! DRIP simulator
//!
//! Walks a [`Timeline`] once, carrying the running share balance and the
//! dividend totals. Every dividend is earned in cash; when reinvestment is
//! enabled the cash buys new shares at the close on the event date, or at
//! the latest close before it.
//!
//! A dividend with no usable reference price keeps its cash but buys no
//! shares. That is recorded as a [`SimulationWarning`] and the walk goes on.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::DripError;
use crate::models::{DividendEvent, PriceSeries};
use crate::timeline::{Timeline, TimelineEvent};

/// Accumulator carried through the timeline walk.
///
/// `shares_held == purchased_shares + reinvested_shares` after every step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationState {
    pub shares_held: Decimal,
    pub purchased_shares: Decimal,
    pub cash_dividends: Decimal,
    pub reinvested_shares: Decimal,
}

/// One row per dividend event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub amount_per_share: Decimal,
    /// Balance that earned the dividend, before this event's reinvestment
    pub shares_held_at_event: Decimal,
    pub cash_received: Decimal,
    /// Close used for reinvestment; `None` when DRIP is off or no price applied
    pub reference_price: Option<Decimal>,
    pub reinvested_shares: Decimal,
}

/// Per-event degradation; never aborts the simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimulationWarning {
    /// The dividend predates every entry in the price series
    MissingReferencePrice { date: NaiveDate, cash: Decimal },
    /// The candidate close was zero or negative
    NonPositiveReferencePrice {
        date: NaiveDate,
        price_date: NaiveDate,
        price: Decimal,
    },
}

impl SimulationWarning {
    pub fn date(&self) -> NaiveDate {
        match self {
            SimulationWarning::MissingReferencePrice { date, .. } => *date,
            SimulationWarning::NonPositiveReferencePrice { date, .. } => *date,
        }
    }
}

impl fmt::Display for SimulationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationWarning::MissingReferencePrice { date, cash } => write!(
                f,
                "no price on or before {}; dividend of {:.4} kept as cash",
                date, cash
            ),
            SimulationWarning::NonPositiveReferencePrice {
                date,
                price_date,
                price,
            } => write!(
                f,
                "close of {} on {} is not a usable price for the {} dividend; kept as cash",
                price, price_date, date
            ),
        }
    }
}

/// Final state plus everything recorded along the way
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationOutcome {
    pub state: SimulationState,
    pub ledger: Vec<LedgerEntry>,
    pub warnings: Vec<SimulationWarning>,
}

/// Stepwise simulator over a price series.
pub struct DripSimulator<'a> {
    prices: &'a PriceSeries,
    drip_enabled: bool,
    state: SimulationState,
    warnings: Vec<SimulationWarning>,
}

impl<'a> DripSimulator<'a> {
    pub fn new(prices: &'a PriceSeries, drip_enabled: bool) -> Self {
        Self {
            prices,
            drip_enabled,
            state: SimulationState::default(),
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn warnings(&self) -> &[SimulationWarning] {
        &self.warnings
    }

    /// Apply one event. Returns the ledger row for dividend events.
    ///
    /// Fails only when an amount no longer fits in a `Decimal`.
    pub fn apply(&mut self, event: &TimelineEvent) -> Result<Option<LedgerEntry>, DripError> {
        match event {
            TimelineEvent::Purchase {
                date,
                shares,
                lot_index,
            } => {
                let held = self.state.shares_held.checked_add(*shares);
                let purchased = self.state.purchased_shares.checked_add(*shares);
                let (Some(held), Some(purchased)) = (held, purchased) else {
                    return Err(DripError::overflow(format!(
                        "share balance after lot #{} on {}",
                        lot_index, date
                    )));
                };
                self.state.shares_held = held;
                self.state.purchased_shares = purchased;
                Ok(None)
            }
            TimelineEvent::Dividend(dividend) => self.apply_dividend(dividend).map(Some),
        }
    }

    fn apply_dividend(&mut self, dividend: &DividendEvent) -> Result<LedgerEntry, DripError> {
        let shares_at_event = self.state.shares_held;
        let cash = shares_at_event
            .checked_mul(dividend.amount_per_share)
            .ok_or_else(|| DripError::overflow(format!("dividend cash on {}", dividend.date)))?;
        self.state.cash_dividends = self
            .state
            .cash_dividends
            .checked_add(cash)
            .ok_or_else(|| DripError::overflow(format!("dividend total on {}", dividend.date)))?;

        let mut entry = LedgerEntry {
            date: dividend.date,
            amount_per_share: dividend.amount_per_share,
            shares_held_at_event: shares_at_event,
            cash_received: cash,
            reference_price: None,
            reinvested_shares: Decimal::ZERO,
        };

        if !self.drip_enabled {
            return Ok(entry);
        }

        let Some(price) = self.reference_price(dividend.date, cash) else {
            return Ok(entry);
        };

        let reinvest_overflow =
            || DripError::overflow(format!("reinvestment on {}", dividend.date));
        let new_shares = cash.checked_div(price).ok_or_else(reinvest_overflow)?;
        let held = self
            .state
            .shares_held
            .checked_add(new_shares)
            .ok_or_else(reinvest_overflow)?;
        let reinvested = self
            .state
            .reinvested_shares
            .checked_add(new_shares)
            .ok_or_else(reinvest_overflow)?;
        self.state.shares_held = held;
        self.state.reinvested_shares = reinvested;
        debug!(
            "Reinvested {} on {} at {} -> {} shares",
            cash, dividend.date, price, new_shares
        );

        entry.reference_price = Some(price);
        entry.reinvested_shares = new_shares;
        Ok(entry)
    }

    fn reference_price(&mut self, date: NaiveDate, cash: Decimal) -> Option<Decimal> {
        let warning = match self.prices.price_on_or_before(date) {
            Some(point) if point.close > Decimal::ZERO => return Some(point.close),
            Some(point) => SimulationWarning::NonPositiveReferencePrice {
                date,
                price_date: point.date,
                price: point.close,
            },
            None => SimulationWarning::MissingReferencePrice { date, cash },
        };
        warn!("Skipping reinvestment: {}", warning);
        self.warnings.push(warning);
        None
    }

    pub fn finish(self) -> (SimulationState, Vec<SimulationWarning>) {
        (self.state, self.warnings)
    }
}

/// Run the whole timeline in one pass.
pub fn simulate(
    timeline: &Timeline,
    prices: &PriceSeries,
    drip_enabled: bool,
) -> Result<SimulationOutcome, DripError> {
    let mut simulator = DripSimulator::new(prices, drip_enabled);
    let mut ledger = Vec::with_capacity(timeline.dividend_count());
    for event in timeline {
        if let Some(entry) = simulator.apply(event)? {
            ledger.push(entry);
        }
    }
    let (state, warnings) = simulator.finish();

    Ok(SimulationOutcome {
        state,
        ledger,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PricePoint, PurchaseLot};
    use crate::timeline::{build_timeline, include_lots};
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn prices() -> PriceSeries {
        PriceSeries::new(vec![
            PricePoint::new(d(2024, 1, 1), dec!(100)),
            PricePoint::new(d(2024, 1, 6), dec!(102)),
            PricePoint::new(d(2024, 1, 11), dec!(110)),
        ])
    }

    fn timeline(dividends: &[DividendEvent]) -> Timeline {
        let initial = PurchaseLot::new(d(2024, 1, 1), dec!(10), dec!(100));
        let lots = include_lots(&initial, &[]).unwrap();
        build_timeline(&lots, dividends).unwrap()
    }

    #[test]
    fn test_dividend_reinvested_at_same_day_close() {
        let t = timeline(&[DividendEvent::new(d(2024, 1, 11), dec!(1))]);
        let outcome = simulate(&t, &prices(), true).unwrap();

        assert_eq!(outcome.state.cash_dividends, dec!(10));
        assert_eq!(outcome.state.reinvested_shares, dec!(10) / dec!(110));
        assert_eq!(
            outcome.state.shares_held,
            dec!(10) + dec!(10) / dec!(110)
        );
        assert_eq!(outcome.ledger.len(), 1);
        assert_eq!(outcome.ledger[0].reference_price, Some(dec!(110)));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_dividend_uses_latest_prior_close() {
        let t = timeline(&[DividendEvent::new(d(2024, 1, 9), dec!(1.02))]);
        let outcome = simulate(&t, &prices(), true).unwrap();

        assert_eq!(outcome.ledger[0].reference_price, Some(dec!(102)));
        assert_eq!(outcome.state.reinvested_shares, dec!(0.1));
    }

    #[test]
    fn test_drip_disabled_banks_cash() {
        let t = timeline(&[
            DividendEvent::new(d(2024, 1, 6), dec!(1)),
            DividendEvent::new(d(2024, 1, 11), dec!(1)),
        ]);
        let outcome = simulate(&t, &prices(), false).unwrap();

        assert_eq!(outcome.state.shares_held, dec!(10));
        assert_eq!(outcome.state.cash_dividends, dec!(20));
        assert_eq!(outcome.state.reinvested_shares, Decimal::ZERO);
        assert!(outcome.ledger.iter().all(|e| e.reference_price.is_none()));
    }

    #[test]
    fn test_ledger_records_balance_before_reinvestment() {
        let t = timeline(&[
            DividendEvent::new(d(2024, 1, 6), dec!(1.02)),
            DividendEvent::new(d(2024, 1, 11), dec!(1)),
        ]);
        let outcome = simulate(&t, &prices(), true).unwrap();

        assert_eq!(outcome.ledger[0].shares_held_at_event, dec!(10));
        assert_eq!(outcome.ledger[0].reinvested_shares, dec!(0.1));
        assert_eq!(outcome.ledger[1].shares_held_at_event, dec!(10.1));
        assert_eq!(outcome.ledger[1].cash_received, dec!(10.1));
    }

    #[test]
    fn test_missing_price_keeps_cash_and_continues() {
        let late_prices = PriceSeries::new(vec![
            PricePoint::new(d(2024, 1, 6), dec!(100)),
            PricePoint::new(d(2024, 1, 11), dec!(100)),
        ]);
        let t = timeline(&[
            DividendEvent::new(d(2024, 1, 3), dec!(1)),
            DividendEvent::new(d(2024, 1, 11), dec!(1)),
        ]);
        let outcome = simulate(&t, &late_prices, true).unwrap();

        assert_eq!(outcome.state.cash_dividends, dec!(20));
        assert_eq!(outcome.state.reinvested_shares, dec!(0.1));
        assert_eq!(outcome.ledger[0].reinvested_shares, Decimal::ZERO);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(matches!(
            outcome.warnings[0],
            SimulationWarning::MissingReferencePrice { .. }
        ));
        assert_eq!(outcome.warnings[0].date(), d(2024, 1, 3));
    }

    #[test]
    fn test_non_positive_price_is_treated_as_missing() {
        let bad_prices = PriceSeries::new(vec![PricePoint::new(d(2024, 1, 1), dec!(0))]);
        let t = timeline(&[DividendEvent::new(d(2024, 1, 5), dec!(1))]);
        let outcome = simulate(&t, &bad_prices, true).unwrap();

        assert_eq!(outcome.state.shares_held, dec!(10));
        assert_eq!(outcome.state.cash_dividends, dec!(10));
        assert!(matches!(
            outcome.warnings[0],
            SimulationWarning::NonPositiveReferencePrice { .. }
        ));
    }

    #[test]
    fn test_stepwise_totals_never_decrease() {
        let t = timeline(&[
            DividendEvent::new(d(2024, 1, 2), dec!(0.5)),
            DividendEvent::new(d(2024, 1, 6), dec!(0)),
            DividendEvent::new(d(2024, 1, 11), dec!(0.75)),
        ]);
        let p = prices();
        let mut sim = DripSimulator::new(&p, true);
        let mut last = sim.state().clone();

        for event in t.iter() {
            sim.apply(event).unwrap();
            let now = sim.state();
            assert!(now.cash_dividends >= last.cash_dividends);
            assert!(now.reinvested_shares >= last.reinvested_shares);
            assert_eq!(
                now.shares_held,
                now.purchased_shares + now.reinvested_shares
            );
            last = now.clone();
        }
    }

    #[test]
    fn test_dividend_cash_overflow_is_an_error() {
        let initial = PurchaseLot::new(d(2024, 1, 1), dec!(1000000000000000), dec!(1));
        let lots = include_lots(&initial, &[]).unwrap();
        let t = build_timeline(
            &lots,
            &[DividendEvent::new(d(2024, 1, 6), dec!(1000000000000000))],
        )
        .unwrap();

        let err = simulate(&t, &prices(), true).unwrap_err();
        assert!(matches!(err, DripError::Overflow(_)));
        assert!(err.to_string().contains("2024-01-06"));
    }

    #[test]
    fn test_warning_display_mentions_date() {
        let w = SimulationWarning::MissingReferencePrice {
            date: d(2024, 1, 3),
            cash: dec!(10),
        };
        assert!(w.to_string().contains("2024-01-03"));
    }
}
