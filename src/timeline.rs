//! Timeline builder
//!
//! Merges purchase lots and dividend events into one chronologically ordered
//! sequence. Purchases sort before dividends on the same date so that newly
//! bought shares earn that day's dividend.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::error::DripError;
use crate::models::{normalize_dividends, DividendEvent, LotKind, PurchaseLot};

/// A lot that takes part in the calculation, with its date resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncludedLot {
    /// 0 for the initial lot, n for the n-th additional lot
    pub index: usize,
    pub kind: LotKind,
    pub date: NaiveDate,
    pub shares: Decimal,
    pub price_per_share: Decimal,
}

impl IncludedLot {
    pub fn cost(&self) -> Option<Decimal> {
        self.shares.checked_mul(self.price_per_share)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    Purchase {
        date: NaiveDate,
        shares: Decimal,
        lot_index: usize,
    },
    Dividend(DividendEvent),
}

impl TimelineEvent {
    pub fn date(&self) -> NaiveDate {
        match self {
            TimelineEvent::Purchase { date, .. } => *date,
            TimelineEvent::Dividend(event) => event.date,
        }
    }

    // Purchases first on a shared date
    fn same_day_rank(&self) -> u8 {
        match self {
            TimelineEvent::Purchase { .. } => 0,
            TimelineEvent::Dividend(_) => 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
}

impl Timeline {
    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimelineEvent> {
        self.events.iter()
    }

    pub fn dividend_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, TimelineEvent::Dividend(_)))
            .count()
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a TimelineEvent;
    type IntoIter = std::slice::Iter<'a, TimelineEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Decide which lots take part in the calculation.
///
/// A lot without a date or with zero shares is not a real purchase. An
/// additional lot with a zero price is an unfilled row and is skipped too;
/// the initial lot may have a zero price (shares received at no cost).
/// Negative values on a lot that would otherwise be included are an error.
pub fn include_lots(
    initial: &PurchaseLot,
    additional: &[PurchaseLot],
) -> Result<Vec<IncludedLot>, DripError> {
    let candidates = std::iter::once((0, LotKind::Initial, initial)).chain(
        additional
            .iter()
            .enumerate()
            .map(|(i, lot)| (i + 1, LotKind::Additional, lot)),
    );

    let mut included = Vec::new();
    for (index, kind, lot) in candidates {
        let Some(date) = lot.date else {
            debug!("Skipping lot #{}: no purchase date", index);
            continue;
        };
        if lot.shares.is_zero() {
            debug!("Skipping lot #{}: zero shares", index);
            continue;
        }
        if kind == LotKind::Additional && lot.price_per_share.is_zero() {
            debug!("Skipping lot #{}: no price entered", index);
            continue;
        }

        if lot.shares.is_sign_negative() {
            return Err(DripError::InvalidLot {
                index,
                reason: format!("share count is negative ({})", lot.shares),
            });
        }
        if lot.price_per_share.is_sign_negative() {
            return Err(DripError::InvalidLot {
                index,
                reason: format!("price per share is negative ({})", lot.price_per_share),
            });
        }

        if lot.cost().is_none() {
            return Err(DripError::InvalidLot {
                index,
                reason: format!(
                    "amount out of range ({} shares at {})",
                    lot.shares, lot.price_per_share
                ),
            });
        }

        debug!(
            "Including {} lot #{}: {} @ {} on {}",
            kind.as_str(),
            index,
            lot.shares,
            lot.price_per_share,
            date
        );
        included.push(IncludedLot {
            index,
            kind,
            date,
            shares: lot.shares,
            price_per_share: lot.price_per_share,
        });
    }

    Ok(included)
}

/// Merge included lots and dividends into a single ascending timeline.
///
/// Dividends dated before the earliest purchase are dropped; same-date
/// dividends are summed into one event. A negative amount is rejected.
pub fn build_timeline(
    lots: &[IncludedLot],
    dividends: &[DividendEvent],
) -> Result<Timeline, DripError> {
    if let Some(bad) = dividends.iter().find(|d| d.amount_per_share < Decimal::ZERO) {
        return Err(DripError::InvalidDividend {
            date: bad.date,
            amount: bad.amount_per_share,
        });
    }

    let Some(first_purchase) = lots.iter().map(|l| l.date).min() else {
        return Ok(Timeline::default());
    };

    let mut events: Vec<TimelineEvent> = lots
        .iter()
        .map(|lot| TimelineEvent::Purchase {
            date: lot.date,
            shares: lot.shares,
            lot_index: lot.index,
        })
        .collect();

    let dividends = normalize_dividends(dividends.iter().copied());
    let total = dividends.len();
    events.extend(
        dividends
            .into_iter()
            .filter(|d| d.date >= first_purchase)
            .map(TimelineEvent::Dividend),
    );
    let kept = events.len() - lots.len();
    if kept < total {
        debug!(
            "Dropped {} dividend(s) paid before first purchase on {}",
            total - kept,
            first_purchase
        );
    }

    // Stable sort keeps same-date purchases in input order
    events.sort_by(|a, b| {
        a.date()
            .cmp(&b.date())
            .then(a.same_day_rank().cmp(&b.same_day_rank()))
    });

    Ok(Timeline { events })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn unset_lot() -> PurchaseLot {
        PurchaseLot {
            date: None,
            shares: Decimal::ZERO,
            price_per_share: Decimal::ZERO,
        }
    }

    #[test]
    fn test_include_lots_skips_unset_additional_rows() {
        let initial = PurchaseLot::new(d(2024, 1, 2), dec!(10), dec!(100));
        let additional = vec![
            unset_lot(),
            PurchaseLot::new(d(2024, 2, 1), dec!(0), dec!(50)),
            PurchaseLot::new(d(2024, 2, 1), dec!(5), dec!(0)),
            PurchaseLot::new(d(2024, 3, 1), dec!(5), dec!(50)),
        ];

        let lots = include_lots(&initial, &additional).unwrap();
        assert_eq!(lots.len(), 2);
        assert_eq!(lots[0].kind, LotKind::Initial);
        assert_eq!(lots[1].index, 4);
        assert_eq!(lots[1].date, d(2024, 3, 1));
    }

    #[test]
    fn test_include_lots_keeps_zero_price_initial_lot() {
        let initial = PurchaseLot::new(d(2024, 1, 2), dec!(10), dec!(0));
        let lots = include_lots(&initial, &[]).unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].cost(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_include_lots_rejects_negative_shares() {
        let initial = PurchaseLot::new(d(2024, 1, 2), dec!(10), dec!(100));
        let additional = vec![PurchaseLot::new(d(2024, 2, 1), dec!(-3), dec!(50))];
        match include_lots(&initial, &additional) {
            Err(DripError::InvalidLot { index, reason }) => {
                assert_eq!(index, 1);
                assert!(reason.contains("share count"));
            }
            other => panic!("expected InvalidLot, got {:?}", other),
        }
    }

    #[test]
    fn test_include_lots_rejects_negative_price() {
        let initial = PurchaseLot::new(d(2024, 1, 2), dec!(10), dec!(-1));
        let err = include_lots(&initial, &[]).unwrap_err();
        assert!(matches!(err, DripError::InvalidLot { index: 0, .. }));
    }

    #[test]
    fn test_negative_values_on_excluded_lot_are_ignored() {
        let initial = PurchaseLot::new(d(2024, 1, 2), dec!(10), dec!(100));
        let additional = vec![PurchaseLot {
            date: None,
            shares: dec!(-5),
            price_per_share: dec!(-5),
        }];
        assert_eq!(include_lots(&initial, &additional).unwrap().len(), 1);
    }

    #[test]
    fn test_build_timeline_orders_purchase_before_same_day_dividend() {
        let initial = PurchaseLot::new(d(2024, 1, 2), dec!(10), dec!(100));
        let additional = vec![PurchaseLot::new(d(2024, 1, 10), dec!(5), dec!(50))];
        let lots = include_lots(&initial, &additional).unwrap();
        let dividends = vec![DividendEvent::new(d(2024, 1, 10), dec!(1))];

        let timeline = build_timeline(&lots, &dividends).unwrap();
        let events = timeline.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[1], TimelineEvent::Purchase { lot_index: 1, .. }));
        assert!(matches!(events[2], TimelineEvent::Dividend(_)));
    }

    #[test]
    fn test_build_timeline_drops_dividends_before_first_purchase() {
        let initial = PurchaseLot::new(d(2024, 1, 2), dec!(10), dec!(100));
        let lots = include_lots(&initial, &[]).unwrap();
        let dividends = vec![
            DividendEvent::new(d(2023, 12, 15), dec!(0.5)),
            DividendEvent::new(d(2024, 1, 2), dec!(0.5)),
        ];

        let timeline = build_timeline(&lots, &dividends).unwrap();
        assert_eq!(timeline.dividend_count(), 1);
        assert_eq!(timeline.events()[1].date(), d(2024, 1, 2));
    }

    #[test]
    fn test_build_timeline_keeps_same_date_lots_in_input_order() {
        let initial = PurchaseLot::new(d(2024, 1, 2), dec!(10), dec!(100));
        let additional = vec![
            PurchaseLot::new(d(2024, 1, 2), dec!(3), dec!(100)),
            PurchaseLot::new(d(2024, 1, 2), dec!(4), dec!(100)),
        ];
        let lots = include_lots(&initial, &additional).unwrap();
        let timeline = build_timeline(&lots, &[]).unwrap();

        let order: Vec<usize> = timeline
            .iter()
            .filter_map(|e| match e {
                TimelineEvent::Purchase { lot_index, .. } => Some(*lot_index),
                _ => None,
            })
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_build_timeline_merges_duplicate_dividends() {
        let initial = PurchaseLot::new(d(2024, 1, 2), dec!(10), dec!(100));
        let lots = include_lots(&initial, &[]).unwrap();
        let dividends = vec![
            DividendEvent::new(d(2024, 2, 1), dec!(0.25)),
            DividendEvent::new(d(2024, 2, 1), dec!(0.25)),
        ];

        let timeline = build_timeline(&lots, &dividends).unwrap();
        assert_eq!(timeline.dividend_count(), 1);
        match &timeline.events()[1] {
            TimelineEvent::Dividend(e) => assert_eq!(e.amount_per_share, dec!(0.5)),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_build_timeline_without_lots_is_empty() {
        let dividends = vec![DividendEvent::new(d(2024, 2, 1), dec!(0.25))];
        assert!(build_timeline(&[], &dividends).unwrap().is_empty());
    }

    #[test]
    fn test_build_timeline_rejects_negative_dividend() {
        let initial = PurchaseLot::new(d(2024, 1, 2), dec!(10), dec!(100));
        let lots = include_lots(&initial, &[]).unwrap();
        let dividends = vec![
            DividendEvent::new(d(2024, 2, 1), dec!(0.25)),
            DividendEvent::new(d(2024, 3, 1), dec!(-0.25)),
        ];

        match build_timeline(&lots, &dividends) {
            Err(DripError::InvalidDividend { date, amount }) => {
                assert_eq!(date, d(2024, 3, 1));
                assert_eq!(amount, dec!(-0.25));
            }
            other => panic!("expected InvalidDividend, got {:?}", other),
        }
    }

    #[test]
    fn test_include_lots_rejects_cost_out_of_range() {
        let big = dec!(1000000000000000);
        let initial = PurchaseLot::new(d(2024, 1, 2), big, big);
        match include_lots(&initial, &[]) {
            Err(DripError::InvalidLot { index, reason }) => {
                assert_eq!(index, 0);
                assert!(reason.contains("out of range"));
            }
            other => panic!("expected InvalidLot, got {:?}", other),
        }
    }
}
