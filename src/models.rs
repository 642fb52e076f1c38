use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a lot is the position's opening purchase or a later top-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotKind {
    Initial,
    Additional,
}

impl LotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotKind::Initial => "INITIAL",
            LotKind::Additional => "ADDITIONAL",
        }
    }
}

/// A purchase of shares as entered by the user.
///
/// The date is optional because an additional purchase row may be left
/// unset; such lots are ignored by the timeline builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseLot {
    pub date: Option<NaiveDate>,
    pub shares: Decimal,
    pub price_per_share: Decimal,
}

impl PurchaseLot {
    pub fn new(date: NaiveDate, shares: Decimal, price_per_share: Decimal) -> Self {
        Self {
            date: Some(date),
            shares,
            price_per_share,
        }
    }

    /// Cash paid for the lot; `None` if it does not fit in a `Decimal`
    pub fn cost(&self) -> Option<Decimal> {
        self.shares.checked_mul(self.price_per_share)
    }
}

/// A cash dividend paid per share on a given date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendEvent {
    pub date: NaiveDate,
    pub amount_per_share: Decimal,
}

impl DividendEvent {
    pub fn new(date: NaiveDate, amount_per_share: Decimal) -> Self {
        Self {
            date,
            amount_per_share,
        }
    }
}

/// Sort dividends by date and merge same-date entries by summing their amounts.
pub fn normalize_dividends(events: impl IntoIterator<Item = DividendEvent>) -> Vec<DividendEvent> {
    events
        .into_iter()
        .sorted_by_key(|e| e.date)
        .coalesce(|a, b| {
            if a.date == b.date {
                Ok(DividendEvent::new(
                    a.date,
                    a.amount_per_share + b.amount_per_share,
                ))
            } else {
                Err((a, b))
            }
        })
        .collect()
}

/// Daily closing price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: Decimal,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: Decimal) -> Self {
        Self { date, close }
    }
}

/// Closing prices ordered ascending by date, at most one entry per date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from points in any order. On duplicate dates the later
    /// point in the input wins.
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        let points = points
            .into_iter()
            .coalesce(|a, b| if a.date == b.date { Ok(b) } else { Err((a, b)) })
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    /// Most recent close in the series
    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Close on `date` if it was a trading day, otherwise the latest close
    /// strictly before it. `None` when `date` predates the whole series.
    pub fn price_on_or_before(&self, date: NaiveDate) -> Option<&PricePoint> {
        let idx = self.points.partition_point(|p| p.date <= date);
        idx.checked_sub(1).map(|i| &self.points[i])
    }

    /// Points dated on or after `from`
    pub fn since(&self, from: NaiveDate) -> PriceSeries {
        let start = self.points.partition_point(|p| p.date < from);
        Self {
            points: self.points[start..].to_vec(),
        }
    }
}

impl FromIterator<PricePoint> for PriceSeries {
    fn from_iter<I: IntoIterator<Item = PricePoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Everything the calculation needs from a market data provider, fully
/// materialized before the pipeline runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketData {
    pub prices: PriceSeries,
    pub dividends: Vec<DividendEvent>,
}

impl MarketData {
    pub fn new(prices: PriceSeries, dividends: Vec<DividendEvent>) -> Self {
        Self {
            prices,
            dividends: normalize_dividends(dividends),
        }
    }

    /// Restrict prices to the holding period starting at `from`.
    /// Dividends are kept; the timeline builder drops pre-purchase ones.
    pub fn since(&self, from: NaiveDate) -> MarketData {
        MarketData {
            prices: self.prices.since(from),
            dividends: self.dividends.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series() -> PriceSeries {
        PriceSeries::new(vec![
            PricePoint::new(d(2024, 1, 10), dec!(110)),
            PricePoint::new(d(2024, 1, 2), dec!(100)),
            PricePoint::new(d(2024, 1, 5), dec!(105)),
        ])
    }

    #[test]
    fn test_price_series_sorts_input() {
        let dates: Vec<_> = series().points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 2), d(2024, 1, 5), d(2024, 1, 10)]);
    }

    #[test]
    fn test_price_series_duplicate_date_last_wins() {
        let s = PriceSeries::new(vec![
            PricePoint::new(d(2024, 1, 2), dec!(100)),
            PricePoint::new(d(2024, 1, 2), dec!(101)),
        ]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.latest().unwrap().close, dec!(101));
    }

    #[test]
    fn test_price_on_or_before_exact_day() {
        let p = series().price_on_or_before(d(2024, 1, 5)).copied().unwrap();
        assert_eq!(p.close, dec!(105));
        assert_eq!(p.date, d(2024, 1, 5));
    }

    #[test]
    fn test_price_on_or_before_uses_prior_trading_day() {
        let p = series().price_on_or_before(d(2024, 1, 8)).copied().unwrap();
        assert_eq!(p.date, d(2024, 1, 5));
        assert_eq!(p.close, dec!(105));

        let p = series().price_on_or_before(d(2030, 1, 1)).copied().unwrap();
        assert_eq!(p.close, dec!(110));
    }

    #[test]
    fn test_price_on_or_before_predates_series() {
        assert!(series().price_on_or_before(d(2024, 1, 1)).is_none());
        assert!(PriceSeries::default().price_on_or_before(d(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_since_filters_earlier_points() {
        let s = series().since(d(2024, 1, 3));
        assert_eq!(s.len(), 2);
        assert_eq!(s.first().unwrap().date, d(2024, 1, 5));
    }

    #[test]
    fn test_normalize_dividends_sums_same_date() {
        let merged = normalize_dividends(vec![
            DividendEvent::new(d(2024, 3, 1), dec!(0.25)),
            DividendEvent::new(d(2024, 1, 1), dec!(0.20)),
            DividendEvent::new(d(2024, 3, 1), dec!(0.05)),
        ]);
        assert_eq!(
            merged,
            vec![
                DividendEvent::new(d(2024, 1, 1), dec!(0.20)),
                DividendEvent::new(d(2024, 3, 1), dec!(0.30)),
            ]
        );
    }

    #[test]
    fn test_lot_cost() {
        let lot = PurchaseLot::new(d(2024, 1, 2), dec!(10), dec!(100.50));
        assert_eq!(lot.cost(), Some(dec!(1005)));

        let huge = PurchaseLot::new(d(2024, 1, 2), dec!(1000000000000000), dec!(1000000000000000));
        assert_eq!(huge.cost(), None);
    }
}
