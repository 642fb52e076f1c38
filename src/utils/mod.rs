//! Utility functions for rounding and formatting
//!
//! Results are rounded only at the presentation boundary: currency to 2
//! decimal places and share counts to 4.

use rust_decimal::{Decimal, RoundingStrategy};

pub const CURRENCY_DP: u32 = 2;
pub const SHARES_DP: u32 = 4;

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "$" prefix
    Dollar,
    /// No currency symbol (for table cells, calculations display)
    None,
}

/// Round a currency amount (or a percentage) to cents, half away from zero
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a share count to 4 decimal places, half away from zero
pub fn round_shares(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SHARES_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Insert thousands separators into the integer part of a plain number string
fn group_thousands(integer_part: &str) -> String {
    integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec![',', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect()
}

/// Core formatting function with full control over output.
///
/// Formats a Decimal value with `,` thousands separators and `.` decimal
/// separator, rounded to `dp` places.
///
/// # Examples
/// ```
/// use dripcalc::utils::{format_number, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_number(dec!(1234.5), 2, 0, CurrencySymbol::Dollar), "$1,234.50");
/// assert_eq!(format_number(dec!(-0.5), 2, 8, CurrencySymbol::None), "   -0.50");
/// ```
pub fn format_number(value: Decimal, dp: u32, width: usize, symbol: CurrencySymbol) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    let is_negative = rounded < Decimal::ZERO;

    let formatted = format!("{:.*}", dp as usize, rounded.abs());
    let (integer_part, decimal_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted.clone(), None),
    };

    let sign = if is_negative { "-" } else { "" };
    let prefix = match symbol {
        CurrencySymbol::Dollar => "$",
        CurrencySymbol::None => "",
    };

    let mut result = format!("{}{}{}", sign, prefix, group_thousands(&integer_part));
    if let Some(fraction) = decimal_part {
        result.push('.');
        result.push_str(&fraction);
    }

    if width > 0 && result.len() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

// ============ Convenience functions ============

/// Format as dollars: "$1,234.56"
///
/// # Examples
/// ```
/// use dripcalc::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(1234.56)), "$1,234.56");
/// assert_eq!(format_currency(dec!(-500)), "-$500.00");
/// ```
pub fn format_currency(value: Decimal) -> String {
    format_number(value, CURRENCY_DP, 0, CurrencySymbol::Dollar)
}

/// Format a per-share amount with 4 decimals: "$0.2400"
pub fn format_currency_precise(value: Decimal) -> String {
    format_number(value, SHARES_DP, 0, CurrencySymbol::Dollar)
}

/// Format a share count with 4 decimals: "1,015.2064"
pub fn format_shares(value: Decimal) -> String {
    format_number(value, SHARES_DP, 0, CurrencySymbol::None)
}

/// Format a percentage: "47.79%"
pub fn format_percent(value: Decimal) -> String {
    format!(
        "{}%",
        format_number(value, CURRENCY_DP, 0, CurrencySymbol::None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_currency_half_away_from_zero() {
        assert_eq!(round_currency(dec!(1.005)), dec!(1.01));
        assert_eq!(round_currency(dec!(-1.005)), dec!(-1.01));
        assert_eq!(round_currency(dec!(22.5681818)), dec!(22.57));
    }

    #[test]
    fn test_round_shares() {
        assert_eq!(round_shares(dec!(0.09090909)), dec!(0.0909));
        assert_eq!(round_shares(dec!(10.09095)), dec!(10.0910));
        assert_eq!(round_shares(dec!(15)), dec!(15));
    }

    #[test]
    fn test_format_currency_basic() {
        assert_eq!(format_currency(dec!(1234.56)), "$1,234.56");
        assert_eq!(format_currency(dec!(0.99)), "$0.99");
        assert_eq!(format_currency(dec!(1000000)), "$1,000,000.00");
        assert_eq!(format_currency(dec!(0)), "$0.00");
    }

    #[test]
    fn test_format_currency_negative() {
        assert_eq!(format_currency(dec!(-1234.56)), "-$1,234.56");
        assert_eq!(format_currency(dec!(-0.01)), "-$0.01");
    }

    #[test]
    fn test_format_currency_rounds() {
        assert_eq!(format_currency(dec!(1.235)), "$1.24");
        assert_eq!(format_currency(dec!(1.999)), "$2.00");
    }

    #[test]
    fn test_format_shares_and_percent() {
        assert_eq!(format_shares(dec!(10.0909090909)), "10.0909");
        assert_eq!(format_shares(dec!(1234)), "1,234.0000");
        assert_eq!(format_percent(dec!(47.787)), "47.79%");
        assert_eq!(format_percent(dec!(-3.5)), "-3.50%");
        assert_eq!(format_currency_precise(dec!(0.24)), "$0.2400");
    }

    #[test]
    fn test_format_with_width() {
        let result = format_number(dec!(100), 2, 10, CurrencySymbol::Dollar);
        assert_eq!(result, "   $100.00");
        let result = format_number(dec!(1000000), 2, 5, CurrencySymbol::Dollar);
        assert_eq!(result, "$1,000,000.00");
    }
}
