//! Historical Averaging Library
//!
//! Pure, stateless statistics over trailing windows of statement records.
//! These are assumptions-building blocks: an empty eligible set returns 0.0,
//! never an error, so forecasts degrade gracefully when history is thin.

use statrs::statistics::Statistics;
use valuation_core::{IncomeStatement, ShareholderReturns};

/// Last `window` items of a slice (the whole slice when shorter).
pub fn trailing<T>(items: &[T], window: usize) -> &[T] {
    &items[items.len().saturating_sub(window)..]
}

fn mean_or_zero(values: Vec<f64>) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.mean()
    }
}

/// Mean of per-period numerator/denominator, skipping periods where the
/// denominator is zero or missing.
pub fn average_ratio<T>(
    items: &[T],
    numerator: impl Fn(&T) -> Option<f64>,
    denominator: impl Fn(&T) -> Option<f64>,
) -> f64 {
    let values: Vec<f64> = items
        .iter()
        .filter_map(|item| {
            let den = denominator(item)?;
            if den == 0.0 {
                return None;
            }
            Some(numerator(item).unwrap_or(0.0) / den)
        })
        .collect();
    mean_or_zero(values)
}

/// Like [`average_ratio`] but the denominator comes from a parallel reference
/// series (e.g. balance-sheet receivables over income-statement revenue).
/// Pairs by index over the shorter of the two slices.
pub fn average_ratio_against<T, U>(
    items: &[T],
    reference: &[U],
    numerator: impl Fn(&T) -> Option<f64>,
    denominator: impl Fn(&U) -> Option<f64>,
) -> f64 {
    let values: Vec<f64> = items
        .iter()
        .zip(reference.iter())
        .filter_map(|(item, rf)| {
            let den = denominator(rf)?;
            if den == 0.0 {
                return None;
            }
            Some(numerator(item).unwrap_or(0.0) / den)
        })
        .collect();
    mean_or_zero(values)
}

/// Mean of period-over-period relative growth, skipping transitions where the
/// prior value is zero or missing. Items are assumed sorted ascending.
pub fn average_growth<T>(items: &[T], value: impl Fn(&T) -> Option<f64>) -> f64 {
    let present: Vec<f64> = items.iter().filter_map(&value).collect();
    let growths: Vec<f64> = present
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    mean_or_zero(growths)
}

/// Mean of present values only.
pub fn average_value<T>(items: &[T], value: impl Fn(&T) -> Option<f64>) -> f64 {
    mean_or_zero(items.iter().filter_map(&value).collect())
}

/// Mean of dividends / net income across PL and returns periods paired by
/// date, skipping periods where net income is zero or dividends are missing.
pub fn average_dividend_ratio(pl: &[IncomeStatement], returns: &[ShareholderReturns]) -> f64 {
    average_payout_ratio(pl, returns, |r| r.dividends_paid)
}

/// Mean of buybacks / net income, with the same pairing and skip rules as
/// [`average_dividend_ratio`].
pub fn average_buyback_ratio(pl: &[IncomeStatement], returns: &[ShareholderReturns]) -> f64 {
    average_payout_ratio(pl, returns, |r| r.stock_buyback)
}

fn average_payout_ratio(
    pl: &[IncomeStatement],
    returns: &[ShareholderReturns],
    amount: impl Fn(&ShareholderReturns) -> Option<f64>,
) -> f64 {
    let values: Vec<f64> = pl
        .iter()
        .filter_map(|p| {
            let ret = returns.iter().find(|r| r.period == p.period)?;
            let paid = amount(ret)?;
            match p.net_income {
                Some(ni) if ni != 0.0 => Some(paid / ni),
                _ => None,
            }
        })
        .collect();
    mean_or_zero(values)
}
