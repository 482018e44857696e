//! Cost-of-Capital Calculator
//!
//! CAPM cost of equity, historical cost of debt, WACC, and the inverse
//! problem of backing an implied cost of debt out of a target WACC.

use historical_stats::trailing;
use tracing::debug;
use valuation_core::{
    BalanceSheet, IncomeStatement, MarketData, NopatRecord, ValuationError, TRAILING_WINDOW,
};

/// CAPM: risk-free rate plus beta times the market risk premium.
pub fn cost_of_equity(market: &MarketData) -> f64 {
    market.risk_free_rate + market.beta * market.market_risk_premium
}

/// Historical cost of debt: total interest expense over total interest-bearing
/// debt across the trailing window, restricted to periods where both figures
/// are present and debt is positive.
pub fn cost_of_debt(
    pl: &[IncomeStatement],
    bs: &[BalanceSheet],
) -> Result<f64, ValuationError> {
    let window = TRAILING_WINDOW.min(pl.len()).min(bs.len());
    if window == 0 {
        return Err(ValuationError::EmptySeries(
            "cost of debt needs at least one PL and BS period".to_string(),
        ));
    }

    let mut total_interest_expense = 0.0;
    let mut total_debt = 0.0;
    let mut eligible = 0usize;
    for (p, b) in trailing(pl, window).iter().zip(trailing(bs, window)) {
        match (p.interest_expense, b.short_term_debt, b.long_term_debt) {
            (Some(interest), Some(short), Some(long)) if short + long > 0.0 => {
                total_interest_expense += interest;
                total_debt += short + long;
                eligible += 1;
            }
            _ => {}
        }
    }

    if eligible == 0 || total_debt == 0.0 {
        return Err(ValuationError::MissingData(format!(
            "no trailing period with interest-bearing debt in the last {window} years"
        )));
    }
    Ok(total_interest_expense / total_debt)
}

/// Capital-structure weights from the latest balance sheet, plus the average
/// effective tax rate over the trailing NOPAT window.
fn capital_weights(
    bs: &[BalanceSheet],
    nopat: &[NopatRecord],
) -> Result<(f64, f64, f64), ValuationError> {
    let latest = bs
        .last()
        .ok_or_else(|| ValuationError::EmptySeries("balance sheet".to_string()))?;
    let equity = latest.total_equity.unwrap_or(0.0);
    let debt = latest.interest_bearing_debt();
    let total_capital = equity + debt;
    if total_capital == 0.0 {
        return Err(ValuationError::Division(format!(
            "equity and debt are both zero at {}",
            latest.period
        )));
    }

    // Undefined effective tax rates were flagged upstream; negative rates are
    // tax credits and would distort the average
    let rates: Vec<f64> = trailing(nopat, TRAILING_WINDOW)
        .iter()
        .filter_map(|n| n.effective_tax_rate)
        .filter(|rate| *rate >= 0.0)
        .collect();
    if rates.is_empty() {
        return Err(ValuationError::MissingData(
            "no trailing period with a defined effective tax rate".to_string(),
        ));
    }
    let avg_tax_rate = rates.iter().sum::<f64>() / rates.len() as f64;

    Ok((equity / total_capital, debt / total_capital, avg_tax_rate))
}

/// Weighted-average cost of capital, with the debt leg tax-shielded at the
/// trailing average effective rate.
pub fn compute_wacc(
    cost_of_equity: f64,
    cost_of_debt: f64,
    bs: &[BalanceSheet],
    nopat: &[NopatRecord],
) -> Result<f64, ValuationError> {
    let (equity_weight, debt_weight, avg_tax_rate) = capital_weights(bs, nopat)?;
    let wacc =
        equity_weight * cost_of_equity + debt_weight * cost_of_debt * (1.0 - avg_tax_rate);
    debug!(equity_weight, debt_weight, avg_tax_rate, wacc, "computed WACC");
    Ok(wacc)
}

/// Solve the cost of debt implied by a target WACC and a known cost of equity.
pub fn infer_cost_of_debt_from_wacc(
    wacc: f64,
    cost_of_equity: f64,
    bs: &[BalanceSheet],
    nopat: &[NopatRecord],
) -> Result<f64, ValuationError> {
    let (equity_weight, debt_weight, avg_tax_rate) = capital_weights(bs, nopat)?;
    let denominator = debt_weight * (1.0 - avg_tax_rate);
    if denominator == 0.0 {
        return Err(ValuationError::Division(
            "cannot infer a cost of debt with no debt weight or a 100% tax rate".to_string(),
        ));
    }
    Ok((wacc - equity_weight * cost_of_equity) / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use derived_metrics::compute_nopat;

    fn date(year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, 12, 31).unwrap()
    }

    fn pl(year: i32, interest_expense: Option<f64>) -> IncomeStatement {
        IncomeStatement {
            period: date(year),
            revenue: Some(1000.0),
            cost_of_revenue: None,
            sg_and_a: None,
            depreciation_amortization: None,
            operating_income: Some(300.0),
            interest_income: Some(0.0),
            interest_expense,
            other_non_operating: Some(0.0),
            income_before_tax: Some(280.0),
            income_tax: Some(70.0),
            net_income: Some(210.0),
        }
    }

    fn bs(year: i32, short: Option<f64>, long: Option<f64>, equity: f64) -> BalanceSheet {
        BalanceSheet {
            period: date(year),
            cash_and_equivalents: Some(100.0),
            short_term_investments: None,
            net_receivables: None,
            inventory: None,
            other_current_assets: None,
            ppe: None,
            long_term_investments: None,
            intangible_assets: None,
            other_noncurrent_assets: None,
            total_assets: None,
            short_term_debt: short,
            accounts_payable: None,
            deferred_revenue: None,
            other_current_liabilities: None,
            long_term_debt: long,
            other_noncurrent_liabilities: None,
            total_liabilities: None,
            common_stock: None,
            retained_earnings: None,
            aoci: None,
            capital_surplus: None,
            total_equity: Some(equity),
        }
    }

    fn market(beta: f64) -> MarketData {
        MarketData {
            price: 100.0,
            beta,
            risk_free_rate: 0.04,
            market_risk_premium: 0.055,
            shares_outstanding: 1000.0,
        }
    }

    #[test]
    fn test_capm_cost_of_equity() {
        let ce = cost_of_equity(&market(1.2));
        assert!((ce - 0.106).abs() < 1e-12);
    }

    #[test]
    fn test_cost_of_debt_pools_trailing_window() {
        let pls = vec![pl(2022, Some(12.0)), pl(2023, Some(18.0))];
        let bss = vec![
            bs(2022, Some(100.0), Some(300.0), 600.0),
            bs(2023, Some(100.0), Some(500.0), 600.0),
        ];
        let cd = cost_of_debt(&pls, &bss).unwrap();
        // (12 + 18) / (400 + 600)
        assert!((cd - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_cost_of_debt_skips_incomplete_periods() {
        let pls = vec![pl(2022, None), pl(2023, Some(18.0))];
        let bss = vec![
            bs(2022, Some(100.0), Some(300.0), 600.0),
            bs(2023, Some(100.0), Some(500.0), 600.0),
        ];
        let cd = cost_of_debt(&pls, &bss).unwrap();
        assert!((cd - 18.0 / 600.0).abs() < 1e-12);
    }

    #[test]
    fn test_cost_of_debt_without_debt_fails() {
        let pls = vec![pl(2023, Some(10.0))];
        let bss = vec![bs(2023, Some(0.0), Some(0.0), 600.0)];
        assert!(matches!(
            cost_of_debt(&pls, &bss),
            Err(ValuationError::MissingData(_))
        ));
    }

    #[test]
    fn test_wacc_known_value() {
        let pls = vec![pl(2023, Some(18.0))];
        let bss = vec![bs(2023, Some(100.0), Some(300.0), 600.0)];
        let nopat = compute_nopat(&pls);
        // tax rate 70/280 = 0.25; weights 0.6 equity / 0.4 debt
        let wacc = compute_wacc(0.10, 0.05, &bss, &nopat).unwrap();
        let expected = 0.6 * 0.10 + 0.4 * 0.05 * 0.75;
        assert!((wacc - expected).abs() < 1e-12);
    }

    #[test]
    fn test_wacc_zero_capital_fails() {
        let pls = vec![pl(2023, Some(18.0))];
        let bss = vec![bs(2023, Some(0.0), Some(0.0), 0.0)];
        let nopat = compute_nopat(&pls);
        assert!(matches!(
            compute_wacc(0.10, 0.05, &bss, &nopat),
            Err(ValuationError::Division(_))
        ));
    }

    #[test]
    fn test_inverse_recovers_cost_of_debt() {
        let pls = vec![pl(2022, Some(15.0)), pl(2023, Some(18.0))];
        let bss = vec![
            bs(2022, Some(100.0), Some(300.0), 600.0),
            bs(2023, Some(100.0), Some(300.0), 600.0),
        ];
        let nopat = compute_nopat(&pls);
        let ce = 0.095;
        let cd_known = 0.042;
        let wacc = compute_wacc(ce, cd_known, &bss, &nopat).unwrap();
        let cd = infer_cost_of_debt_from_wacc(wacc, ce, &bss, &nopat).unwrap();
        assert!((cd - cd_known).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_without_debt_fails() {
        let pls = vec![pl(2023, Some(18.0))];
        let bss = vec![bs(2023, Some(0.0), Some(0.0), 600.0)];
        let nopat = compute_nopat(&pls);
        assert!(matches!(
            infer_cost_of_debt_from_wacc(0.08, 0.10, &bss, &nopat),
            Err(ValuationError::Division(_))
        ));
    }
}
