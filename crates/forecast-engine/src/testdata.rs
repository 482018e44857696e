//! Shared fixtures: a five-year history with 10% revenue growth and constant
//! structural ratios, so trailing averages are exact and assertions can use
//! closed-form expectations.

use chrono::NaiveDate;
use valuation_core::{BalanceSheet, IncomeStatement, ShareholderReturns};

const YEARS: [i32; 5] = [2019, 2020, 2021, 2022, 2023];

fn revenue_for(index: usize) -> f64 {
    1000.0 * 1.1_f64.powi(index as i32)
}

fn date(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 12, 31).unwrap()
}

/// PL history with depreciation at `dep_ratio` of revenue, cost at 40%,
/// SG&A at 20%, flat non-operating lines and a 25% effective tax rate.
pub(crate) fn pl_series(dep_ratio: f64) -> Vec<IncomeStatement> {
    YEARS
        .iter()
        .enumerate()
        .map(|(i, &year)| {
            let revenue = revenue_for(i);
            let operating_income = (0.4 - dep_ratio) * revenue;
            let income_before_tax = operating_income + 20.0 - 10.0;
            IncomeStatement {
                period: date(year),
                revenue: Some(revenue),
                cost_of_revenue: Some(0.4 * revenue),
                sg_and_a: Some(0.2 * revenue),
                depreciation_amortization: Some(dep_ratio * revenue),
                operating_income: Some(operating_income),
                interest_income: Some(20.0),
                interest_expense: Some(10.0),
                other_non_operating: Some(0.0),
                income_before_tax: Some(income_before_tax),
                income_tax: Some(0.25 * income_before_tax),
                net_income: Some(0.75 * income_before_tax),
            }
        })
        .collect()
}

/// BS history that balances by construction for any `intangible_ratio`:
/// cash at 80% of revenue, working-capital items at fixed revenue ratios,
/// PPE at 50%, and retained earnings as the balancing residual.
pub(crate) fn bs_series(intangible_ratio: f64) -> Vec<BalanceSheet> {
    YEARS
        .iter()
        .enumerate()
        .map(|(i, &year)| {
            let r = revenue_for(i);
            let retained_earnings = (1.38 + intangible_ratio) * r - 450.0;
            BalanceSheet {
                period: date(year),
                cash_and_equivalents: Some(0.8 * r),
                short_term_investments: Some(50.0),
                net_receivables: Some(0.12 * r),
                inventory: Some(0.08 * r),
                other_current_assets: Some(40.0),
                ppe: Some(0.5 * r),
                long_term_investments: Some(60.0),
                intangible_assets: Some(intangible_ratio * r),
                other_noncurrent_assets: Some(30.0),
                total_assets: Some((1.5 + intangible_ratio) * r + 180.0),
                short_term_debt: Some(100.0),
                accounts_payable: Some(0.07 * r),
                deferred_revenue: Some(30.0),
                other_current_liabilities: Some(0.05 * r),
                long_term_debt: Some(300.0),
                other_noncurrent_liabilities: Some(0.0),
                total_liabilities: Some(430.0 + 0.12 * r),
                common_stock: Some(200.0),
                retained_earnings: Some(retained_earnings),
                aoci: Some(0.0),
                capital_surplus: Some(0.0),
                total_equity: Some(retained_earnings + 200.0),
            }
        })
        .collect()
}

pub(crate) fn history_pl() -> Vec<IncomeStatement> {
    pl_series(0.05)
}

pub(crate) fn history_bs() -> Vec<BalanceSheet> {
    bs_series(0.1)
}

/// Dividends at 20% and buybacks at 10% of each year's net income.
pub(crate) fn history_returns() -> Vec<ShareholderReturns> {
    pl_series(0.05)
        .iter()
        .map(|p| ShareholderReturns {
            period: p.period,
            dividends_paid: Some(p.net_income.unwrap() * 0.2),
            stock_buyback: Some(p.net_income.unwrap() * 0.1),
        })
        .collect()
}
