//! Income-statement projection.
//!
//! Revenue compounds at the supplied growth rates; depreciation compounds at
//! its trailing average growth rate. Cost of revenue and SG&A hold their
//! trailing average ratio to revenue, non-operating lines hold their trailing
//! averages, and income tax applies the trailing average effective rate.

use chrono::{Datelike, NaiveDate};
use historical_stats::{average_growth, average_ratio, average_value, trailing};
use tracing::debug;
use valuation_core::{IncomeStatement, ValuationError, TRAILING_WINDOW};

/// `date` shifted forward by `years`, clamping Feb 29 to Mar 1 when the
/// target year is not a leap year.
pub(crate) fn add_years(date: NaiveDate, years: i32) -> NaiveDate {
    let year = date.year() + years;
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .unwrap_or(date)
}

/// Extend a historical PL series by one projected period per growth rate.
/// Historical records are returned unchanged ahead of the projections.
pub fn project_income_statement(
    pl: &[IncomeStatement],
    growth_rates: &[f64],
) -> Result<Vec<IncomeStatement>, ValuationError> {
    let base = pl
        .last()
        .ok_or_else(|| ValuationError::EmptySeries("income statement".to_string()))?;
    let base_revenue = base.revenue.ok_or_else(|| {
        ValuationError::MissingData(format!(
            "income statement base period {} has no revenue to grow from",
            base.period
        ))
    })?;

    let recent = trailing(pl, TRAILING_WINDOW);
    let cost_ratio = average_ratio(recent, |p| p.cost_of_revenue, |p| p.revenue);
    let sga_ratio = average_ratio(recent, |p| p.sg_and_a, |p| p.revenue);
    let depreciation_growth = average_growth(recent, |p| p.depreciation_amortization);
    let interest_income_avg = average_value(recent, |p| p.interest_income);
    let interest_expense_avg = average_value(recent, |p| p.interest_expense);
    let other_non_operating_avg = average_value(recent, |p| p.other_non_operating);
    let tax_rate = average_ratio(recent, |p| p.income_tax, |p| p.income_before_tax);

    debug!(
        cost_ratio,
        sga_ratio, depreciation_growth, tax_rate, "income statement projection assumptions"
    );

    let mut extended = pl.to_vec();
    let mut revenue = base_revenue;
    let mut depreciation = base.depreciation_amortization.unwrap_or(0.0);

    for (i, growth) in growth_rates.iter().enumerate() {
        revenue *= 1.0 + growth;
        depreciation *= 1.0 + depreciation_growth;

        let cost_of_revenue = revenue * cost_ratio;
        let sg_and_a = revenue * sga_ratio;
        let operating_income = revenue - cost_of_revenue - sg_and_a - depreciation;
        let income_before_tax = operating_income + interest_income_avg - interest_expense_avg
            + other_non_operating_avg;
        let income_tax = income_before_tax * tax_rate;
        let net_income = income_before_tax - income_tax;

        extended.push(IncomeStatement {
            period: add_years(base.period, (i + 1) as i32),
            revenue: Some(revenue),
            cost_of_revenue: Some(cost_of_revenue),
            sg_and_a: Some(sg_and_a),
            depreciation_amortization: Some(depreciation),
            operating_income: Some(operating_income),
            interest_income: Some(interest_income_avg),
            interest_expense: Some(interest_expense_avg),
            other_non_operating: Some(other_non_operating_avg),
            income_before_tax: Some(income_before_tax),
            income_tax: Some(income_tax),
            net_income: Some(net_income),
        });
    }

    Ok(extended)
}
