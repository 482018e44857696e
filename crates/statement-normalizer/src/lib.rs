//! Statement Normalizer
//!
//! Maps raw provider records (FMP-style camelCase field names, one JSON
//! object per fiscal year) into canonical statement series sorted ascending
//! by period. Unknown or missing numeric fields become `None` so downstream
//! averaging can exclude them; they are never coerced to zero.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;
use valuation_core::{BalanceSheet, IncomeStatement, MarketData, ShareholderReturns, ValuationError};

fn num(record: &Value, key: &str) -> Option<f64> {
    record.get(key).and_then(Value::as_f64)
}

fn period(record: &Value, statement: &str, index: usize) -> Result<NaiveDate, ValuationError> {
    let raw = record
        .get("date")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ValuationError::MissingData(format!(
                "{statement} record {index} has no period date and cannot be sorted"
            ))
        })?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ValuationError::InvalidData(format!(
            "{statement} record {index} has unparseable period date `{raw}`"
        ))
    })
}

fn sort_and_check<T>(
    mut records: Vec<T>,
    statement: &str,
    period_of: impl Fn(&T) -> NaiveDate,
) -> Result<Vec<T>, ValuationError> {
    records.sort_by_key(&period_of);
    for pair in records.windows(2) {
        if period_of(&pair[0]) == period_of(&pair[1]) {
            return Err(ValuationError::InvalidData(format!(
                "{statement} series contains duplicate period {}",
                period_of(&pair[0])
            )));
        }
    }
    debug!(statement, periods = records.len(), "normalized statement series");
    Ok(records)
}

/// Normalize raw income-statement records into a canonical PL series.
pub fn normalize_income_statements(raw: &[Value]) -> Result<Vec<IncomeStatement>, ValuationError> {
    let records = raw
        .iter()
        .enumerate()
        .map(|(i, r)| {
            Ok(IncomeStatement {
                period: period(r, "income statement", i)?,
                revenue: num(r, "revenue"),
                cost_of_revenue: num(r, "costOfRevenue"),
                sg_and_a: num(r, "sellingGeneralAndAdministrativeExpenses"),
                depreciation_amortization: num(r, "depreciationAndAmortization"),
                operating_income: num(r, "operatingIncome"),
                interest_income: num(r, "interestIncome"),
                interest_expense: num(r, "interestExpense"),
                other_non_operating: num(r, "totalOtherIncomeExpensesNet"),
                income_before_tax: num(r, "incomeBeforeTax"),
                income_tax: num(r, "incomeTaxExpense"),
                net_income: num(r, "netIncome"),
            })
        })
        .collect::<Result<Vec<_>, ValuationError>>()?;
    sort_and_check(records, "income statement", |r| r.period)
}

/// Normalize raw balance-sheet records into a canonical BS series.
pub fn normalize_balance_sheets(raw: &[Value]) -> Result<Vec<BalanceSheet>, ValuationError> {
    let records = raw
        .iter()
        .enumerate()
        .map(|(i, r)| {
            Ok(BalanceSheet {
                period: period(r, "balance sheet", i)?,
                cash_and_equivalents: num(r, "cashAndCashEquivalents"),
                short_term_investments: num(r, "shortTermInvestments"),
                net_receivables: num(r, "netReceivables"),
                inventory: num(r, "inventory"),
                other_current_assets: num(r, "otherCurrentAssets"),
                ppe: num(r, "propertyPlantEquipmentNet"),
                long_term_investments: num(r, "longTermInvestments"),
                intangible_assets: num(r, "intangibleAssets"),
                other_noncurrent_assets: num(r, "otherNonCurrentAssets"),
                total_assets: num(r, "totalAssets"),
                short_term_debt: num(r, "shortTermDebt"),
                accounts_payable: num(r, "accountPayables"),
                deferred_revenue: num(r, "deferredRevenue"),
                other_current_liabilities: num(r, "otherCurrentLiabilities"),
                long_term_debt: num(r, "longTermDebt"),
                other_noncurrent_liabilities: num(r, "otherNonCurrentLiabilities"),
                total_liabilities: num(r, "totalLiabilities"),
                common_stock: num(r, "commonStock"),
                retained_earnings: num(r, "retainedEarnings"),
                aoci: num(r, "accumulatedOtherComprehensiveIncomeLoss"),
                capital_surplus: Some(0.0),
                total_equity: num(r, "totalStockholdersEquity"),
            })
        })
        .collect::<Result<Vec<_>, ValuationError>>()?;
    sort_and_check(records, "balance sheet", |r| r.period)
}

/// Extract dividend and buyback magnitudes from raw cash-flow records.
/// Source sign conventions vary, so both are stored as absolute values.
pub fn normalize_shareholder_returns(
    raw: &[Value],
) -> Result<Vec<ShareholderReturns>, ValuationError> {
    let records = raw
        .iter()
        .enumerate()
        .map(|(i, r)| {
            Ok(ShareholderReturns {
                period: period(r, "cash-flow statement", i)?,
                dividends_paid: num(r, "dividendsPaid").map(f64::abs),
                stock_buyback: num(r, "commonStockRepurchased").map(f64::abs),
            })
        })
        .collect::<Result<Vec<_>, ValuationError>>()?;
    sort_and_check(records, "cash-flow statement", |r| r.period)
}

/// Build a market snapshot from the first raw profile record plus the
/// caller-supplied rate assumptions. Shares outstanding are derived as
/// market cap / price.
pub fn normalize_market_data(
    profile: &[Value],
    risk_free_rate: f64,
    market_risk_premium: f64,
) -> Result<MarketData, ValuationError> {
    let record = profile
        .first()
        .ok_or_else(|| ValuationError::EmptySeries("market profile".to_string()))?;
    let price = num(record, "price")
        .ok_or_else(|| ValuationError::MissingData("market profile has no price".to_string()))?;
    let beta = num(record, "beta")
        .ok_or_else(|| ValuationError::MissingData("market profile has no beta".to_string()))?;
    let market_cap = num(record, "mktCap").ok_or_else(|| {
        ValuationError::MissingData("market profile has no market cap".to_string())
    })?;
    if price == 0.0 {
        return Err(ValuationError::Division(
            "cannot derive shares outstanding from a zero price".to_string(),
        ));
    }
    Ok(MarketData {
        price,
        beta,
        risk_free_rate,
        market_risk_premium,
        shares_outstanding: market_cap / price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_income_statements_sorted_ascending() {
        let raw = vec![
            json!({"date": "2023-09-30", "revenue": 300.0}),
            json!({"date": "2021-09-30", "revenue": 100.0}),
            json!({"date": "2022-09-30", "revenue": 200.0}),
        ];
        let pl = normalize_income_statements(&raw).unwrap();
        assert_eq!(pl.len(), 3);
        assert_eq!(pl[0].revenue, Some(100.0));
        assert_eq!(pl[2].revenue, Some(300.0));
        assert!(pl[0].period < pl[1].period && pl[1].period < pl[2].period);
    }

    #[test]
    fn test_missing_fields_stay_absent() {
        let raw = vec![json!({"date": "2023-09-30", "revenue": 100.0})];
        let pl = normalize_income_statements(&raw).unwrap();
        assert_eq!(pl[0].cost_of_revenue, None);
        assert_eq!(pl[0].net_income, None);
    }

    #[test]
    fn test_missing_period_date_fails() {
        let raw = vec![json!({"revenue": 100.0})];
        let err = normalize_income_statements(&raw).unwrap_err();
        assert!(matches!(err, ValuationError::MissingData(_)));
    }

    #[test]
    fn test_duplicate_period_fails() {
        let raw = vec![
            json!({"date": "2023-09-30", "revenue": 100.0}),
            json!({"date": "2023-09-30", "revenue": 200.0}),
        ];
        let err = normalize_income_statements(&raw).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidData(_)));
    }

    #[test]
    fn test_returns_are_absolute_magnitudes() {
        let raw = vec![json!({
            "date": "2023-09-30",
            "dividendsPaid": -15_000.0,
            "commonStockRepurchased": -77_000.0
        })];
        let returns = normalize_shareholder_returns(&raw).unwrap();
        assert_eq!(returns[0].dividends_paid, Some(15_000.0));
        assert_eq!(returns[0].stock_buyback, Some(77_000.0));
    }

    #[test]
    fn test_market_data_derives_shares_outstanding() {
        let profile = vec![json!({"price": 50.0, "beta": 1.2, "mktCap": 5_000.0})];
        let market = normalize_market_data(&profile, 0.04, 0.055).unwrap();
        assert_eq!(market.shares_outstanding, 100.0);
        assert_eq!(market.risk_free_rate, 0.04);
    }

    #[test]
    fn test_market_data_zero_price_fails() {
        let profile = vec![json!({"price": 0.0, "beta": 1.0, "mktCap": 5_000.0})];
        assert!(matches!(
            normalize_market_data(&profile, 0.04, 0.055),
            Err(ValuationError::Division(_))
        ));
    }
}
