use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of trailing periods used for historical averages.
pub const TRAILING_WINDOW: usize = 5;

/// Explicit forecast horizon for DCF discounting.
pub const MAX_FORECAST_YEARS: usize = 10;

/// Day-count convention for days-of-revenue metrics.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Canonical annual income statement record.
///
/// Fields are `None` when absent from the provider payload, never coerced to
/// zero, so downstream averaging can exclude them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    /// Fiscal-year-end date identifying the period
    pub period: NaiveDate,
    pub revenue: Option<f64>,
    pub cost_of_revenue: Option<f64>,
    pub sg_and_a: Option<f64>,
    pub depreciation_amortization: Option<f64>,
    pub operating_income: Option<f64>,
    pub interest_income: Option<f64>,
    pub interest_expense: Option<f64>,
    pub other_non_operating: Option<f64>,
    pub income_before_tax: Option<f64>,
    pub income_tax: Option<f64>,
    pub net_income: Option<f64>,
}

/// Canonical annual balance sheet record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// Fiscal-year-end date identifying the period
    pub period: NaiveDate,
    pub cash_and_equivalents: Option<f64>,
    pub short_term_investments: Option<f64>,
    pub net_receivables: Option<f64>,
    pub inventory: Option<f64>,
    pub other_current_assets: Option<f64>,
    pub ppe: Option<f64>,
    pub long_term_investments: Option<f64>,
    pub intangible_assets: Option<f64>,
    pub other_noncurrent_assets: Option<f64>,
    pub total_assets: Option<f64>,
    pub short_term_debt: Option<f64>,
    pub accounts_payable: Option<f64>,
    pub deferred_revenue: Option<f64>,
    pub other_current_liabilities: Option<f64>,
    pub long_term_debt: Option<f64>,
    pub other_noncurrent_liabilities: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub common_stock: Option<f64>,
    pub retained_earnings: Option<f64>,
    /// Accumulated other comprehensive income
    pub aoci: Option<f64>,
    /// Additional paid-in capital; receives the equity leg of funding raises
    pub capital_surplus: Option<f64>,
    pub total_equity: Option<f64>,
}

impl BalanceSheet {
    /// Short-term plus long-term interest-bearing debt, absent terms as zero.
    pub fn interest_bearing_debt(&self) -> f64 {
        self.short_term_debt.unwrap_or(0.0) + self.long_term_debt.unwrap_or(0.0)
    }
}

/// Dividends and buybacks paid in a period, stored as non-negative magnitudes
/// regardless of the sign convention in the source statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareholderReturns {
    pub period: NaiveDate,
    pub dividends_paid: Option<f64>,
    pub stock_buyback: Option<f64>,
}

/// NOPAT for one period, derived from the income statement.
///
/// `effective_tax_rate` and `nopat` are `None` when income before tax is zero
/// or absent; such periods must be excluded from downstream averaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NopatRecord {
    pub period: NaiveDate,
    pub revenue: Option<f64>,
    pub operating_income: Option<f64>,
    pub income_tax: Option<f64>,
    pub effective_tax_rate: Option<f64>,
    pub tax_on_operating_income: Option<f64>,
    pub nopat: Option<f64>,
}

/// Net working capital for one period, with its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NwcRecord {
    pub period: NaiveDate,
    pub net_receivables: f64,
    pub inventory: f64,
    pub other_current_assets: f64,
    pub accounts_payable: f64,
    pub deferred_revenue: f64,
    pub other_current_liabilities: f64,
    pub nwc: f64,
}

/// Invested capital (debt plus equity) for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestedCapitalRecord {
    pub period: NaiveDate,
    pub short_term_debt: f64,
    pub long_term_debt: f64,
    pub total_equity: f64,
    pub invested_capital: f64,
}

/// Per-period financial ratios. Every ratio is `None` when its denominator is
/// zero; undefined values are surfaced as missing, not as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioRecord {
    pub period: NaiveDate,
    pub pre_tax_roic: Option<f64>,
    pub roic: Option<f64>,
    pub roe: Option<f64>,
    pub roa: Option<f64>,
    pub operating_margin: Option<f64>,
    pub cost_ratio: Option<f64>,
    pub sg_and_a_ratio: Option<f64>,
    pub capital_turnover: Option<f64>,
    /// 365 x NWC / revenue
    pub nwc_days: Option<f64>,
    pub ppe_days: Option<f64>,
    pub intangible_days: Option<f64>,
    pub other_capital_days: Option<f64>,
}

/// Projected cash-flow statement line items for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRecord {
    pub period: NaiveDate,
    pub nopat: f64,
    pub depreciation: f64,
    pub delta_nwc: f64,
    pub operating_cf: f64,
    /// After-tax net of interest and other non-operating items; zero under the
    /// direct strategy
    pub non_operating_cf: f64,
    pub capex: f64,
    pub investing_cf: f64,
    pub financing_cf: f64,
    pub fcf: f64,
    /// Balance-sheet cash delta minus total net cash flow. Should be ~0 for
    /// the reconciled strategy; a nonzero value signals a reconciliation bug.
    pub cash_discrepancy: f64,
}

/// Valuation-time market snapshot (not a series).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub price: f64,
    pub beta: f64,
    pub risk_free_rate: f64,
    pub market_risk_premium: f64,
    /// Derived as market cap / price
    pub shares_outstanding: f64,
}

/// Growth rule for fixed assets (PPE and intangibles) in the balance-sheet
/// projection. The two historical forecasting variants differ only in this
/// driver choice, so it is a single configurable policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AssetGrowthDriver {
    /// Grow at the trailing average historical growth rate
    TrailingAverage,
    /// Grow at coefficient x current-period revenue growth rate
    RevenueElasticity {
        ppe_coefficient: f64,
        intangible_coefficient: f64,
    },
}

impl AssetGrowthDriver {
    /// Elasticity driver with the default 0.3 coefficients.
    pub fn default_elasticity() -> Self {
        Self::RevenueElasticity {
            ppe_coefficient: 0.3,
            intangible_coefficient: 0.3,
        }
    }
}

/// Whether a projected cash shortfall is funded with new debt and equity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundingPolicy {
    /// Cash is purely the balancing plug; no external funding
    CashPlug,
    /// When plugged cash falls below the historical cash-to-revenue target,
    /// raise the shortfall at the latest observed debt/equity mix
    RaiseToTargetCash,
}

/// User-supplied forecasting scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastAssumptions {
    /// Annual revenue growth rates, one per projected year (at most 10)
    pub growth_rates: Vec<f64>,
    pub asset_driver: AssetGrowthDriver,
    pub funding: FundingPolicy,
}

impl ForecastAssumptions {
    pub fn new(growth_rates: Vec<f64>) -> Self {
        Self {
            growth_rates,
            asset_driver: AssetGrowthDriver::TrailingAverage,
            funding: FundingPolicy::CashPlug,
        }
    }

    pub fn validate(&self) -> Result<(), crate::ValuationError> {
        if self.growth_rates.is_empty() {
            return Err(crate::ValuationError::InvalidData(
                "forecast requires at least one growth rate".to_string(),
            ));
        }
        if self.growth_rates.len() > MAX_FORECAST_YEARS {
            return Err(crate::ValuationError::InvalidData(format!(
                "forecast supports at most {} growth rates, got {}",
                MAX_FORECAST_YEARS,
                self.growth_rates.len()
            )));
        }
        Ok(())
    }
}

/// DCF valuation output for one (WACC, terminal growth) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub enterprise_value: f64,
    pub net_debt: f64,
    pub equity_value: f64,
    pub fair_share_price: f64,
    pub current_market_price: f64,
}

/// Enterprise values over a Cartesian product of WACC (rows) and terminal
/// growth (columns). Cells where WACC <= growth hold NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub matrix: Vec<Vec<f64>>,
    pub wacc_values: Vec<f64>,
    pub growth_values: Vec<f64>,
}

impl SensitivityGrid {
    pub fn value(&self, wacc_idx: usize, growth_idx: usize) -> f64 {
        self.matrix[wacc_idx][growth_idx]
    }
}
