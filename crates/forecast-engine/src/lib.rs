//! Forecasting Engine
//!
//! Projects the income statement, balance sheet and cash-flow statement
//! forward for one fiscal year per supplied growth rate. The balance sheet is
//! always forced to balance through a cash plug; the cash-flow statement is
//! produced by a pluggable reconciliation strategy.

pub mod balance;
pub mod cashflow;
pub mod income;

#[cfg(test)]
pub(crate) mod testdata;

pub use balance::project_balance_sheet;
pub use cashflow::{CashFlowInputs, CashFlowStrategy, DirectCashFlow, ReconciledCashFlow};
pub use income::project_income_statement;

use derived_metrics::{compute_nopat, compute_nwc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use valuation_core::{
    BalanceSheet, CashFlowRecord, ForecastAssumptions, IncomeStatement, NopatRecord, NwcRecord,
    ShareholderReturns, ValuationError,
};

/// Extended statement series plus the projected cash flows for one scenario.
/// Historical periods are carried unchanged ahead of the projections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionOutput {
    pub extended_pl: Vec<IncomeStatement>,
    pub extended_bs: Vec<BalanceSheet>,
    pub extended_nopat: Vec<NopatRecord>,
    pub extended_nwc: Vec<NwcRecord>,
    /// One record per projected period only
    pub cash_flows: Vec<CashFlowRecord>,
}

/// Run the full projection pipeline: PL, then BS (plugged), then derived
/// metrics over the extended series, then cash flows via `strategy`.
pub fn project_statements(
    pl: &[IncomeStatement],
    bs: &[BalanceSheet],
    returns: &[ShareholderReturns],
    assumptions: &ForecastAssumptions,
    strategy: &dyn CashFlowStrategy,
) -> Result<ProjectionOutput, ValuationError> {
    assumptions.validate()?;
    let base_period = bs
        .last()
        .ok_or_else(|| ValuationError::EmptySeries("balance sheet".to_string()))?
        .period;

    let extended_pl = project_income_statement(pl, &assumptions.growth_rates)?;
    let extended_bs = project_balance_sheet(&extended_pl, pl, bs, returns, assumptions)?;
    let extended_nopat = compute_nopat(&extended_pl);
    let extended_nwc = compute_nwc(&extended_bs);

    let cash_flows = strategy.project(&CashFlowInputs {
        extended_pl: &extended_pl,
        extended_bs: &extended_bs,
        extended_nopat: &extended_nopat,
        extended_nwc: &extended_nwc,
        returns,
        base_period,
    })?;

    debug!(
        strategy = strategy.name(),
        projected_periods = cash_flows.len(),
        "projected statements"
    );

    Ok(ProjectionOutput {
        extended_pl,
        extended_bs,
        extended_nopat,
        extended_nwc,
        cash_flows,
    })
}
