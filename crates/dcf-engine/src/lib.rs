//! DCF Valuation Engine
//!
//! Discounts projected free cash flow over a fixed 10-year explicit horizon
//! plus a Gordon-growth terminal value to enterprise value, bridges to equity
//! value and a fair per-share price, and evaluates a WACC x terminal-growth
//! sensitivity grid.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;
use valuation_core::{
    BalanceSheet, CashFlowRecord, MarketData, SensitivityGrid, Valuation, ValuationError,
    MAX_FORECAST_YEARS,
};

/// Enterprise value of the projected cash flows at one (WACC, terminal
/// growth) pair. Uses at most the first ten projected periods; WACC must
/// exceed the terminal growth rate or the terminal term is undefined.
pub fn compute_dcf_valuation(
    cash_flows: &[CashFlowRecord],
    wacc: f64,
    terminal_growth: f64,
) -> Result<f64, ValuationError> {
    if cash_flows.is_empty() {
        return Err(ValuationError::EmptySeries(
            "projected cash flows".to_string(),
        ));
    }
    if wacc <= terminal_growth {
        return Err(ValuationError::Division(format!(
            "terminal value undefined: WACC {wacc} does not exceed terminal growth {terminal_growth}"
        )));
    }

    let horizon = &cash_flows[..cash_flows.len().min(MAX_FORECAST_YEARS)];
    let mut enterprise_value = 0.0;
    for (t, cf) in horizon.iter().enumerate() {
        enterprise_value += cf.fcf / (1.0 + wacc).powi(t as i32 + 1);
    }

    // Terminal value grows the final explicit-year FCF in perpetuity
    let final_fcf = horizon[horizon.len() - 1].fcf;
    let terminal_value = final_fcf * (1.0 + terminal_growth) / (wacc - terminal_growth);
    enterprise_value += terminal_value / (1.0 + wacc).powi(horizon.len() as i32);

    Ok(enterprise_value)
}

/// Bridge an enterprise value to equity value and fair price per share using
/// net debt from the latest historical balance sheet.
pub fn fair_share_price(
    enterprise_value: f64,
    bs: &[BalanceSheet],
    market: &MarketData,
) -> Result<Valuation, ValuationError> {
    let latest = bs
        .last()
        .ok_or_else(|| ValuationError::EmptySeries("balance sheet".to_string()))?;
    if market.shares_outstanding == 0.0 {
        return Err(ValuationError::InvalidData(
            "shares outstanding is zero".to_string(),
        ));
    }

    let net_debt = latest.interest_bearing_debt() - latest.cash_and_equivalents.unwrap_or(0.0);
    let equity_value = enterprise_value - net_debt;
    Ok(Valuation {
        enterprise_value,
        net_debt,
        equity_value,
        fair_share_price: equity_value / market.shares_outstanding,
        current_market_price: market.price,
    })
}

/// Axis spans and step counts for the sensitivity grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SensitivityConfig {
    /// Half-width of the WACC axis around the base value
    pub wacc_span: f64,
    /// Half-width of the terminal-growth axis around the base value
    pub growth_span: f64,
    pub wacc_steps: usize,
    pub growth_steps: usize,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            wacc_span: 0.01,
            growth_span: 0.005,
            wacc_steps: 5,
            growth_steps: 5,
        }
    }
}

fn linspace(center: f64, span: f64, steps: usize) -> Vec<f64> {
    if steps <= 1 {
        return vec![center];
    }
    let increment = 2.0 * span / (steps - 1) as f64;
    (0..steps)
        .map(|i| center - span + i as f64 * increment)
        .collect()
}

/// Enterprise values over a grid of WACC (rows) and terminal-growth (columns)
/// values linearly spaced around the base pair. Cells where WACC does not
/// exceed growth report NaN instead of aborting the grid; cell evaluations
/// are independent and run in parallel.
pub fn sensitivity_analysis(
    cash_flows: &[CashFlowRecord],
    base_wacc: f64,
    base_growth: f64,
    config: SensitivityConfig,
) -> Result<SensitivityGrid, ValuationError> {
    if cash_flows.is_empty() {
        return Err(ValuationError::EmptySeries(
            "projected cash flows".to_string(),
        ));
    }

    let wacc_values = linspace(base_wacc, config.wacc_span, config.wacc_steps);
    let growth_values = linspace(base_growth, config.growth_span, config.growth_steps);
    debug!(
        rows = wacc_values.len(),
        cols = growth_values.len(),
        "evaluating sensitivity grid"
    );

    let matrix = wacc_values
        .par_iter()
        .map(|&wacc| {
            growth_values
                .iter()
                .map(|&growth| {
                    compute_dcf_valuation(cash_flows, wacc, growth).unwrap_or(f64::NAN)
                })
                .collect()
        })
        .collect();

    Ok(SensitivityGrid {
        matrix,
        wacc_values,
        growth_values,
    })
}
