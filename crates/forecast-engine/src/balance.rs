//! Balance-sheet projection with a cash plug.
//!
//! Working-capital items scale with projected revenue at trailing average
//! ratios, fixed assets grow per the configured driver, everything without a
//! rule is held at its latest historical value, and cash is the residual that
//! forces assets = liabilities + equity. Funding of a cash shortfall is a
//! second, explicit phase on top of the unconstrained plug.

use historical_stats::{
    average_buyback_ratio, average_dividend_ratio, average_growth, average_ratio_against, trailing,
};
use tracing::debug;
use valuation_core::{
    AssetGrowthDriver, BalanceSheet, ForecastAssumptions, FundingPolicy, IncomeStatement,
    ShareholderReturns, ValuationError, TRAILING_WINDOW,
};

use crate::income::add_years;

/// Everything the plug needs to balance one projected period.
struct PlugInputs {
    revenue: f64,
    non_cash_assets: f64,
    short_term_debt: f64,
    /// Liabilities other than short-term debt (all held or revenue-scaled)
    other_liabilities: f64,
    common_stock: f64,
    capital_surplus: f64,
    retained_earnings: f64,
    aoci: f64,
}

/// Balanced aggregates for one projected period.
struct Plugged {
    cash: f64,
    short_term_debt: f64,
    capital_surplus: f64,
    total_liabilities: f64,
    total_equity: f64,
    total_assets: f64,
}

/// Two-phase balancing policy: compute the unconstrained cash plug, then, when
/// funding is enabled and cash falls short of the revenue-scaled target, raise
/// the shortfall at the latest observed debt/equity mix and re-balance.
struct PlugPolicy {
    funding: FundingPolicy,
    target_cash_ratio: f64,
    debt_share: f64,
    equity_share: f64,
}

impl PlugPolicy {
    fn new(
        funding: FundingPolicy,
        target_cash_ratio: f64,
        latest: &BalanceSheet,
    ) -> Result<Self, ValuationError> {
        let (debt_share, equity_share) = match funding {
            FundingPolicy::CashPlug => (0.0, 0.0),
            FundingPolicy::RaiseToTargetCash => {
                let debt = latest.interest_bearing_debt();
                let equity = latest.total_equity.unwrap_or(0.0);
                let total = debt + equity;
                if total == 0.0 {
                    return Err(ValuationError::Division(format!(
                        "cannot derive a funding mix: debt and equity are both zero at {}",
                        latest.period
                    )));
                }
                (debt / total, equity / total)
            }
        };
        Ok(Self {
            funding,
            target_cash_ratio,
            debt_share,
            equity_share,
        })
    }

    fn balance(&self, inputs: PlugInputs) -> Plugged {
        let mut short_term_debt = inputs.short_term_debt;
        let mut capital_surplus = inputs.capital_surplus;
        let mut total_liabilities = short_term_debt + inputs.other_liabilities;
        let mut total_equity =
            inputs.common_stock + capital_surplus + inputs.retained_earnings + inputs.aoci;
        let mut cash = total_liabilities + total_equity - inputs.non_cash_assets;

        let target_cash = inputs.revenue * self.target_cash_ratio;
        if self.funding == FundingPolicy::RaiseToTargetCash && cash < target_cash {
            let shortfall = target_cash - cash;
            short_term_debt += shortfall * self.debt_share;
            capital_surplus += shortfall * self.equity_share;
            total_liabilities = short_term_debt + inputs.other_liabilities;
            total_equity =
                inputs.common_stock + capital_surplus + inputs.retained_earnings + inputs.aoci;
            cash = target_cash;
        }

        Plugged {
            cash,
            short_term_debt,
            capital_surplus,
            total_liabilities,
            total_equity,
            total_assets: inputs.non_cash_assets + cash,
        }
    }
}

/// Extend a historical BS series alongside an already-extended PL series.
///
/// The PL and BS series must share their most recent historical period as the
/// base period. Historical records are returned unchanged ahead of the
/// projections.
pub fn project_balance_sheet(
    extended_pl: &[IncomeStatement],
    pl: &[IncomeStatement],
    bs: &[BalanceSheet],
    returns: &[ShareholderReturns],
    assumptions: &ForecastAssumptions,
) -> Result<Vec<BalanceSheet>, ValuationError> {
    assumptions.validate()?;
    let base_bs = bs
        .last()
        .ok_or_else(|| ValuationError::EmptySeries("balance sheet".to_string()))?;
    let base_pl = pl
        .last()
        .ok_or_else(|| ValuationError::EmptySeries("income statement".to_string()))?;
    if base_bs.period != base_pl.period {
        return Err(ValuationError::MisalignedSeries(format!(
            "balance sheet base period {} does not match income statement base period {}",
            base_bs.period, base_pl.period
        )));
    }

    let recent_pl = trailing(pl, TRAILING_WINDOW);
    let recent_bs = trailing(bs, TRAILING_WINDOW);
    let latest = base_bs;

    let receivables_ratio =
        average_ratio_against(recent_bs, recent_pl, |b| b.net_receivables, |p| p.revenue);
    let inventory_ratio =
        average_ratio_against(recent_bs, recent_pl, |b| b.inventory, |p| p.revenue);
    let payable_ratio =
        average_ratio_against(recent_bs, recent_pl, |b| b.accounts_payable, |p| p.revenue);
    let other_current_liabilities_ratio = average_ratio_against(
        recent_bs,
        recent_pl,
        |b| b.other_current_liabilities,
        |p| p.revenue,
    );
    let target_cash_ratio = average_ratio_against(
        recent_bs,
        recent_pl,
        |b| b.cash_and_equivalents,
        |p| p.revenue,
    );

    let ppe_trailing_growth = average_growth(recent_bs, |b| b.ppe);
    let intangible_trailing_growth = average_growth(recent_bs, |b| b.intangible_assets);
    let dividend_ratio = average_dividend_ratio(recent_pl, returns);
    let buyback_ratio = average_buyback_ratio(recent_pl, returns);
    // Cumulative distributions can never exceed net income
    let payout_ratio = (dividend_ratio + buyback_ratio).min(1.0);

    debug!(
        receivables_ratio,
        inventory_ratio,
        target_cash_ratio,
        ppe_trailing_growth,
        payout_ratio,
        "balance sheet projection assumptions"
    );

    // Items with no revenue-driven or elasticity-driven rule are held at the
    // most recent historical value
    let short_term_investments = latest.short_term_investments.unwrap_or(0.0);
    let other_current_assets = latest.other_current_assets.unwrap_or(0.0);
    let long_term_investments = latest.long_term_investments.unwrap_or(0.0);
    let other_noncurrent_assets = latest.other_noncurrent_assets.unwrap_or(0.0);
    let deferred_revenue = latest.deferred_revenue.unwrap_or(0.0);
    let long_term_debt = latest.long_term_debt.unwrap_or(0.0);
    let other_noncurrent_liabilities = latest.other_noncurrent_liabilities.unwrap_or(0.0);
    let common_stock = latest.common_stock.unwrap_or(0.0);
    let aoci = 0.0;

    let policy = PlugPolicy::new(assumptions.funding, target_cash_ratio, latest)?;

    let mut extended = bs.to_vec();
    let mut prev_revenue = base_pl.revenue;

    for p in extended_pl.iter().filter(|p| p.period > base_bs.period) {
        let revenue = p.revenue.unwrap_or(0.0);
        let net_income = p.net_income.unwrap_or(0.0);
        // prev is always present: the historical base at minimum
        let prev = extended
            .last()
            .cloned()
            .ok_or_else(|| ValuationError::EmptySeries("balance sheet".to_string()))?;

        let (ppe_growth, intangible_growth) = match assumptions.asset_driver {
            AssetGrowthDriver::TrailingAverage => (ppe_trailing_growth, intangible_trailing_growth),
            AssetGrowthDriver::RevenueElasticity {
                ppe_coefficient,
                intangible_coefficient,
            } => {
                let revenue_growth = match prev_revenue {
                    Some(r) if r != 0.0 => revenue / r - 1.0,
                    _ => 0.0,
                };
                (
                    ppe_coefficient * revenue_growth,
                    intangible_coefficient * revenue_growth,
                )
            }
        };

        let net_receivables = revenue * receivables_ratio;
        let inventory = revenue * inventory_ratio;
        let accounts_payable = revenue * payable_ratio;
        let other_current_liabilities = revenue * other_current_liabilities_ratio;
        let ppe = prev.ppe.unwrap_or(0.0) * (1.0 + ppe_growth);
        let intangible_assets = prev.intangible_assets.unwrap_or(0.0) * (1.0 + intangible_growth);

        let retained_earnings =
            prev.retained_earnings.unwrap_or(0.0) + net_income * (1.0 - payout_ratio);

        let non_cash_assets = short_term_investments
            + net_receivables
            + inventory
            + other_current_assets
            + ppe
            + intangible_assets
            + long_term_investments
            + other_noncurrent_assets;
        let other_liabilities = accounts_payable
            + other_current_liabilities
            + deferred_revenue
            + long_term_debt
            + other_noncurrent_liabilities;

        // Prior-period funding raises persist: both legs roll forward, debt
        // through short_term_debt and equity through capital_surplus
        let plugged = policy.balance(PlugInputs {
            revenue,
            non_cash_assets,
            short_term_debt: prev.short_term_debt.unwrap_or(0.0),
            other_liabilities,
            common_stock,
            capital_surplus: prev.capital_surplus.unwrap_or(0.0),
            retained_earnings,
            aoci,
        });

        extended.push(BalanceSheet {
            period: add_years(prev.period, 1),
            cash_and_equivalents: Some(plugged.cash),
            short_term_investments: Some(short_term_investments),
            net_receivables: Some(net_receivables),
            inventory: Some(inventory),
            other_current_assets: Some(other_current_assets),
            ppe: Some(ppe),
            long_term_investments: Some(long_term_investments),
            intangible_assets: Some(intangible_assets),
            other_noncurrent_assets: Some(other_noncurrent_assets),
            total_assets: Some(plugged.total_assets),
            short_term_debt: Some(plugged.short_term_debt),
            accounts_payable: Some(accounts_payable),
            deferred_revenue: Some(deferred_revenue),
            other_current_liabilities: Some(other_current_liabilities),
            long_term_debt: Some(long_term_debt),
            other_noncurrent_liabilities: Some(other_noncurrent_liabilities),
            total_liabilities: Some(plugged.total_liabilities),
            common_stock: Some(common_stock),
            retained_earnings: Some(retained_earnings),
            aoci: Some(aoci),
            capital_surplus: Some(plugged.capital_surplus),
            total_equity: Some(plugged.total_equity),
        });
        prev_revenue = Some(revenue);
    }

    Ok(extended)
}
