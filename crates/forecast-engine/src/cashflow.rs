//! Cash-flow projection strategies.
//!
//! Two reconciliation strategies produce the projected cash-flow statement
//! from the extended PL/BS series. `DirectCashFlow` implies capex purely from
//! the PPE roll-forward; `ReconciledCashFlow` back-solves capex so the total
//! net cash flow matches the balance sheet's realized cash delta exactly.
//! Both report FCF as operating plus investing cash flow.

use chrono::NaiveDate;
use tracing::warn;
use valuation_core::{
    BalanceSheet, CashFlowRecord, IncomeStatement, NopatRecord, NwcRecord, ShareholderReturns,
    ValuationError, TRAILING_WINDOW,
};

use historical_stats::{average_buyback_ratio, average_dividend_ratio, trailing};

/// Extended series feeding a cash-flow projection. All series must cover the
/// projected periods; records are matched by period date.
pub struct CashFlowInputs<'a> {
    pub extended_pl: &'a [IncomeStatement],
    pub extended_bs: &'a [BalanceSheet],
    pub extended_nopat: &'a [NopatRecord],
    pub extended_nwc: &'a [NwcRecord],
    pub returns: &'a [ShareholderReturns],
    /// Most recent historical period; everything after it is a projection
    pub base_period: NaiveDate,
}

/// One period's worth of aligned records plus its predecessor.
struct PeriodView<'a> {
    pl: &'a IncomeStatement,
    bs: &'a BalanceSheet,
    nopat: &'a NopatRecord,
    nwc: &'a NwcRecord,
    prev_pl: &'a IncomeStatement,
    prev_bs: &'a BalanceSheet,
    prev_nwc: &'a NwcRecord,
    /// True for the first projected period, whose delta-based fields are
    /// defined as zero
    first: bool,
}

fn find_by_period<'a, T>(
    series: &'a [T],
    period: NaiveDate,
    name: &str,
    period_of: impl Fn(&T) -> NaiveDate,
) -> Result<&'a T, ValuationError> {
    series
        .iter()
        .find(|item| period_of(item) == period)
        .ok_or_else(|| {
            ValuationError::MisalignedSeries(format!("{name} series has no record for {period}"))
        })
}

fn projected_views<'a>(
    inputs: &'a CashFlowInputs<'a>,
) -> Result<Vec<PeriodView<'a>>, ValuationError> {
    let mut views = Vec::new();
    let mut prev_period = inputs.base_period;
    let mut first = true;
    for pl in inputs
        .extended_pl
        .iter()
        .filter(|p| p.period > inputs.base_period)
    {
        let period = pl.period;
        views.push(PeriodView {
            pl,
            bs: find_by_period(inputs.extended_bs, period, "balance sheet", |b| b.period)?,
            nopat: find_by_period(inputs.extended_nopat, period, "NOPAT", |n| n.period)?,
            nwc: find_by_period(inputs.extended_nwc, period, "NWC", |n| n.period)?,
            prev_pl: find_by_period(inputs.extended_pl, prev_period, "income statement", |p| {
                p.period
            })?,
            prev_bs: find_by_period(inputs.extended_bs, prev_period, "balance sheet", |b| {
                b.period
            })?,
            prev_nwc: find_by_period(inputs.extended_nwc, prev_period, "NWC", |n| n.period)?,
            first,
        });
        prev_period = period;
        first = false;
    }
    if views.is_empty() {
        return Err(ValuationError::EmptySeries(
            "no projected periods beyond the base period".to_string(),
        ));
    }
    Ok(views)
}

impl PeriodView<'_> {
    fn nopat(&self) -> f64 {
        self.nopat.nopat.unwrap_or(0.0)
    }

    fn depreciation(&self) -> f64 {
        self.pl.depreciation_amortization.unwrap_or(0.0)
    }

    fn delta_nwc(&self) -> f64 {
        if self.first {
            0.0
        } else {
            self.nwc.nwc - self.prev_nwc.nwc
        }
    }

    fn delta(&self, field: impl Fn(&BalanceSheet) -> Option<f64>) -> f64 {
        if self.first {
            0.0
        } else {
            field(self.bs).unwrap_or(0.0) - field(self.prev_bs).unwrap_or(0.0)
        }
    }

    fn operating_cf(&self) -> f64 {
        self.nopat() + self.depreciation() - self.delta_nwc()
    }
}

/// A cash-flow reconciliation strategy.
pub trait CashFlowStrategy {
    fn name(&self) -> &'static str;

    /// Project cash flows for every period after the base period.
    fn project(&self, inputs: &CashFlowInputs<'_>) -> Result<Vec<CashFlowRecord>, ValuationError>;
}

/// Capex implied purely by the PPE roll-forward; no financing or
/// non-operating flows are modeled.
#[derive(Debug, Default)]
pub struct DirectCashFlow;

impl CashFlowStrategy for DirectCashFlow {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn project(&self, inputs: &CashFlowInputs<'_>) -> Result<Vec<CashFlowRecord>, ValuationError> {
        let records = projected_views(inputs)?
            .iter()
            .map(|view| {
                let operating_cf = view.operating_cf();
                let capex = view.delta(|b| b.ppe);
                let investing_cf = -capex;
                CashFlowRecord {
                    period: view.pl.period,
                    nopat: view.nopat(),
                    depreciation: view.depreciation(),
                    delta_nwc: view.delta_nwc(),
                    operating_cf,
                    non_operating_cf: 0.0,
                    capex,
                    investing_cf,
                    financing_cf: 0.0,
                    fcf: operating_cf + investing_cf,
                    cash_discrepancy: 0.0,
                }
            })
            .collect();
        Ok(records)
    }
}

/// Back-solves capex so operating + investing + non-operating + financing
/// cash flow reconciles exactly to the balance-sheet cash delta.
#[derive(Debug, Default)]
pub struct ReconciledCashFlow;

impl CashFlowStrategy for ReconciledCashFlow {
    fn name(&self) -> &'static str {
        "reconciled"
    }

    fn project(&self, inputs: &CashFlowInputs<'_>) -> Result<Vec<CashFlowRecord>, ValuationError> {
        // Payout ratios for periods beyond the actual returns data
        let historical_pl: Vec<IncomeStatement> = inputs
            .extended_pl
            .iter()
            .filter(|p| p.period <= inputs.base_period)
            .cloned()
            .collect();
        let recent_pl = trailing(&historical_pl, TRAILING_WINDOW);
        let dividend_ratio = average_dividend_ratio(recent_pl, inputs.returns);
        let buyback_ratio = average_buyback_ratio(recent_pl, inputs.returns);

        let records = projected_views(inputs)?
            .iter()
            .map(|view| {
                let period = view.pl.period;
                let nopat = view.nopat();
                let operating_cf = view.operating_cf();
                // After-tax non-operating flows are whatever separates net
                // income from NOPAT
                let non_operating_cf = view.pl.net_income.unwrap_or(0.0) - nopat;

                if view.first {
                    return CashFlowRecord {
                        period,
                        nopat,
                        depreciation: view.depreciation(),
                        delta_nwc: 0.0,
                        operating_cf,
                        non_operating_cf,
                        capex: 0.0,
                        investing_cf: 0.0,
                        financing_cf: 0.0,
                        fcf: operating_cf,
                        cash_discrepancy: 0.0,
                    };
                }

                let (dividends, buybacks) = match inputs
                    .returns
                    .iter()
                    .find(|r| r.period == period)
                {
                    Some(actual) => (
                        actual.dividends_paid.unwrap_or(0.0),
                        actual.stock_buyback.unwrap_or(0.0),
                    ),
                    None => {
                        let prior_net_income = view.prev_pl.net_income.unwrap_or(0.0);
                        (
                            prior_net_income * dividend_ratio,
                            prior_net_income * buyback_ratio,
                        )
                    }
                };

                let delta_debt = view.delta(|b| Some(b.interest_bearing_debt()));
                let financing_cf = delta_debt - (dividends + buybacks);

                let delta_intangibles = view.delta(|b| b.intangible_assets);
                let delta_short_term_investments = view.delta(|b| b.short_term_investments);
                let delta_long_term_investments = view.delta(|b| b.long_term_investments);
                let cash_delta = view.delta(|b| b.cash_and_equivalents);

                // Solve capex so the statement reconciles to the cash delta
                let capex = operating_cf + non_operating_cf + financing_cf
                    - delta_intangibles
                    - delta_short_term_investments
                    - delta_long_term_investments
                    - cash_delta;
                let investing_cf = -capex
                    - delta_intangibles
                    - delta_short_term_investments
                    - delta_long_term_investments;

                let net_cf = operating_cf + non_operating_cf + investing_cf + financing_cf;
                let cash_discrepancy = cash_delta - net_cf;
                if cash_discrepancy.abs() > 1e-6 * cash_delta.abs().max(1.0) {
                    warn!(
                        %period,
                        cash_discrepancy, "reconciled cash flow does not match cash delta"
                    );
                }

                CashFlowRecord {
                    period,
                    nopat,
                    depreciation: view.depreciation(),
                    delta_nwc: view.delta_nwc(),
                    operating_cf,
                    non_operating_cf,
                    capex,
                    investing_cf,
                    financing_cf,
                    fcf: operating_cf + investing_cf,
                    cash_discrepancy,
                }
            })
            .collect();
        Ok(records)
    }
}
