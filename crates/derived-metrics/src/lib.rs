//! Derived-Metric Calculator
//!
//! NOPAT, net working capital, invested capital and financial ratios, each
//! computed per period from the canonical statements. Every record here is a
//! pure function result and can always be recomputed from its inputs.

use serde::{Deserialize, Serialize};
use valuation_core::{
    BalanceSheet, IncomeStatement, InvestedCapitalRecord, NopatRecord, NwcRecord, RatioRecord,
    DAYS_PER_YEAR,
};

/// Tax treatment of non-operating items in the NOPAT calculation.
///
/// The default backs out the tax shield on interest and other non-operating
/// items at the blended effective rate. That rate equality is a modeling
/// assumption, not an accounting identity, so it can be switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NopatConfig {
    /// Apply the effective tax rate to non-operating items when isolating the
    /// tax attributable to operations
    pub shield_non_operating: bool,
}

impl Default for NopatConfig {
    fn default() -> Self {
        Self {
            shield_non_operating: true,
        }
    }
}

/// NOPAT per period with the default tax treatment.
pub fn compute_nopat(pl: &[IncomeStatement]) -> Vec<NopatRecord> {
    compute_nopat_with(pl, NopatConfig::default())
}

/// NOPAT per period.
///
/// The effective tax rate is income tax / income before tax; when income
/// before tax is zero or either input is absent the rate, the operating tax
/// and NOPAT are all `None`. Callers must exclude such periods from
/// downstream averaging.
pub fn compute_nopat_with(pl: &[IncomeStatement], config: NopatConfig) -> Vec<NopatRecord> {
    pl.iter()
        .map(|p| {
            let effective_tax_rate = match (p.income_tax, p.income_before_tax) {
                (Some(tax), Some(ibt)) if ibt != 0.0 => Some(tax / ibt),
                _ => None,
            };

            let tax_on_operating_income = effective_tax_rate.map(|rate| {
                let tax = p.income_tax.unwrap_or(0.0);
                if config.shield_non_operating {
                    tax - rate * p.interest_income.unwrap_or(0.0)
                        + rate * p.interest_expense.unwrap_or(0.0)
                        - rate * p.other_non_operating.unwrap_or(0.0)
                } else {
                    tax
                }
            });

            let nopat = match (p.operating_income, tax_on_operating_income) {
                (Some(oi), Some(tax)) => Some(oi - tax),
                _ => None,
            };

            NopatRecord {
                period: p.period,
                revenue: p.revenue,
                operating_income: p.operating_income,
                income_tax: p.income_tax,
                effective_tax_rate,
                tax_on_operating_income,
                nopat,
            }
        })
        .collect()
}

/// Net working capital per period: short-term operating assets minus
/// short-term operating liabilities, absent components as zero.
pub fn compute_nwc(bs: &[BalanceSheet]) -> Vec<NwcRecord> {
    bs.iter()
        .map(|b| {
            let net_receivables = b.net_receivables.unwrap_or(0.0);
            let inventory = b.inventory.unwrap_or(0.0);
            let other_current_assets = b.other_current_assets.unwrap_or(0.0);
            let accounts_payable = b.accounts_payable.unwrap_or(0.0);
            let deferred_revenue = b.deferred_revenue.unwrap_or(0.0);
            let other_current_liabilities = b.other_current_liabilities.unwrap_or(0.0);
            NwcRecord {
                period: b.period,
                net_receivables,
                inventory,
                other_current_assets,
                accounts_payable,
                deferred_revenue,
                other_current_liabilities,
                nwc: net_receivables + inventory + other_current_assets
                    - accounts_payable
                    - deferred_revenue
                    - other_current_liabilities,
            }
        })
        .collect()
}

/// Invested capital per period: interest-bearing debt plus total equity.
pub fn compute_invested_capital(bs: &[BalanceSheet]) -> Vec<InvestedCapitalRecord> {
    bs.iter()
        .map(|b| {
            let short_term_debt = b.short_term_debt.unwrap_or(0.0);
            let long_term_debt = b.long_term_debt.unwrap_or(0.0);
            let total_equity = b.total_equity.unwrap_or(0.0);
            InvestedCapitalRecord {
                period: b.period,
                short_term_debt,
                long_term_debt,
                total_equity,
                invested_capital: short_term_debt + long_term_debt + total_equity,
            }
        })
        .collect()
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

fn days(balance: Option<f64>, revenue: Option<f64>) -> Option<f64> {
    ratio(balance.map(|b| DAYS_PER_YEAR * b), revenue)
}

/// Financial ratios per period, aligned across the input series by period
/// date. Periods missing from any input are skipped; ratios with a zero
/// denominator are `None`.
pub fn compute_ratios(
    pl: &[IncomeStatement],
    bs: &[BalanceSheet],
    nopat: &[NopatRecord],
    nwc: &[NwcRecord],
    ic: &[InvestedCapitalRecord],
) -> Vec<RatioRecord> {
    pl.iter()
        .filter_map(|p| {
            let b = bs.iter().find(|b| b.period == p.period)?;
            let np = nopat.iter().find(|n| n.period == p.period)?;
            let w = nwc.iter().find(|n| n.period == p.period)?;
            let c = ic.iter().find(|i| i.period == p.period)?;

            let invested_capital = Some(c.invested_capital);
            // Whatever invested capital is not explained by NWC, PPE or
            // intangibles, expressed in days of revenue
            let other_invested_capital = Some(
                c.invested_capital
                    - (w.nwc + b.ppe.unwrap_or(0.0) + b.intangible_assets.unwrap_or(0.0)),
            );

            Some(RatioRecord {
                period: p.period,
                pre_tax_roic: ratio(p.operating_income, invested_capital),
                roic: ratio(np.nopat, invested_capital),
                roe: ratio(p.net_income, b.total_equity),
                roa: ratio(p.net_income, b.total_assets),
                operating_margin: ratio(p.operating_income, p.revenue),
                cost_ratio: ratio(p.cost_of_revenue, p.revenue),
                sg_and_a_ratio: ratio(p.sg_and_a, p.revenue),
                capital_turnover: ratio(p.revenue, invested_capital),
                nwc_days: days(Some(w.nwc), p.revenue),
                ppe_days: days(b.ppe, p.revenue),
                intangible_days: days(b.intangible_assets, p.revenue),
                other_capital_days: days(other_invested_capital, p.revenue),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, 12, 31).unwrap()
    }

    fn pl(year: i32) -> IncomeStatement {
        IncomeStatement {
            period: date(year),
            revenue: Some(1000.0),
            cost_of_revenue: Some(400.0),
            sg_and_a: Some(200.0),
            depreciation_amortization: Some(50.0),
            operating_income: Some(350.0),
            interest_income: Some(20.0),
            interest_expense: Some(10.0),
            other_non_operating: Some(5.0),
            income_before_tax: Some(365.0),
            income_tax: Some(73.0),
            net_income: Some(292.0),
        }
    }

    fn bs(year: i32) -> BalanceSheet {
        BalanceSheet {
            period: date(year),
            cash_and_equivalents: Some(100.0),
            short_term_investments: Some(30.0),
            net_receivables: Some(120.0),
            inventory: Some(80.0),
            other_current_assets: Some(40.0),
            ppe: Some(500.0),
            long_term_investments: Some(60.0),
            intangible_assets: Some(90.0),
            other_noncurrent_assets: Some(20.0),
            total_assets: Some(1040.0),
            short_term_debt: Some(50.0),
            accounts_payable: Some(70.0),
            deferred_revenue: Some(25.0),
            other_current_liabilities: Some(35.0),
            long_term_debt: Some(200.0),
            other_noncurrent_liabilities: Some(60.0),
            total_liabilities: Some(440.0),
            common_stock: Some(100.0),
            retained_earnings: Some(500.0),
            aoci: Some(0.0),
            capital_surplus: Some(0.0),
            total_equity: Some(600.0),
        }
    }

    #[test]
    fn test_nopat_backs_out_non_operating_tax_shield() {
        let records = compute_nopat(&[pl(2023)]);
        let r = &records[0];
        // rate = 73 / 365 = 0.2
        assert!((r.effective_tax_rate.unwrap() - 0.2).abs() < 1e-12);
        // tax on operations = 73 - 0.2*20 + 0.2*10 - 0.2*5 = 70
        assert!((r.tax_on_operating_income.unwrap() - 70.0).abs() < 1e-9);
        // NOPAT = 350 - 70
        assert!((r.nopat.unwrap() - 280.0).abs() < 1e-9);
    }

    #[test]
    fn test_nopat_without_shield_uses_full_tax() {
        let config = NopatConfig {
            shield_non_operating: false,
        };
        let records = compute_nopat_with(&[pl(2023)], config);
        assert!((records[0].nopat.unwrap() - 277.0).abs() < 1e-9);
    }

    #[test]
    fn test_nopat_undefined_when_pretax_income_zero() {
        let mut p = pl(2023);
        p.income_before_tax = Some(0.0);
        let records = compute_nopat(&[p]);
        assert_eq!(records[0].effective_tax_rate, None);
        assert_eq!(records[0].nopat, None);
    }

    #[test]
    fn test_nwc_algebraic_identity() {
        for record in compute_nwc(&[bs(2022), bs(2023)]) {
            let residual = record.nwc + record.accounts_payable + record.deferred_revenue
                + record.other_current_liabilities
                - record.net_receivables
                - record.inventory
                - record.other_current_assets;
            assert!(residual.abs() < 1e-9);
        }
    }

    #[test]
    fn test_invested_capital_sums_debt_and_equity() {
        let records = compute_invested_capital(&[bs(2023)]);
        assert!((records[0].invested_capital - 850.0).abs() < 1e-9);
    }

    #[test]
    fn test_ratios_known_values() {
        let pls = [pl(2023)];
        let bss = [bs(2023)];
        let nopat = compute_nopat(&pls);
        let nwc = compute_nwc(&bss);
        let ic = compute_invested_capital(&bss);
        let ratios = compute_ratios(&pls, &bss, &nopat, &nwc, &ic);
        let r = &ratios[0];

        assert!((r.operating_margin.unwrap() - 0.35).abs() < 1e-12);
        assert!((r.roic.unwrap() - 280.0 / 850.0).abs() < 1e-12);
        assert!((r.roe.unwrap() - 292.0 / 600.0).abs() < 1e-12);
        // NWC = 120+80+40-70-25-35 = 110; days = 365*110/1000
        assert!((r.nwc_days.unwrap() - 40.15).abs() < 1e-9);
    }

    #[test]
    fn test_ratios_zero_denominator_is_none() {
        let mut p = pl(2023);
        p.revenue = Some(0.0);
        let pls = [p];
        let bss = [bs(2023)];
        let nopat = compute_nopat(&pls);
        let nwc = compute_nwc(&bss);
        let ic = compute_invested_capital(&bss);
        let ratios = compute_ratios(&pls, &bss, &nopat, &nwc, &ic);

        assert_eq!(ratios[0].operating_margin, None);
        assert_eq!(ratios[0].nwc_days, None);
        // Invested capital is nonzero, so ROIC is still defined
        assert!(ratios[0].roic.is_some());
    }

    #[test]
    fn test_ratios_skip_unmatched_periods() {
        let pls = [pl(2022), pl(2023)];
        let bss = [bs(2023)];
        let nopat = compute_nopat(&pls);
        let nwc = compute_nwc(&bss);
        let ic = compute_invested_capital(&bss);
        let ratios = compute_ratios(&pls, &bss, &nopat, &nwc, &ic);
        assert_eq!(ratios.len(), 1);
        assert_eq!(ratios[0].period, date(2023));
    }
}
