use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::valuation::amortization::remaining_balance;
use crate::valuation::inputs::ValuationInputs;
use crate::valuation::structure::{DealSummary, DebtService};

/// A single year in the hold-period projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearProjection {
    pub year: u32,
    pub revenue: Money,
    pub ebitda: Money,
    pub adjusted_ebitda: Money,
    pub debt_service: Money,
    pub dscr: Coverage,
    pub pre_tax_cash_flow: Money,
    pub free_cash_flow: Money,
    pub cumulative_fcf: Money,
    pub remaining_debt: Money,
    /// Equity value of a hypothetical exit at the end of this year
    pub equity_value: Money,
    /// None when the equity check is not positive
    pub moic: Option<Multiple>,
}

/// Build the year-by-year projection for years 1 through
/// [`ValuationInputs::projection_years`].
pub fn build_projection(
    inputs: &ValuationInputs,
    deal: &DealSummary,
    debt: &DebtService,
) -> Vec<YearProjection> {
    let years = inputs.projection_years();
    let margin = inputs.effective_ebitda_margin();
    let growth = Decimal::ONE.saturating_add(inputs.revenue_growth_rate);
    let recurring_synergies = inputs
        .synergy_sg_a_savings
        .saturating_add(inputs.synergy_procurement);
    let year_one_normalisation = inputs
        .existing_owner_excess_comp
        .saturating_add(inputs.one_time_adjustments)
        .saturating_sub(inputs.owner_salary);
    let after_tax_share = Decimal::ONE.saturating_sub(inputs.tax_rate);

    let mut rows = Vec::with_capacity(years as usize);
    let mut revenue = inputs.target_revenue;
    let mut cumulative_fcf = Decimal::ZERO;

    // Sums and products saturate at the decimal range so extreme inputs
    // still produce a full table.
    for year in 1..=years {
        if year > 1 {
            revenue = revenue.saturating_mul(growth);
        }
        if year == 2 {
            revenue = revenue.saturating_add(inputs.year_2_bolt_on_revenue);
        }

        let ebitda = revenue.saturating_mul(margin);
        let mut adjusted_ebitda = ebitda
            .saturating_add(recurring_synergies)
            .saturating_add(revenue.saturating_mul(inputs.synergy_cross_sell_pct));
        if year == 1 {
            adjusted_ebitda = adjusted_ebitda.saturating_add(year_one_normalisation);
        }

        let debt_service = debt.in_year(inputs, year);
        let mut pre_tax_cash_flow = adjusted_ebitda
            .saturating_sub(debt_service)
            .saturating_sub(inputs.capex_annual);
        if year == 2 {
            pre_tax_cash_flow = pre_tax_cash_flow.saturating_sub(inputs.year_2_bolt_on_cost);
        }

        // Losses carry no tax benefit
        let free_cash_flow = if pre_tax_cash_flow > Decimal::ZERO {
            pre_tax_cash_flow.saturating_mul(after_tax_share)
        } else {
            pre_tax_cash_flow
        };
        cumulative_fcf = cumulative_fcf.saturating_add(free_cash_flow);

        let remaining_debt = outstanding_debt(inputs, deal, year);
        let equity_value = ebitda
            .saturating_mul(inputs.exit_multiple)
            .saturating_sub(remaining_debt)
            .saturating_add(cumulative_fcf);

        rows.push(YearProjection {
            year,
            revenue,
            ebitda,
            adjusted_ebitda,
            debt_service,
            dscr: Coverage::of(adjusted_ebitda, debt_service),
            pre_tax_cash_flow,
            free_cash_flow,
            cumulative_fcf,
            remaining_debt,
            equity_value,
            moic: multiple_of_equity(equity_value, deal.equity_check),
        });
    }

    rows
}

/// Combined bank and seller-note balance at the end of `year`.
pub fn outstanding_debt(inputs: &ValuationInputs, deal: &DealSummary, year: u32) -> Money {
    let months = year.saturating_mul(12);
    let bank = remaining_balance(
        deal.bank_debt,
        inputs.bank_interest_rate,
        inputs.bank_term_years,
        months,
    );
    let seller = remaining_balance(
        deal.seller_note,
        inputs.seller_note_rate,
        inputs.seller_note_term,
        months,
    );
    bank.saturating_add(seller)
}

/// `value / equity_check`, or None when no positive equity was invested.
pub(crate) fn multiple_of_equity(value: Money, equity_check: Money) -> Option<Multiple> {
    if equity_check > Decimal::ZERO {
        Some(saturating_div(value, equity_check))
    } else {
        None
    }
}
