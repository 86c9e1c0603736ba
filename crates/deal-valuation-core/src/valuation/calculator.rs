use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::types::*;
use crate::valuation::exit::{analyze_exit, ExitAnalysis};
use crate::valuation::inputs::{ValuationInputs, MAX_PROJECTION_YEARS};
use crate::valuation::projection::{build_projection, YearProjection};
use crate::valuation::structure::{DealSummary, DebtService};

/// Year-one DSCR below which lenders usually push back.
const MIN_COMFORTABLE_DSCR: Multiple = dec!(1.25);

/// Tolerance on the capital-structure percentages before warning.
const CAPITAL_STRUCTURE_TOLERANCE: Rate = dec!(0.0001);

/// Year-one cash flow snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSummary {
    /// Year-one EBITDA after synergies and owner normalisation
    pub adjusted_ebitda: Money,
    pub pre_tax_cash_flow: Money,
    pub after_tax_cash_flow: Money,
    /// Adjusted EBITDA over total annual debt service
    pub dscr: Coverage,
}

/// Complete result of one valuation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationOutputs {
    pub deal: DealSummary,
    pub debt: DebtService,
    pub cash_flow: CashFlowSummary,
    pub projection: Vec<YearProjection>,
    pub exit: ExitAnalysis,
}

/// Value an acquisition from one set of assumptions.
///
/// Never fails: out-of-range assumptions produce degenerate but fully
/// populated outputs, so callers can recompute on every edit.
pub fn calculate_valuation(inputs: &ValuationInputs) -> ValuationOutputs {
    let deal = DealSummary::from_inputs(inputs);
    let debt = DebtService::from_deal(inputs, &deal);
    let projection = build_projection(inputs, &deal, &debt);

    let cash_flow = match projection.first() {
        Some(year_one) => CashFlowSummary {
            adjusted_ebitda: year_one.adjusted_ebitda,
            pre_tax_cash_flow: year_one.pre_tax_cash_flow,
            after_tax_cash_flow: year_one.free_cash_flow,
            dscr: Coverage::of(year_one.adjusted_ebitda, debt.total_annual_debt_service),
        },
        None => CashFlowSummary {
            adjusted_ebitda: Decimal::ZERO,
            pre_tax_cash_flow: Decimal::ZERO,
            after_tax_cash_flow: Decimal::ZERO,
            dscr: Coverage::Unbounded,
        },
    };

    let exit = analyze_exit(inputs, &deal, &projection);

    tracing::debug!(
        enterprise_value = %deal.enterprise_value,
        years = projection.len(),
        irr = ?exit.irr,
        "valuation calculated"
    );

    ValuationOutputs {
        deal,
        debt,
        cash_flow,
        projection,
        exit,
    }
}

/// [`calculate_valuation`] wrapped in the standard output envelope, with
/// advisory warnings for the presentation layer.
pub fn run_valuation(inputs: &ValuationInputs) -> ComputationOutput<ValuationOutputs> {
    let start = Instant::now();
    let outputs = calculate_valuation(inputs);
    let warnings = advisory_warnings(inputs, &outputs);
    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Acquisition valuation: amortising debt, projected FCF, exit MOIC/IRR",
        &serde_json::json!({
            "entry_multiple": inputs.entry_multiple.to_string(),
            "exit_multiple": inputs.exit_multiple.to_string(),
            "exit_year": inputs.effective_exit_year(),
            "ebitda_margin": inputs.effective_ebitda_margin().to_string(),
            "capital_structure_total": inputs.capital_structure_total().to_string(),
        }),
        warnings,
        elapsed,
        outputs,
    )
}

fn advisory_warnings(inputs: &ValuationInputs, outputs: &ValuationOutputs) -> Vec<String> {
    let mut warnings = Vec::new();

    let total = inputs.capital_structure_total();
    if total.saturating_sub(Decimal::ONE).abs() > CAPITAL_STRUCTURE_TOLERANCE {
        warnings.push(format!(
            "Capital structure sums to {} rather than 100%",
            total.normalize()
        ));
    }
    if inputs.exit_year == 0 {
        warnings.push("Exit year 0 treated as year 1".into());
    }
    if inputs.exit_year > MAX_PROJECTION_YEARS {
        warnings.push(format!(
            "Exit year {} capped at {MAX_PROJECTION_YEARS}",
            inputs.exit_year
        ));
    }
    if outputs.cash_flow.after_tax_cash_flow < Decimal::ZERO {
        warnings.push(format!(
            "Year-one cash flow is negative ({})",
            outputs.cash_flow.after_tax_cash_flow.round_dp(2)
        ));
    }
    if let Some(dscr) = outputs.cash_flow.dscr.ratio() {
        if dscr < MIN_COMFORTABLE_DSCR {
            warnings.push(format!("Year-one DSCR of {}x is below 1.25x", dscr.round_dp(2)));
        }
    }
    if outputs.exit.irr.is_none() && outputs.deal.equity_check > Decimal::ZERO {
        warnings.push("IRR could not be solved for these cash flows".into());
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inputs() -> ValuationInputs {
        ValuationInputs {
            target_revenue: dec!(2000000),
            target_ebitda: dec!(500000),
            revenue_growth_rate: dec!(0.05),
            ..Default::default()
        }
    }

    #[test]
    fn test_cash_flow_is_year_one_slice() {
        let out = calculate_valuation(&inputs());
        let year_one = &out.projection[0];
        assert_eq!(out.cash_flow.adjusted_ebitda, year_one.adjusted_ebitda);
        assert_eq!(out.cash_flow.pre_tax_cash_flow, year_one.pre_tax_cash_flow);
        assert_eq!(out.cash_flow.after_tax_cash_flow, year_one.free_cash_flow);
        assert_eq!(
            out.cash_flow.dscr,
            Coverage::Ratio(year_one.adjusted_ebitda / out.debt.total_annual_debt_service)
        );
    }

    #[test]
    fn test_clean_deal_has_no_warnings() {
        let out = run_valuation(&inputs());
        assert!(out.warnings.is_empty(), "unexpected warnings: {:?}", out.warnings);
    }

    #[test]
    fn test_capital_structure_warning_does_not_reject() {
        let mut i = inputs();
        i.seller_note_pct = dec!(0.20);
        let out = run_valuation(&i);
        assert!(out.warnings.iter().any(|w| w.contains("Capital structure")));
        assert_eq!(out.result.deal.seller_note, dec!(400000));
    }

    #[test]
    fn test_degenerate_inputs_are_defined() {
        let garbage = ValuationInputs {
            target_revenue: dec!(-100),
            target_ebitda: dec!(-50),
            entry_multiple: Decimal::ZERO,
            equity_pct: dec!(3),
            exit_year: 0,
            ..Default::default()
        };
        let out = calculate_valuation(&garbage);
        assert_eq!(out.projection.len(), 7);
        assert_eq!(out.deal.enterprise_value, Decimal::ZERO);
        assert_eq!(out.exit.irr, None);
        assert_eq!(out.exit.moic, None);
    }

    #[test]
    fn test_exit_year_beyond_cap_warns() {
        let mut i = inputs();
        i.exit_year = u32::MAX;
        let out = run_valuation(&i);
        assert_eq!(out.result.projection.len(), MAX_PROJECTION_YEARS as usize);
        assert_eq!(out.result.exit.exit_revenue, out.result.projection[49].revenue);
        assert!(out.warnings.iter().any(|w| w.contains("capped at 50")));
    }
}
