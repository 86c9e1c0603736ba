use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::time_value::{self, IRR_SEED};
use crate::types::*;
use crate::valuation::inputs::ValuationInputs;
use crate::valuation::projection::{multiple_of_equity, YearProjection};
use crate::valuation::structure::DealSummary;

/// Returns to the buyer at the chosen exit year
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExitAnalysis {
    pub exit_revenue: Money,
    pub exit_ebitda: Money,
    pub exit_ev: Money,
    pub remaining_debt_at_exit: Money,
    pub equity_to_buyer: Money,
    pub cumulative_fcf: Money,
    pub total_return: Money,
    /// None when the equity check is not positive
    pub moic: Option<Multiple>,
    /// None when the solver finds no rate
    pub irr: Option<Rate>,
}

/// Value the exit at `exit_year` from an already-built projection.
///
/// A projection that stops before the exit year yields an empty analysis.
pub fn analyze_exit(
    inputs: &ValuationInputs,
    deal: &DealSummary,
    projection: &[YearProjection],
) -> ExitAnalysis {
    let exit_year = inputs.effective_exit_year();
    let Some(at_exit) = projection.get(exit_year as usize - 1) else {
        return ExitAnalysis::default();
    };

    let exit_ev = at_exit.ebitda.saturating_mul(inputs.exit_multiple);
    let equity_to_buyer = exit_ev.saturating_sub(at_exit.remaining_debt);
    let total_return = equity_to_buyer.saturating_add(at_exit.cumulative_fcf);

    let irr = if deal.equity_check > Decimal::ZERO {
        let hold_period = &projection[..exit_year as usize];
        let flows = equity_cash_flows(deal.equity_check, hold_period, equity_to_buyer);
        match time_value::irr(&flows, IRR_SEED) {
            Ok(rate) => Some(rate),
            Err(e) => {
                tracing::debug!(exit_year, error = %e, "IRR unavailable");
                None
            }
        }
    } else {
        None
    };

    ExitAnalysis {
        exit_revenue: at_exit.revenue,
        exit_ebitda: at_exit.ebitda,
        exit_ev,
        remaining_debt_at_exit: at_exit.remaining_debt,
        equity_to_buyer,
        cumulative_fcf: at_exit.cumulative_fcf,
        total_return,
        moic: multiple_of_equity(total_return, deal.equity_check),
        irr,
    }
}

/// Buyer's equity cash flows: the equity check out at t=0, each year's free
/// cash flow, and exit proceeds on top of the final year's flow.
pub fn equity_cash_flows(
    equity_check: Money,
    hold_period: &[YearProjection],
    equity_to_buyer: Money,
) -> Vec<Money> {
    let mut flows = Vec::with_capacity(hold_period.len() + 1);
    flows.push(-equity_check);
    flows.extend(hold_period.iter().map(|row| row.free_cash_flow));
    if !hold_period.is_empty() {
        if let Some(last) = flows.last_mut() {
            *last = last.saturating_add(equity_to_buyer);
        }
    }
    flows
}
