use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::valuation::amortization::amortize;
use crate::valuation::inputs::ValuationInputs;

/// Purchase price and how it is funded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealSummary {
    pub enterprise_value: Money,
    pub equity_check: Money,
    pub bank_debt: Money,
    pub seller_note: Money,
}

impl DealSummary {
    /// Split the entry enterprise value by the capital-structure
    /// percentages. The percentages are used as given, even when they do not
    /// sum to 1.
    pub fn from_inputs(inputs: &ValuationInputs) -> Self {
        let enterprise_value = inputs.entry_multiple.saturating_mul(inputs.target_ebitda);
        Self {
            enterprise_value,
            equity_check: enterprise_value.saturating_mul(inputs.equity_pct),
            bank_debt: enterprise_value.saturating_mul(inputs.bank_debt_pct),
            seller_note: enterprise_value.saturating_mul(inputs.seller_note_pct),
        }
    }
}

/// Level payments on the two debt tranches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtService {
    pub bank_annual_payment: Money,
    pub bank_monthly_payment: Money,
    pub seller_annual_payment: Money,
    pub seller_monthly_payment: Money,
    pub total_annual_debt_service: Money,
}

impl DebtService {
    pub fn from_deal(inputs: &ValuationInputs, deal: &DealSummary) -> Self {
        let bank = amortize(deal.bank_debt, inputs.bank_interest_rate, inputs.bank_term_years);
        let seller = amortize(
            deal.seller_note,
            inputs.seller_note_rate,
            inputs.seller_note_term,
        );
        Self {
            bank_annual_payment: bank.annual_payment,
            bank_monthly_payment: bank.monthly_payment,
            seller_annual_payment: seller.annual_payment,
            seller_monthly_payment: seller.monthly_payment,
            total_annual_debt_service: bank.annual_payment.saturating_add(seller.annual_payment),
        }
    }

    /// Debt service falling due in `year`; each tranche stops after its term.
    pub fn in_year(&self, inputs: &ValuationInputs, year: u32) -> Money {
        let mut total = Money::ZERO;
        if year <= inputs.bank_term_years {
            total = total.saturating_add(self.bank_annual_payment);
        }
        if year <= inputs.seller_note_term {
            total = total.saturating_add(self.seller_annual_payment);
        }
        total
    }
}
