use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::types::*;

/// Shortest projection the dashboard displays, regardless of exit year.
pub const MIN_PROJECTION_YEARS: u32 = 7;

/// Longest hold period modelled; later exit years are clamped to it.
pub const MAX_PROJECTION_YEARS: u32 = 50;

/// Acquisition assumptions for a single valuation run.
///
/// Missing fields deserialize from [`ValuationInputs::default`], so a partial
/// document only has to carry what differs from the house defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationInputs {
    // Target financials
    pub target_revenue: Money,
    pub target_ebitda: Money,
    /// Used only when `target_revenue` is not positive; otherwise the margin
    /// is derived as EBITDA / revenue.
    pub target_ebitda_margin: Rate,
    pub revenue_growth_rate: Rate,

    // Valuation
    /// Entry EV/EBITDA multiple
    pub entry_multiple: Multiple,

    // Capital structure
    pub equity_pct: Rate,
    pub bank_debt_pct: Rate,
    pub seller_note_pct: Rate,
    pub bank_interest_rate: Rate,
    pub bank_term_years: u32,
    pub seller_note_rate: Rate,
    pub seller_note_term: u32,

    // Operating assumptions
    /// Cost of the replacement operator, deducted from year-1 EBITDA
    pub owner_salary: Money,
    /// Owner compensation above market, added back in year 1
    pub existing_owner_excess_comp: Money,
    /// Year-1 normalisation; may be negative
    pub one_time_adjustments: Money,
    pub capex_annual: Money,
    pub tax_rate: Rate,

    // Synergy / growth
    pub year_2_bolt_on_revenue: Money,
    /// One-time cash outlay in year 2
    pub year_2_bolt_on_cost: Money,
    pub synergy_sg_a_savings: Money,
    pub synergy_procurement: Money,
    /// Fraction of each year's revenue added as incremental EBITDA
    pub synergy_cross_sell_pct: Rate,

    // Exit
    pub exit_year: u32,
    pub exit_multiple: Multiple,
}

impl Default for ValuationInputs {
    fn default() -> Self {
        Self {
            target_revenue: Decimal::ZERO,
            target_ebitda: Decimal::ZERO,
            target_ebitda_margin: Decimal::ZERO,
            revenue_growth_rate: Decimal::ZERO,
            entry_multiple: dec!(4.0),
            equity_pct: dec!(0.25),
            bank_debt_pct: dec!(0.65),
            seller_note_pct: dec!(0.10),
            bank_interest_rate: dec!(0.09),
            bank_term_years: 10,
            seller_note_rate: dec!(0.06),
            seller_note_term: 5,
            owner_salary: Decimal::ZERO,
            existing_owner_excess_comp: Decimal::ZERO,
            one_time_adjustments: Decimal::ZERO,
            capex_annual: Decimal::ZERO,
            tax_rate: dec!(0.25),
            year_2_bolt_on_revenue: Decimal::ZERO,
            year_2_bolt_on_cost: Decimal::ZERO,
            synergy_sg_a_savings: Decimal::ZERO,
            synergy_procurement: Decimal::ZERO,
            synergy_cross_sell_pct: Decimal::ZERO,
            exit_year: 5,
            exit_multiple: dec!(6.0),
        }
    }
}

impl ValuationInputs {
    /// EBITDA margin held constant across the projection.
    pub fn effective_ebitda_margin(&self) -> Rate {
        if self.target_revenue > Decimal::ZERO {
            saturating_div(self.target_ebitda, self.target_revenue)
        } else {
            self.target_ebitda_margin
        }
    }

    /// Exit year clamped to `1..=MAX_PROJECTION_YEARS`.
    pub fn effective_exit_year(&self) -> u32 {
        self.exit_year.clamp(1, MAX_PROJECTION_YEARS)
    }

    /// Number of projected years: the exit year, but never fewer than
    /// [`MIN_PROJECTION_YEARS`].
    pub fn projection_years(&self) -> u32 {
        self.effective_exit_year().max(MIN_PROJECTION_YEARS)
    }

    /// Sum of the three capital-structure percentages. Not enforced.
    pub fn capital_structure_total(&self) -> Rate {
        self.equity_pct
            .saturating_add(self.bank_debt_pct)
            .saturating_add(self.seller_note_pct)
    }

    pub fn get(&self, field: InputField) -> Decimal {
        use InputField::*;
        match field {
            TargetRevenue => self.target_revenue,
            TargetEbitda => self.target_ebitda,
            TargetEbitdaMargin => self.target_ebitda_margin,
            RevenueGrowthRate => self.revenue_growth_rate,
            EntryMultiple => self.entry_multiple,
            EquityPct => self.equity_pct,
            BankDebtPct => self.bank_debt_pct,
            SellerNotePct => self.seller_note_pct,
            BankInterestRate => self.bank_interest_rate,
            BankTermYears => Decimal::from(self.bank_term_years),
            SellerNoteRate => self.seller_note_rate,
            SellerNoteTerm => Decimal::from(self.seller_note_term),
            OwnerSalary => self.owner_salary,
            ExistingOwnerExcessComp => self.existing_owner_excess_comp,
            OneTimeAdjustments => self.one_time_adjustments,
            CapexAnnual => self.capex_annual,
            TaxRate => self.tax_rate,
            Year2BoltOnRevenue => self.year_2_bolt_on_revenue,
            Year2BoltOnCost => self.year_2_bolt_on_cost,
            SynergySgASavings => self.synergy_sg_a_savings,
            SynergyProcurement => self.synergy_procurement,
            SynergyCrossSellPct => self.synergy_cross_sell_pct,
            ExitYear => Decimal::from(self.exit_year),
            ExitMultiple => self.exit_multiple,
        }
    }

    /// Set one field in place. Year-count fields take the whole-year part of
    /// `value`; negative values become 0.
    pub fn set(&mut self, field: InputField, value: Decimal) {
        use InputField::*;
        let years = || value.trunc().to_u32().unwrap_or(0);
        match field {
            TargetRevenue => self.target_revenue = value,
            TargetEbitda => self.target_ebitda = value,
            TargetEbitdaMargin => self.target_ebitda_margin = value,
            RevenueGrowthRate => self.revenue_growth_rate = value,
            EntryMultiple => self.entry_multiple = value,
            EquityPct => self.equity_pct = value,
            BankDebtPct => self.bank_debt_pct = value,
            SellerNotePct => self.seller_note_pct = value,
            BankInterestRate => self.bank_interest_rate = value,
            BankTermYears => self.bank_term_years = years(),
            SellerNoteRate => self.seller_note_rate = value,
            SellerNoteTerm => self.seller_note_term = years(),
            OwnerSalary => self.owner_salary = value,
            ExistingOwnerExcessComp => self.existing_owner_excess_comp = value,
            OneTimeAdjustments => self.one_time_adjustments = value,
            CapexAnnual => self.capex_annual = value,
            TaxRate => self.tax_rate = value,
            Year2BoltOnRevenue => self.year_2_bolt_on_revenue = value,
            Year2BoltOnCost => self.year_2_bolt_on_cost = value,
            SynergySgASavings => self.synergy_sg_a_savings = value,
            SynergyProcurement => self.synergy_procurement = value,
            SynergyCrossSellPct => self.synergy_cross_sell_pct = value,
            ExitYear => self.exit_year = years(),
            ExitMultiple => self.exit_multiple = value,
        }
    }

    /// A copy with one field replaced; `self` is untouched.
    pub fn with_override(&self, field: InputField, value: Decimal) -> Self {
        let mut copy = self.clone();
        copy.set(field, value);
        copy
    }
}

/// Addressable numeric field of [`ValuationInputs`], named as in the
/// serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputField {
    TargetRevenue,
    TargetEbitda,
    TargetEbitdaMargin,
    RevenueGrowthRate,
    EntryMultiple,
    EquityPct,
    BankDebtPct,
    SellerNotePct,
    BankInterestRate,
    BankTermYears,
    SellerNoteRate,
    SellerNoteTerm,
    OwnerSalary,
    ExistingOwnerExcessComp,
    OneTimeAdjustments,
    CapexAnnual,
    TaxRate,
    #[serde(rename = "year_2_bolt_on_revenue")]
    Year2BoltOnRevenue,
    #[serde(rename = "year_2_bolt_on_cost")]
    Year2BoltOnCost,
    #[serde(rename = "synergy_sg_a_savings")]
    SynergySgASavings,
    SynergyProcurement,
    SynergyCrossSellPct,
    ExitYear,
    ExitMultiple,
}

impl InputField {
    pub const ALL: [InputField; 24] = [
        InputField::TargetRevenue,
        InputField::TargetEbitda,
        InputField::TargetEbitdaMargin,
        InputField::RevenueGrowthRate,
        InputField::EntryMultiple,
        InputField::EquityPct,
        InputField::BankDebtPct,
        InputField::SellerNotePct,
        InputField::BankInterestRate,
        InputField::BankTermYears,
        InputField::SellerNoteRate,
        InputField::SellerNoteTerm,
        InputField::OwnerSalary,
        InputField::ExistingOwnerExcessComp,
        InputField::OneTimeAdjustments,
        InputField::CapexAnnual,
        InputField::TaxRate,
        InputField::Year2BoltOnRevenue,
        InputField::Year2BoltOnCost,
        InputField::SynergySgASavings,
        InputField::SynergyProcurement,
        InputField::SynergyCrossSellPct,
        InputField::ExitYear,
        InputField::ExitMultiple,
    ];

    pub fn as_str(&self) -> &'static str {
        use InputField::*;
        match self {
            TargetRevenue => "target_revenue",
            TargetEbitda => "target_ebitda",
            TargetEbitdaMargin => "target_ebitda_margin",
            RevenueGrowthRate => "revenue_growth_rate",
            EntryMultiple => "entry_multiple",
            EquityPct => "equity_pct",
            BankDebtPct => "bank_debt_pct",
            SellerNotePct => "seller_note_pct",
            BankInterestRate => "bank_interest_rate",
            BankTermYears => "bank_term_years",
            SellerNoteRate => "seller_note_rate",
            SellerNoteTerm => "seller_note_term",
            OwnerSalary => "owner_salary",
            ExistingOwnerExcessComp => "existing_owner_excess_comp",
            OneTimeAdjustments => "one_time_adjustments",
            CapexAnnual => "capex_annual",
            TaxRate => "tax_rate",
            Year2BoltOnRevenue => "year_2_bolt_on_revenue",
            Year2BoltOnCost => "year_2_bolt_on_cost",
            SynergySgASavings => "synergy_sg_a_savings",
            SynergyProcurement => "synergy_procurement",
            SynergyCrossSellPct => "synergy_cross_sell_pct",
            ExitYear => "exit_year",
            ExitMultiple => "exit_multiple",
        }
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputField {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        InputField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValuationError::UnknownField(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_match_house_assumptions() {
        let d = ValuationInputs::default();
        assert_eq!(d.entry_multiple, dec!(4.0));
        assert_eq!(d.capital_structure_total(), dec!(1.00));
        assert_eq!(d.bank_term_years, 10);
        assert_eq!(d.exit_year, 5);
        assert_eq!(d.exit_multiple, dec!(6.0));
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let inputs: ValuationInputs =
            serde_json::from_str(r#"{"target_ebitda": "500000", "exit_year": 3}"#).unwrap();
        assert_eq!(inputs.target_ebitda, dec!(500000));
        assert_eq!(inputs.exit_year, 3);
        assert_eq!(inputs.bank_debt_pct, dec!(0.65));
    }

    #[test]
    fn test_margin_derived_from_revenue() {
        let inputs = ValuationInputs {
            target_revenue: dec!(2000000),
            target_ebitda: dec!(500000),
            target_ebitda_margin: dec!(0.40),
            ..Default::default()
        };
        assert_eq!(inputs.effective_ebitda_margin(), dec!(0.25));

        let no_revenue = ValuationInputs {
            target_revenue: Decimal::ZERO,
            ..inputs
        };
        assert_eq!(no_revenue.effective_ebitda_margin(), dec!(0.40));
    }

    #[test]
    fn test_projection_years_minimum() {
        let mut inputs = ValuationInputs::default();
        inputs.exit_year = 3;
        assert_eq!(inputs.projection_years(), 7);
        inputs.exit_year = 12;
        assert_eq!(inputs.projection_years(), 12);
        inputs.exit_year = 0;
        assert_eq!(inputs.effective_exit_year(), 1);
    }

    #[test]
    fn test_projection_years_capped() {
        let mut inputs = ValuationInputs::default();
        inputs.exit_year = u32::MAX;
        assert_eq!(inputs.effective_exit_year(), MAX_PROJECTION_YEARS);
        assert_eq!(inputs.projection_years(), MAX_PROJECTION_YEARS);
    }

    #[test]
    fn test_margin_on_tiny_revenue_saturates() {
        let inputs = ValuationInputs {
            target_revenue: dec!(0.00000001),
            target_ebitda: dec!(1000000000000000000000),
            ..Default::default()
        };
        assert_eq!(inputs.effective_ebitda_margin(), Decimal::MAX);
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in InputField::ALL {
            assert_eq!(field.as_str().parse::<InputField>().unwrap(), field);
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
        assert!("not_a_field".parse::<InputField>().is_err());
    }

    #[test]
    fn test_with_override_leaves_original() {
        let base = ValuationInputs::default();
        let changed = base.with_override(InputField::ExitMultiple, dec!(8));
        assert_eq!(changed.exit_multiple, dec!(8));
        assert_eq!(base.exit_multiple, dec!(6.0));
    }

    #[test]
    fn test_year_fields_truncate() {
        let base = ValuationInputs::default();
        assert_eq!(base.with_override(InputField::ExitYear, dec!(6.7)).exit_year, 6);
        assert_eq!(base.with_override(InputField::BankTermYears, dec!(-3)).bank_term_years, 0);
        assert_eq!(base.get(InputField::SellerNoteTerm), dec!(5));
    }
}
