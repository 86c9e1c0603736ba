use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::types::*;

const MONTHS_PER_YEAR: u32 = 12;

/// Longest loan the year-by-year schedule will tabulate
pub const MAX_SCHEDULE_YEARS: u32 = 100;

/// Level payment on a fixed-rate amortising loan
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanPayment {
    pub monthly_payment: Money,
    pub annual_payment: Money,
}

/// Fixed monthly payment that retires `principal` over `term_years`.
///
/// Zero principal or zero term gives no payment; a zero rate repays
/// straight-line.
pub fn amortize(principal: Money, annual_rate: Rate, term_years: u32) -> LoanPayment {
    if principal.is_zero() || term_years == 0 {
        return LoanPayment::default();
    }

    let months = term_years.saturating_mul(MONTHS_PER_YEAR);
    let monthly_payment = if annual_rate.is_zero() {
        principal / Decimal::from(months)
    } else {
        let r = annual_rate / dec!(12);
        // An overflowing growth factor means the loan is effectively
        // interest-only over its term.
        annuity_payment(principal, r, months).unwrap_or_else(|| principal.saturating_mul(r))
    };

    LoanPayment {
        monthly_payment,
        annual_payment: monthly_payment.saturating_mul(dec!(12)),
    }
}

/// P·r·(1+r)^n / ((1+r)^n − 1), or None if it leaves the decimal range.
fn annuity_payment(principal: Money, monthly_rate: Rate, months: u32) -> Option<Money> {
    let growth = (Decimal::ONE + monthly_rate).checked_powu(months as u64)?;
    let denominator = growth.checked_sub(Decimal::ONE)?;
    if denominator.is_zero() {
        return None;
    }
    principal
        .checked_mul(monthly_rate)?
        .checked_mul(growth)?
        .checked_div(denominator)
}

/// Outstanding balance after `months_elapsed` level payments; 0 once the
/// term has run.
pub fn remaining_balance(
    principal: Money,
    annual_rate: Rate,
    term_years: u32,
    months_elapsed: u32,
) -> Money {
    let months = term_years.saturating_mul(MONTHS_PER_YEAR);
    if principal.is_zero() || months_elapsed >= months {
        return Decimal::ZERO;
    }
    if months_elapsed == 0 {
        return principal;
    }

    if annual_rate.is_zero() {
        let remaining = Decimal::from(months - months_elapsed);
        let months = Decimal::from(months);
        return principal
            .checked_mul(remaining)
            .map(|scaled| scaled / months)
            .unwrap_or_else(|| principal / months * remaining);
    }

    // B_k = P · ((1+r)^n − (1+r)^k) / ((1+r)^n − 1)
    let r = annual_rate / dec!(12);
    let balance = || -> Option<Money> {
        let one_plus_r = Decimal::ONE + r;
        let growth_n = one_plus_r.checked_powu(months as u64)?;
        let growth_k = one_plus_r.checked_powu(months_elapsed as u64)?;
        let denominator = growth_n.checked_sub(Decimal::ONE)?;
        if denominator.is_zero() {
            return None;
        }
        principal
            .checked_mul(growth_n.checked_sub(growth_k)?)?
            .checked_div(denominator)
    };
    balance().unwrap_or(principal)
}

/// A named loan for schedule generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanInput {
    pub name: String,
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_years: u32,
}

/// A single year in the amortisation schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationPeriod {
    pub year: u32,
    pub opening_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub loan_name: String,
    pub monthly_payment: Money,
    pub annual_payment: Money,
    pub periods: Vec<AmortizationPeriod>,
    pub total_interest_paid: Money,
    pub total_principal_paid: Money,
}

/// Year-by-year amortisation table for a level-payment loan.
pub fn build_amortization_schedule(input: &LoanInput) -> AmortizationSchedule {
    let payment = amortize(input.principal, input.annual_rate, input.term_years);

    let years = input.term_years.min(MAX_SCHEDULE_YEARS);
    let mut periods = Vec::with_capacity(years as usize);
    let mut total_interest_paid = Decimal::ZERO;
    let mut total_principal_paid = Decimal::ZERO;

    if !payment.annual_payment.is_zero() {
        for year in 1..=years {
            let opening = remaining_balance(
                input.principal,
                input.annual_rate,
                input.term_years,
                (year - 1) * MONTHS_PER_YEAR,
            );
            let closing = remaining_balance(
                input.principal,
                input.annual_rate,
                input.term_years,
                year.saturating_mul(MONTHS_PER_YEAR),
            );
            let principal = opening.saturating_sub(closing);
            let interest = payment.annual_payment.saturating_sub(principal);

            total_interest_paid = total_interest_paid.saturating_add(interest);
            total_principal_paid = total_principal_paid.saturating_add(principal);

            periods.push(AmortizationPeriod {
                year,
                opening_balance: opening,
                interest,
                principal,
                closing_balance: closing,
            });
        }
    }

    AmortizationSchedule {
        loan_name: input.name.clone(),
        monthly_payment: payment.monthly_payment,
        annual_payment: payment.annual_payment,
        periods,
        total_interest_paid,
        total_principal_paid,
    }
}

/// Amortisation schedule wrapped in the standard output envelope.
pub fn run_amortization(input: &LoanInput) -> ComputationOutput<AmortizationSchedule> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.principal < Decimal::ZERO {
        warnings.push("Negative principal produces negative payments".into());
    }
    if input.term_years == 0 && !input.principal.is_zero() {
        warnings.push("Zero term: no payments are scheduled".into());
    }
    if input.term_years > MAX_SCHEDULE_YEARS {
        warnings.push(format!(
            "Schedule truncated to the first {MAX_SCHEDULE_YEARS} of {} years",
            input.term_years
        ));
    }

    let schedule = build_amortization_schedule(input);

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Level-payment amortisation (monthly compounding)",
        &serde_json::json!({
            "loan": input.name,
            "principal": input.principal.to_string(),
            "annual_rate": input.annual_rate.to_string(),
            "term_years": input.term_years,
        }),
        warnings,
        elapsed,
        schedule,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bank_loan() -> LoanInput {
        LoanInput {
            name: "Senior Bank Debt".into(),
            principal: dec!(1300000),
            annual_rate: dec!(0.09),
            term_years: 10,
        }
    }

    #[test]
    fn test_standard_annuity_payment() {
        let p = amortize(dec!(1300000), dec!(0.09), 10);
        // Standard annuity: ~16,468/month
        assert!((p.monthly_payment - dec!(16465)).abs() < dec!(10));
        assert!((p.annual_payment - dec!(197580)).abs() < dec!(100));
        assert_eq!(p.annual_payment, p.monthly_payment * dec!(12));
    }

    #[test]
    fn test_zero_principal_or_term() {
        assert_eq!(amortize(Decimal::ZERO, dec!(0.09), 10), LoanPayment::default());
        assert_eq!(amortize(dec!(100000), dec!(0.09), 0), LoanPayment::default());
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let p = amortize(dec!(120000), Decimal::ZERO, 10);
        assert_eq!(p.monthly_payment, dec!(1000));
        assert_eq!(p.annual_payment, dec!(12000));
    }

    #[test]
    fn test_interest_paid_is_positive() {
        let p = amortize(dec!(200000), dec!(0.06), 5);
        assert!(p.annual_payment * dec!(5) > dec!(200000));
    }

    #[test]
    fn test_absurd_rate_does_not_panic() {
        let p = amortize(dec!(1000000), dec!(500), 30);
        assert!(p.monthly_payment > Decimal::ZERO);
        let b = remaining_balance(dec!(1000000), dec!(500), 30, 12);
        assert!(b > Decimal::ZERO);
    }

    #[test]
    fn test_remaining_balance_endpoints() {
        assert_eq!(remaining_balance(dec!(1000), dec!(0.05), 5, 0), dec!(1000));
        assert_eq!(remaining_balance(dec!(1000), dec!(0.05), 5, 60), Decimal::ZERO);
        assert_eq!(remaining_balance(dec!(1000), dec!(0.05), 5, 72), Decimal::ZERO);
        assert_eq!(remaining_balance(dec!(1200), Decimal::ZERO, 1, 6), dec!(600));
    }

    #[test]
    fn test_schedule_retires_principal() {
        let sched = build_amortization_schedule(&bank_loan());
        assert_eq!(sched.periods.len(), 10);
        assert_eq!(sched.periods[0].opening_balance, dec!(1300000));
        assert_eq!(sched.periods[9].closing_balance, Decimal::ZERO);
        assert!((sched.total_principal_paid - dec!(1300000)).abs() < dec!(0.000001));

        // Principal portion grows as interest shrinks
        for pair in sched.periods.windows(2) {
            assert!(pair[1].principal > pair[0].principal);
            assert!(pair[1].interest < pair[0].interest);
            assert!(pair[1].closing_balance < pair[0].closing_balance);
        }

        let expected_interest = sched.annual_payment * dec!(10) - dec!(1300000);
        assert!((sched.total_interest_paid - expected_interest).abs() < dec!(0.000001));
    }

    #[test]
    fn test_run_amortization_warns_on_zero_term() {
        let mut loan = bank_loan();
        loan.term_years = 0;
        let out = run_amortization(&loan);
        assert!(out.result.periods.is_empty());
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_long_term_schedule_is_truncated() {
        let loan = LoanInput {
            name: "Perpetual".into(),
            principal: dec!(1000000),
            annual_rate: dec!(0.05),
            term_years: u32::MAX,
        };
        let out = run_amortization(&loan);
        assert_eq!(out.result.periods.len(), MAX_SCHEDULE_YEARS as usize);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.result.total_principal_paid <= loan.principal);
    }

    #[test]
    fn test_huge_principal_saturates() {
        let p = amortize(Decimal::MAX, dec!(0.09), 10);
        assert!(p.monthly_payment > Decimal::ZERO);
        assert!(p.annual_payment > p.monthly_payment);
        let b = remaining_balance(Decimal::MAX, Decimal::ZERO, 10, 60);
        assert!(b > Decimal::ZERO && b < Decimal::MAX);
    }
}
