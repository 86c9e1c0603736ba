use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ValuationError;
use crate::types::{Money, Rate};
use crate::ValuationResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.000001);
const MAX_IRR_ITERATIONS: u32 = 100;

/// Seed for the Newton-Raphson IRR search.
pub const IRR_SEED: Rate = dec!(0.20);

/// Rates searched by the bisection fallback, inclusive.
pub const IRR_BRACKET: (Rate, Rate) = (dec!(-0.99), dec!(10));

/// Net Present Value of a series of cash flows. Index 0 is undiscounted.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> ValuationResult<Money> {
    if rate <= dec!(-1) {
        return Err(ValuationError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let overflow = || ValuationError::InvalidInput {
        field: "rate".into(),
        reason: format!("Discounting at {rate} overflows the decimal range"),
    };

    let discount = Decimal::ONE
        .checked_add(rate)
        .and_then(|one_plus_r| Decimal::ONE.checked_div(one_plus_r))
        .ok_or_else(overflow)?;

    // Horner form: cf0 + v(cf1 + v(cf2 + ...))
    cash_flows
        .iter()
        .rev()
        .try_fold(Decimal::ZERO, |acc, cf| acc.checked_mul(discount)?.checked_add(*cf))
        .ok_or_else(overflow)
}

/// Internal Rate of Return.
///
/// Newton-Raphson from `guess`; if that diverges, leaves [`IRR_BRACKET`] or
/// hits a flat derivative, falls back to bisection over the bracket.
pub fn irr(cash_flows: &[Money], guess: Rate) -> ValuationResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(ValuationError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let has_inflow = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    let has_outflow = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    if !has_inflow || !has_outflow {
        return Err(ValuationError::InvalidInput {
            field: "cash_flows".into(),
            reason: "IRR requires at least one sign change".into(),
        });
    }

    if let Some(rate) = newton_raphson(cash_flows, guess) {
        return Ok(rate);
    }

    tracing::debug!(%guess, periods = cash_flows.len(), "Newton-Raphson IRR failed; bisecting");
    bisect(cash_flows)
}

fn newton_raphson(cash_flows: &[Money], guess: Rate) -> Option<Rate> {
    let (low, high) = IRR_BRACKET;
    let mut rate = guess;

    for _ in 0..MAX_IRR_ITERATIONS {
        let (value, slope) = npv_and_derivative(rate, cash_flows)?;

        if value.abs() < CONVERGENCE_THRESHOLD {
            return Some(rate);
        }
        if slope.is_zero() {
            return None;
        }

        let next = rate.checked_sub(value.checked_div(slope)?)?;
        if next < low || next > high {
            return None;
        }
        if next.checked_sub(rate)?.abs() < CONVERGENCE_THRESHOLD {
            return Some(next);
        }
        rate = next;
    }

    None
}

/// NPV and dNPV/dr at `rate`, or None if either leaves the decimal range.
fn npv_and_derivative(rate: Rate, cash_flows: &[Money]) -> Option<(Money, Money)> {
    let one_plus_r = Decimal::ONE.checked_add(rate)?;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }
    let v = Decimal::ONE.checked_div(one_plus_r)?;

    let mut discount = Decimal::ONE;
    let mut value = Decimal::ZERO;
    let mut slope = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        value = value.checked_add(cf.checked_mul(discount)?)?;
        if t > 0 {
            let term = Decimal::from(t as u64)
                .checked_mul(*cf)?
                .checked_mul(discount)?
                .checked_mul(v)?;
            slope = slope.checked_sub(term)?;
        }
        discount = discount.checked_mul(v)?;
    }

    Some((value, slope))
}

/// A value with the same sign as NPV at `rate`, finite across the bracket.
///
/// For negative rates the NPV is scaled by (1+r)^T so every power of the
/// growth factor is at most 1.
fn npv_sign(rate: Rate, cash_flows: &[Money]) -> Option<Decimal> {
    if rate >= Decimal::ZERO {
        return npv(rate, cash_flows).ok();
    }
    let growth = Decimal::ONE + rate;
    cash_flows
        .iter()
        .try_fold(Decimal::ZERO, |acc, cf| acc.checked_mul(growth)?.checked_add(*cf))
}

fn bisect(cash_flows: &[Money]) -> ValuationResult<Rate> {
    let (mut low, mut high) = IRR_BRACKET;
    let overflow = |rate: Rate| ValuationError::InvalidInput {
        field: "cash_flows".into(),
        reason: format!("NPV at {rate} overflows the decimal range"),
    };

    let mut f_low = npv_sign(low, cash_flows).ok_or_else(|| overflow(low))?;
    let f_high = npv_sign(high, cash_flows).ok_or_else(|| overflow(high))?;

    if f_low.is_zero() {
        return Ok(low);
    }
    if f_high.is_zero() {
        return Ok(high);
    }
    if f_low.is_sign_negative() == f_high.is_sign_negative() {
        return Err(ValuationError::InvalidInput {
            field: "cash_flows".into(),
            reason: format!("No sign change in NPV between {low} and {high}"),
        });
    }

    for _ in 0..MAX_IRR_ITERATIONS {
        let mid = (low + high) / dec!(2);
        let f_mid = npv_sign(mid, cash_flows).ok_or_else(|| overflow(mid))?;

        if f_mid.is_zero() || (high - low) / dec!(2) < CONVERGENCE_THRESHOLD {
            return Ok(mid);
        }

        if f_mid.is_sign_negative() == f_low.is_sign_negative() {
            low = mid;
            f_low = f_mid;
        } else {
            high = mid;
        }
    }

    Err(ValuationError::ConvergenceFailure {
        function: "IRR bisection".into(),
        iterations: MAX_IRR_ITERATIONS,
    })
}
