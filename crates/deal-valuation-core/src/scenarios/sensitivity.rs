use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::types::*;
use crate::valuation::calculator::{calculate_valuation, ValuationOutputs};
use crate::valuation::inputs::{InputField, ValuationInputs, MAX_PROJECTION_YEARS};
use crate::ValuationResult;

/// Upper bound on the points a single sweep may generate.
const MAX_SWEEP_POINTS: usize = 250;

/// Two-way sensitivity grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityTable<T> {
    /// Labels for the first field's values, one per row
    pub rows: Vec<String>,
    /// Labels for the second field's values, one per column
    pub cols: Vec<String>,
    /// data[i][j] = metric with the first field at rows[i], the second at cols[j]
    pub data: Vec<Vec<T>>,
    /// Cell whose axis values equal the unperturbed inputs, if any
    pub base_case: Option<(usize, usize)>,
}

/// Re-run the valuation across every pair of `values_x` × `values_y`,
/// collecting `metric_fn` of each result.
///
/// `inputs` is never modified; each cell values its own copy. If both axes
/// address the same field, the `field_y` value wins.
pub fn generate_sensitivity_table<T, F>(
    inputs: &ValuationInputs,
    field_x: InputField,
    values_x: &[Decimal],
    field_y: InputField,
    values_y: &[Decimal],
    metric_fn: F,
) -> SensitivityTable<T>
where
    F: Fn(&ValuationOutputs) -> T,
{
    tracing::debug!(
        %field_x,
        %field_y,
        cells = values_x.len() * values_y.len(),
        "generating sensitivity table"
    );

    let data: Vec<Vec<T>> = values_x
        .iter()
        .map(|&x| {
            let row_inputs = inputs.with_override(field_x, x);
            values_y
                .iter()
                .map(|&y| metric_fn(&calculate_valuation(&row_inputs.with_override(field_y, y))))
                .collect::<Vec<T>>()
        })
        .collect();

    let base_row = values_x.iter().position(|v| *v == inputs.get(field_x));
    let base_col = values_y.iter().position(|v| *v == inputs.get(field_y));

    SensitivityTable {
        rows: values_x.iter().map(|v| axis_label(*v)).collect(),
        cols: values_y.iter().map(|v| axis_label(*v)).collect(),
        data,
        base_case: base_row.zip(base_col),
    }
}

fn axis_label(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Named scalar read off a valuation, for grids driven by configuration
/// rather than code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Moic,
    Irr,
    EquityToBuyer,
    TotalReturn,
    ExitEv,
    Dscr,
    YearOneCashFlow,
    EnterpriseValue,
    EquityCheck,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::Moic,
        Metric::Irr,
        Metric::EquityToBuyer,
        Metric::TotalReturn,
        Metric::ExitEv,
        Metric::Dscr,
        Metric::YearOneCashFlow,
        Metric::EnterpriseValue,
        Metric::EquityCheck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Moic => "moic",
            Metric::Irr => "irr",
            Metric::EquityToBuyer => "equity_to_buyer",
            Metric::TotalReturn => "total_return",
            Metric::ExitEv => "exit_ev",
            Metric::Dscr => "dscr",
            Metric::YearOneCashFlow => "year_one_cash_flow",
            Metric::EnterpriseValue => "enterprise_value",
            Metric::EquityCheck => "equity_check",
        }
    }

    /// None where the metric is undefined (no equity, no IRR, no debt).
    pub fn evaluate(&self, outputs: &ValuationOutputs) -> Option<Decimal> {
        match self {
            Metric::Moic => outputs.exit.moic,
            Metric::Irr => outputs.exit.irr,
            Metric::EquityToBuyer => Some(outputs.exit.equity_to_buyer),
            Metric::TotalReturn => Some(outputs.exit.total_return),
            Metric::ExitEv => Some(outputs.exit.exit_ev),
            Metric::Dscr => outputs.cash_flow.dscr.ratio(),
            Metric::YearOneCashFlow => Some(outputs.cash_flow.after_tax_cash_flow),
            Metric::EnterpriseValue => Some(outputs.deal.enterprise_value),
            Metric::EquityCheck => Some(outputs.deal.equity_check),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValuationError::UnknownMetric(s.to_string()))
    }
}

/// Values to sweep along one axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sweep {
    /// Explicit list, used as given
    Values(Vec<Decimal>),
    /// min, min+step, ... with max always included
    Range {
        min: Decimal,
        max: Decimal,
        step: Decimal,
    },
}

impl Sweep {
    pub fn values(&self) -> ValuationResult<Vec<Decimal>> {
        match self {
            Sweep::Values(values) => Ok(values.clone()),
            Sweep::Range { min, max, step } => range_values(*min, *max, *step),
        }
    }
}

fn range_values(min: Decimal, max: Decimal, step: Decimal) -> ValuationResult<Vec<Decimal>> {
    if step <= Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "step".into(),
            reason: "Step must be positive".into(),
        });
    }
    if min > max {
        return Err(ValuationError::InvalidInput {
            field: "min".into(),
            reason: "Min must be <= max".into(),
        });
    }
    let intervals = max.checked_sub(min).and_then(|span| span.checked_div(step));
    if intervals.map_or(true, |n| n >= Decimal::from(MAX_SWEEP_POINTS)) {
        return Err(ValuationError::InvalidInput {
            field: "step".into(),
            reason: format!("Sweep would exceed {MAX_SWEEP_POINTS} points"),
        });
    }

    let mut values = Vec::new();
    let mut current = min;
    while current <= max {
        values.push(current);
        match current.checked_add(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < max {
            values.push(max);
        }
    }

    Ok(values)
}

impl FromStr for Sweep {
    type Err = ValuationError;

    /// `min:max:step` or a comma-separated list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<Decimal>()
                .map_err(|e| ValuationError::InvalidInput {
                    field: "sweep".into(),
                    reason: format!("'{part}' is not a number: {e}"),
                })
        };

        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [min, max, step] => Ok(Sweep::Range {
                min: parse(*min)?,
                max: parse(*max)?,
                step: parse(*step)?,
            }),
            [list] => list
                .split(',')
                .filter(|p| !p.trim().is_empty())
                .map(parse)
                .collect::<ValuationResult<Vec<_>>>()
                .map(Sweep::Values),
            _ => Err(ValuationError::InvalidInput {
                field: "sweep".into(),
                reason: format!("expected min:max:step or v1,v2,..., got '{s}'"),
            }),
        }
    }
}

/// One grid axis: the field to perturb and the values to try
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityAxis {
    pub field: InputField,
    pub sweep: Sweep,
}

impl FromStr for SensitivityAxis {
    type Err = ValuationError;

    /// `field=min:max:step` or `field=v1,v2,...`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, sweep) = s.split_once('=').ok_or_else(|| ValuationError::InvalidInput {
            field: "axis".into(),
            reason: format!("expected field=values, got '{s}'"),
        })?;
        Ok(SensitivityAxis {
            field: field.parse()?,
            sweep: sweep.parse()?,
        })
    }
}

/// A grid described entirely by data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityRequest {
    #[serde(default)]
    pub base_inputs: ValuationInputs,
    pub x: SensitivityAxis,
    pub y: SensitivityAxis,
    pub metric: Metric,
}

fn check_axis_values(field: InputField, values: &[Decimal]) -> ValuationResult<()> {
    if field != InputField::ExitYear {
        return Ok(());
    }
    let limit = Decimal::from(MAX_PROJECTION_YEARS);
    match values.iter().find(|v| **v > limit) {
        Some(v) => Err(ValuationError::InvalidInput {
            field: field.to_string(),
            reason: format!("{v} exceeds the {MAX_PROJECTION_YEARS}-year projection limit"),
        }),
        None => Ok(()),
    }
}

/// Evaluate a [`SensitivityRequest`] into the standard output envelope.
pub fn run_sensitivity(
    request: &SensitivityRequest,
) -> ValuationResult<ComputationOutput<SensitivityTable<Option<Decimal>>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if request.x.field == request.y.field {
        return Err(ValuationError::InvalidInput {
            field: "y".into(),
            reason: format!("Both axes perturb '{}'", request.x.field),
        });
    }

    let values_x = request.x.sweep.values()?;
    let values_y = request.y.sweep.values()?;
    for (axis, values) in [(&request.x, &values_x), (&request.y, &values_y)] {
        check_axis_values(axis.field, values)?;
    }
    if values_x.is_empty() || values_y.is_empty() {
        warnings.push("An axis has no values; the table is empty".into());
    }

    let metric = request.metric;
    let table = generate_sensitivity_table(
        &request.base_inputs,
        request.x.field,
        &values_x,
        request.y.field,
        &values_y,
        |outputs| metric.evaluate(outputs),
    );

    let undefined = table.data.iter().flatten().filter(|v| v.is_none()).count();
    if undefined > 0 {
        warnings.push(format!("{undefined} cell(s) have no defined {metric}"));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way Sensitivity Analysis (Evaluated)",
        &serde_json::json!({
            "row_field": request.x.field,
            "col_field": request.y.field,
            "metric": metric,
        }),
        warnings,
        elapsed,
        table,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn base() -> ValuationInputs {
        ValuationInputs {
            target_revenue: dec!(2000000),
            target_ebitda: dec!(500000),
            revenue_growth_rate: dec!(0.05),
            ..Default::default()
        }
    }

    #[test]
    fn test_grid_shape_and_labels() {
        let table = generate_sensitivity_table(
            &base(),
            InputField::ExitMultiple,
            &[dec!(5.0), dec!(6.0), dec!(7.0)],
            InputField::EntryMultiple,
            &[dec!(3.5), dec!(4.0)],
            |out| out.exit.moic,
        );
        assert_eq!(table.rows, vec!["5", "6", "7"]);
        assert_eq!(table.cols, vec!["3.5", "4"]);
        assert_eq!(table.data.len(), 3);
        assert!(table.data.iter().all(|row| row.len() == 2));
        assert_eq!(table.base_case, Some((1, 1)));
    }

    #[test]
    fn test_higher_exit_multiple_never_lowers_moic() {
        let table = generate_sensitivity_table(
            &base(),
            InputField::ExitMultiple,
            &[dec!(4), dec!(5), dec!(6), dec!(7), dec!(8)],
            InputField::RevenueGrowthRate,
            &[dec!(0), dec!(0.05), dec!(0.10)],
            |out| out.exit.moic.unwrap_or_default(),
        );
        for j in 0..3 {
            for i in 0..4 {
                assert!(table.data[i][j] <= table.data[i + 1][j]);
            }
        }
    }

    #[test]
    fn test_empty_axis() {
        let table = generate_sensitivity_table(
            &base(),
            InputField::ExitMultiple,
            &[],
            InputField::EntryMultiple,
            &[dec!(4)],
            |out| out.exit.moic,
        );
        assert!(table.rows.is_empty());
        assert!(table.data.is_empty());
        assert_eq!(table.base_case, None);
    }

    #[test]
    fn test_sweep_range() {
        let sweep: Sweep = "1:5:1".parse().unwrap();
        assert_eq!(
            sweep.values().unwrap(),
            vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)]
        );
    }

    #[test]
    fn test_sweep_with_non_exact_step() {
        let sweep = Sweep::Range {
            min: dec!(0),
            max: dec!(1),
            step: dec!(0.3),
        };
        let vals = sweep.values().unwrap();
        // 0, 0.3, 0.6, 0.9, 1.0 (max appended)
        assert_eq!(vals.len(), 5);
        assert_eq!(*vals.last().unwrap(), dec!(1));
    }

    #[test]
    fn test_invalid_sweeps() {
        assert!("0:1:0".parse::<Sweep>().unwrap().values().is_err());
        assert!("2:1:0.5".parse::<Sweep>().unwrap().values().is_err());
        assert!("0:1000:0.001".parse::<Sweep>().unwrap().values().is_err());
        // span / step leaves the decimal range
        assert!("0:100000000000000000000:0.00000000000000000001"
            .parse::<Sweep>()
            .unwrap()
            .values()
            .is_err());
        assert!("1:2".parse::<Sweep>().is_err());
        assert!("a,b".parse::<Sweep>().is_err());
    }

    #[test]
    fn test_axis_parsing() {
        let axis: SensitivityAxis = "exit_multiple=5,6,7".parse().unwrap();
        assert_eq!(axis.field, InputField::ExitMultiple);
        assert_eq!(axis.sweep, Sweep::Values(vec![dec!(5), dec!(6), dec!(7)]));

        assert!("exit_multiple".parse::<SensitivityAxis>().is_err());
        assert!("nonsense=1,2".parse::<SensitivityAxis>().is_err());
    }

    #[test]
    fn test_metric_names() {
        for m in Metric::ALL {
            assert_eq!(m.as_str().parse::<Metric>().unwrap(), m);
        }
        assert!("ebitda_margin".parse::<Metric>().is_err());
    }

    #[test]
    fn test_run_sensitivity_rejects_same_field() {
        let request = SensitivityRequest {
            base_inputs: base(),
            x: "exit_multiple=5,6".parse().unwrap(),
            y: "exit_multiple=7,8".parse().unwrap(),
            metric: Metric::Moic,
        };
        assert!(run_sensitivity(&request).is_err());
    }

    #[test]
    fn test_run_sensitivity_from_json() {
        let request: SensitivityRequest = serde_json::from_value(serde_json::json!({
            "base_inputs": { "target_revenue": "2000000", "target_ebitda": "500000" },
            "x": { "field": "exit_multiple", "sweep": ["5", "6", "7"] },
            "y": { "field": "bank_interest_rate", "sweep": { "min": "0.07", "max": "0.11", "step": "0.02" } },
            "metric": "irr"
        }))
        .unwrap();

        let out = run_sensitivity(&request).unwrap();
        assert_eq!(out.result.rows.len(), 3);
        assert_eq!(out.result.cols, vec!["0.07", "0.09", "0.11"]);
        assert!(out.result.data.iter().flatten().all(|v| v.is_some()));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_sweep_ending_at_decimal_max() {
        let sweep = Sweep::Range {
            min: Decimal::MAX - dec!(2),
            max: Decimal::MAX,
            step: dec!(1),
        };
        let vals = sweep.values().unwrap();
        assert_eq!(vals.len(), 3);
        assert_eq!(*vals.last().unwrap(), Decimal::MAX);
    }

    #[test]
    fn test_run_sensitivity_rejects_exit_year_beyond_limit() {
        let request = SensitivityRequest {
            base_inputs: base(),
            x: "exit_year=5,4000000000".parse().unwrap(),
            y: "exit_multiple=6".parse().unwrap(),
            metric: Metric::Irr,
        };
        let err = run_sensitivity(&request).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidInput { ref field, .. } if field == "exit_year"));

        let within = SensitivityRequest {
            x: "exit_year=5,50".parse().unwrap(),
            ..request
        };
        assert!(run_sensitivity(&within).is_ok());
    }
}
