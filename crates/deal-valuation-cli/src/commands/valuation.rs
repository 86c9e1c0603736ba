use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use deal_valuation_core::valuation::calculator;
use deal_valuation_core::InputField;

use super::{load_inputs, parse_override};

/// Arguments for an acquisition valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ValuationArgs {
    /// Path to JSON or YAML inputs (otherwise stdin, otherwise defaults)
    #[arg(long)]
    pub input: Option<String>,

    /// Trailing revenue of the target
    #[arg(long)]
    pub revenue: Option<Decimal>,

    /// Trailing EBITDA of the target
    #[arg(long)]
    pub ebitda: Option<Decimal>,

    /// Annual revenue growth (e.g. 0.05 for 5%)
    #[arg(long)]
    pub growth: Option<Decimal>,

    /// Purchase price as a multiple of EBITDA
    #[arg(long)]
    pub entry_multiple: Option<Decimal>,

    /// Exit price as a multiple of exit-year EBITDA
    #[arg(long)]
    pub exit_multiple: Option<Decimal>,

    /// Year of exit (1-based)
    #[arg(long)]
    pub exit_year: Option<u32>,

    /// Any other input as field=value; repeatable
    #[arg(long = "set", value_parser = parse_override)]
    pub overrides: Vec<(InputField, Decimal)>,
}

pub fn run_valuation(args: ValuationArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut inputs = load_inputs(args.input.as_deref())?;

    let flags = [
        (InputField::TargetRevenue, args.revenue),
        (InputField::TargetEbitda, args.ebitda),
        (InputField::RevenueGrowthRate, args.growth),
        (InputField::EntryMultiple, args.entry_multiple),
        (InputField::ExitMultiple, args.exit_multiple),
        (InputField::ExitYear, args.exit_year.map(Decimal::from)),
    ];
    for (field, value) in flags {
        if let Some(value) = value {
            inputs.set(field, value);
        }
    }
    for (field, value) in args.overrides {
        inputs.set(field, value);
    }

    if inputs.target_ebitda.is_zero() && inputs.target_revenue.is_zero() {
        return Err("no target financials: pass --ebitda/--revenue or provide --input".into());
    }

    let result = calculator::run_valuation(&inputs);
    Ok(serde_json::to_value(result)?)
}
