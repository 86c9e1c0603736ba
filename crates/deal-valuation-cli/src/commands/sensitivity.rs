use clap::Args;
use serde_json::Value;

use deal_valuation_core::scenarios::sensitivity::{self, SensitivityAxis, SensitivityRequest};
use deal_valuation_core::Metric;

use super::load_inputs;
use crate::input;

/// Arguments for a two-way sensitivity grid
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a complete sensitivity request (base_inputs, x, y, metric)
    #[arg(long, conflicts_with_all = ["input", "x", "y"])]
    pub request: Option<String>,

    /// Path to JSON or YAML base inputs (otherwise stdin, otherwise defaults)
    #[arg(long)]
    pub input: Option<String>,

    /// Row axis as field=min:max:step or field=v1,v2,...
    /// (e.g. "entry_multiple=3:5:0.5")
    #[arg(long, required_unless_present = "request")]
    pub x: Option<SensitivityAxis>,

    /// Column axis, same format as --x
    #[arg(long, required_unless_present = "request")]
    pub y: Option<SensitivityAxis>,

    /// Metric to tabulate: moic, irr, equity_to_buyer, total_return,
    /// exit_ev, dscr, year_one_cash_flow, enterprise_value, equity_check
    #[arg(long, default_value = "irr")]
    pub metric: Metric,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: SensitivityRequest = match args.request {
        Some(ref path) => input::file::read_input(path)?,
        None => SensitivityRequest {
            base_inputs: load_inputs(args.input.as_deref())?,
            x: args.x.ok_or("--x is required (or provide --request)")?,
            y: args.y.ok_or("--y is required (or provide --request)")?,
            metric: args.metric,
        },
    };

    let result = sensitivity::run_sensitivity(&request)?;
    Ok(serde_json::to_value(result)?)
}
