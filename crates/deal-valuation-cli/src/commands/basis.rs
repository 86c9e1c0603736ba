use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use deal_valuation_core::sourcing::basis::{run_listing_basis, ListingFinancials};
use deal_valuation_core::{run_valuation, ValuationInputs};

use crate::input;

/// Arguments for resolving a listing's deal basis
#[derive(Args)]
pub struct BasisArgs {
    /// Path to JSON or YAML listing financials (otherwise stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// EBITDA multiple applied to the earnings tiers
    #[arg(long, default_value_t = dec!(4))]
    pub target_multiple: Decimal,

    /// Valuation inputs the listing figures are layered onto
    #[arg(long)]
    pub base: Option<String>,

    /// Also value the deal on the mapped inputs
    #[arg(long)]
    pub value: bool,
}

pub fn run_basis(args: BasisArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let listing: ListingFinancials = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(listing) = input::stdin::read_stdin()? {
        listing
    } else {
        return Err("--input file is required for basis resolution".into());
    };

    let base: ValuationInputs = match args.base {
        Some(ref path) => input::file::read_input(path)?,
        None => ValuationInputs::default(),
    };

    let report = run_listing_basis(&listing, args.target_multiple, &base);
    if args.value {
        let valuation = run_valuation(&report.result.inputs);
        return Ok(serde_json::to_value(valuation)?);
    }
    Ok(serde_json::to_value(report)?)
}
