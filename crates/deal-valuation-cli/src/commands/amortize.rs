use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use deal_valuation_core::valuation::amortization::{run_amortization, LoanInput};

use crate::input;

/// Arguments for a loan amortization schedule
#[derive(Args)]
pub struct AmortizeArgs {
    /// Amount borrowed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate (e.g. 0.09 for 9%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Term in whole years
    #[arg(long)]
    pub term: Option<u32>,

    /// Label for the loan
    #[arg(long, default_value = "Loan")]
    pub name: String,

    /// Path to a JSON or YAML loan definition (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan: LoanInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(loan) = input::stdin::read_stdin()? {
        loan
    } else {
        LoanInput {
            name: args.name,
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate: args.rate.ok_or("--rate is required (or provide --input)")?,
            term_years: args.term.ok_or("--term is required (or provide --input)")?,
        }
    };

    let result = run_amortization(&loan);
    Ok(serde_json::to_value(result)?)
}
