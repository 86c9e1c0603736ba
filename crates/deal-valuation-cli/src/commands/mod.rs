pub mod amortize;
pub mod basis;
pub mod sensitivity;
pub mod valuation;

use deal_valuation_core::{InputField, ValuationInputs};
use rust_decimal::Decimal;

use crate::input;

/// Parse a `field=value` input override.
pub fn parse_override(s: &str) -> Result<(InputField, Decimal), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{}'", s))?;
    let field: InputField = field.trim().parse().map_err(|e| format!("{}", e))?;
    let value: Decimal = value
        .trim()
        .parse()
        .map_err(|e| format!("'{}' is not a number: {}", value.trim(), e))?;
    Ok((field, value))
}

/// Base valuation inputs from `--input`, else piped stdin, else defaults.
pub fn load_inputs(path: Option<&str>) -> Result<ValuationInputs, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        input::file::read_input(path)
    } else if let Some(inputs) = input::stdin::read_stdin()? {
        Ok(inputs)
    } else {
        Ok(ValuationInputs::default())
    }
}
