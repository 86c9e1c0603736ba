use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use deal_valuation_core::scenarios::sensitivity::{self, SensitivityRequest};
use deal_valuation_core::sourcing::basis::{self, ListingFinancials};
use deal_valuation_core::valuation::amortization::{self, LoanInput};
use deal_valuation_core::{valuation::calculator, ValuationInputs};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_valuation(input_json: String) -> NapiResult<String> {
    let input: ValuationInputs = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = calculator::run_valuation(&input);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn generate_sensitivity_table(request_json: String) -> NapiResult<String> {
    let request: SensitivityRequest =
        serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let output = sensitivity::run_sensitivity(&request).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn amortize(loan_json: String) -> NapiResult<String> {
    let loan: LoanInput = serde_json::from_str(&loan_json).map_err(to_napi_error)?;
    let output = amortization::run_amortization(&loan);
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Sourcing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct BasisRequest {
    listing: ListingFinancials,
    target_multiple: Decimal,
    #[serde(default)]
    base_inputs: ValuationInputs,
}

#[napi]
pub fn resolve_deal_basis(request_json: String) -> NapiResult<String> {
    let request: BasisRequest = serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let output =
        basis::run_listing_basis(&request.listing, request.target_multiple, &request.base_inputs);
    serde_json::to_string(&output).map_err(to_napi_error)
}
