pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "sourcing")]
pub mod sourcing;

pub use error::ValuationError;
pub use types::*;

#[cfg(feature = "valuation")]
pub use valuation::calculator::{calculate_valuation, run_valuation, ValuationOutputs};
#[cfg(feature = "valuation")]
pub use valuation::inputs::{InputField, ValuationInputs};

#[cfg(feature = "scenarios")]
pub use scenarios::sensitivity::{generate_sensitivity_table, Metric, SensitivityTable};

/// Standard result type for all fallible deal-valuation operations
pub type ValuationResult<T> = Result<T, ValuationError>;
