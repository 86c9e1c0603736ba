use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples (e.g., 4.0x EV/EBITDA)
pub type Multiple = Decimal;

/// `numerator / denominator`, clamped to `Decimal::MAX`/`MIN` when the
/// quotient leaves the decimal range. A zero denominator gives zero.
pub fn saturating_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or_else(|| {
        if numerator.is_sign_negative() == denominator.is_sign_negative() {
            Decimal::MAX
        } else {
            Decimal::MIN
        }
    })
}

/// A coverage ratio such as DSCR. When the denominator is zero the ratio is
/// unbounded rather than a division error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Ratio(Multiple),
    Unbounded,
}

impl Coverage {
    /// Ratios beyond the decimal range saturate rather than overflow.
    pub fn of(numerator: Money, denominator: Money) -> Self {
        if denominator.is_zero() {
            Coverage::Unbounded
        } else {
            Coverage::Ratio(saturating_div(numerator, denominator))
        }
    }

    /// The finite ratio, if there is one.
    pub fn ratio(&self) -> Option<Multiple> {
        match self {
            Coverage::Ratio(r) => Some(*r),
            Coverage::Unbounded => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Coverage::Unbounded)
    }
}

const UNBOUNDED_LABEL: &str = "infinity";

impl Serialize for Coverage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Coverage::Ratio(r) => Serialize::serialize(r, serializer),
            Coverage::Unbounded => serializer.serialize_str(UNBOUNDED_LABEL),
        }
    }
}

impl<'de> Deserialize<'de> for Coverage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Ratio(Decimal),
            Label(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Ratio(r) => Ok(Coverage::Ratio(r)),
            Repr::Label(s) if s.eq_ignore_ascii_case(UNBOUNDED_LABEL) => Ok(Coverage::Unbounded),
            Repr::Label(s) => Err(serde::de::Error::custom(format!(
                "expected a decimal ratio or \"{UNBOUNDED_LABEL}\", got \"{s}\""
            ))),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
