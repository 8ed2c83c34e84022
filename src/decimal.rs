//! Fixed-point money string conversion.
//!
//! Order money columns are stored as fixed-point strings. Everything
//! entering or leaving those columns goes through this module: parse to
//! a [`Decimal`] rounded half-up to two places, format back with exactly
//! two fractional digits. Unparsable input is a data-integrity error,
//! never a silent zero.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::OrderError;

/// Parse a stored fixed-point string, rounding half-up to 2 decimals.
pub fn parse_decimal(input: &str) -> Result<Decimal, OrderError> {
    let value = Decimal::from_str(input.trim())
        .map_err(|_| OrderError::MalformedDecimal(input.to_string()))?;
    Ok(value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Format a decimal for storage or display, always with 2 fractional digits.
pub fn format_decimal(value: Decimal) -> String {
    format!(
        "{:.2}",
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}
