//! Fixed-point representation for piece values and set-list quotas
//!
//! A set list requires its chosen pieces to sum to an exact quota, and piece
//! values are fractional (a short piece may count as half a selection).
//! Comparing binary floating-point sums for equality would produce false
//! quota mismatches, so values are stored and summed as integer **units**.
//!
//! The unit scale of 12 per whole piece was chosen as the LCM of the
//! denominators that occur in practice:
//!
//! - 1/2 piece = 6 units
//! - 1/3 piece = 4 units
//! - 1/4 piece = 3 units
//! - 1/6 piece = 2 units
//!
//! All quota arithmetic in the engine is exact integer arithmetic; the
//! fractional form exists only at the API boundary for display and intake.

use crate::{Error, Result};

/// Units per whole piece (LCM of supported fractional denominators)
pub const UNITS_PER_PIECE: i64 = 12;

/// Convert stored units to the fractional display value
pub fn units_to_value(units: i64) -> f64 {
    units as f64 / UNITS_PER_PIECE as f64
}

/// Convert a fractional API value to exact units
///
/// Rejects values that are not an exact multiple of 1/12, since storing a
/// rounded approximation would defeat exact quota comparison.
pub fn value_to_units(value: f64) -> Result<i64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "piece value must be positive and finite, got {}",
            value
        )));
    }

    let scaled = value * UNITS_PER_PIECE as f64;
    let units = scaled.round();
    if (scaled - units).abs() > 1e-9 {
        return Err(Error::InvalidInput(format!(
            "piece value {} is not representable in 1/{} units",
            value, UNITS_PER_PIECE
        )));
    }

    Ok(units as i64)
}
