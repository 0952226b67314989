//! Fixed-point conversions at the chain boundary.
//!
//! On chain, base-asset sizes are integers scaled by 1e18 and prices and margin
//! by 1e6. Inside the ledger everything is an exact `Decimal` in natural units,
//! so `3 * 1e18` on the wire is `3` here. Conversion is lossless in both
//! directions for any value that fits the wire precision.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Decimal places of a chain-scaled base-asset quantity (1e18).
pub const SIZE_DECIMALS: u32 = 18;
/// Decimal places of a chain-scaled price or margin amount (1e6).
pub const PRICE_DECIMALS: u32 = 6;

/// 1e18 as an integer, for callers that still do scaled arithmetic.
pub const SIZE_BASE_PRECISION: i128 = 1_000_000_000_000_000_000;
/// 1e6 as an integer.
pub const PRICE_PRECISION: i128 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrecisionError {
    #[error("scaled value {raw} does not fit a 96-bit decimal at {decimals} places")]
    OutOfRange { raw: i128, decimals: u32 },

    #[error("value {value} has more than {decimals} decimal places")]
    TooPrecise { value: Decimal, decimals: u32 },

    #[error("value {value} overflows the scaled integer range")]
    Overflow { value: Decimal },

    #[error("{operation} overflows a 96-bit decimal")]
    ArithmeticOverflow { operation: &'static str },
}

pub fn from_scaled(raw: i128, decimals: u32) -> Result<Decimal, PrecisionError> {
    Decimal::try_from_i128_with_scale(raw, decimals)
        .map(|d| d.normalize())
        .map_err(|_| PrecisionError::OutOfRange { raw, decimals })
}

/// Exact inverse of [`from_scaled`]. Rejects values finer than the wire precision
/// instead of silently truncating them.
pub fn to_scaled(value: Decimal, decimals: u32) -> Result<i128, PrecisionError> {
    let mut rescaled = value.normalize();
    if rescaled.scale() > decimals {
        return Err(PrecisionError::TooPrecise { value, decimals });
    }
    // mantissa * 10^(decimals - scale)
    let shift = decimals - rescaled.scale();
    rescaled.set_scale(0).map_err(|_| PrecisionError::Overflow { value })?;
    let mut out = rescaled.to_i128().ok_or(PrecisionError::Overflow { value })?;
    for _ in 0..shift {
        out = out.checked_mul(10).ok_or(PrecisionError::Overflow { value })?;
    }
    Ok(out)
}

pub fn size_from_scaled(raw: i128) -> Result<Decimal, PrecisionError> {
    from_scaled(raw, SIZE_DECIMALS)
}

pub fn price_from_scaled(raw: i128) -> Result<Decimal, PrecisionError> {
    from_scaled(raw, PRICE_DECIMALS)
}

pub fn size_to_scaled(value: Decimal) -> Result<i128, PrecisionError> {
    to_scaled(value, SIZE_DECIMALS)
}

pub fn price_to_scaled(value: Decimal) -> Result<i128, PrecisionError> {
    to_scaled(value, PRICE_DECIMALS)
}
