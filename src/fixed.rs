//! Q31.32 relative-motion deltas
//!
//! Relative pointer deltas are carried as signed 64-bit fixed point with 32
//! fractional bits, so consumers can accumulate sub-pixel motion across frames
//! without floating-point drift.

use std::fmt;

/// Number of fractional bits
pub const FRAC_BITS: u32 = 32;

/// Signed Q31.32 fixed-point value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fixed(i64);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(1 << FRAC_BITS);

    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Whole pixels
    pub const fn from_int(value: i32) -> Self {
        Self((value as i64) << FRAC_BITS)
    }

    /// Wayland `wl_fixed_t` (signed 24.8)
    pub const fn from_wl_fixed(value: i32) -> Self {
        Self((value as i64) << (FRAC_BITS - 8))
    }

    /// XInput `FP3232` (signed integral part, unsigned fraction)
    pub const fn from_fp3232(integral: i32, frac: u32) -> Self {
        Self(((integral as i64) << FRAC_BITS) | frac as i64)
    }

    /// Floating delta, rounded to the nearest 1/256 pixel first
    ///
    /// The value is quantized to 24.8 the same way `wl_fixed_from_double`
    /// does (signed add/subtract 0.5, then truncate) and then shifted like a
    /// native 24.8 delta. Out-of-range values saturate.
    pub fn from_f64(value: f64) -> Self {
        let scaled = value * 256.0;
        let rounded = if scaled >= 0.0 {
            scaled + 0.5
        } else {
            scaled - 0.5
        };
        // `as` truncates toward zero and saturates (NaN becomes 0)
        Self::from_wl_fixed(rounded as i32)
    }

    /// Integer part, rounded toward negative infinity
    pub const fn floor(self) -> i32 {
        (self.0 >> FRAC_BITS) as i32
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / (1u64 << FRAC_BITS) as f64
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn saturating_add(self, other: Fixed) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}
