//! Numeric utilities: centralized integer conversions.
//!
//! Prefer fallible conversions when an out-of-range value should stop the operation
//! (a negative `$limit`), and saturating ones for best-effort values (timings in logs).

#[inline]
#[must_use]
pub fn usize_to_u64(v: usize) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn u128_to_u64_saturating(v: u128) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn i64_to_usize(v: i64) -> Option<usize> {
    usize::try_from(v).ok()
}

/// Returns the integer value of `v` when it has no fractional part and fits in `i64`.
#[inline]
#[must_use]
pub fn f64_to_i64_exact(v: f64) -> Option<i64> {
    #[allow(clippy::cast_precision_loss)]
    let in_range = v >= i64::MIN as f64 && v < i64::MAX as f64;
    if v.is_finite() && v.fract() == 0.0 && in_range {
        #[allow(clippy::cast_possible_truncation)]
        Some(v as i64)
    } else {
        None
    }
}

/// Elapsed milliseconds since `start`, saturated into `u64`.
#[inline]
#[must_use]
pub fn elapsed_ms(start: std::time::Instant) -> u64 {
    u128_to_u64_saturating(start.elapsed().as_millis())
}
