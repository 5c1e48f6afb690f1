//! Guarded arithmetic for ratios and dispersion.
//!
//! Every ratio here has a zero-denominator guard that returns `0` instead
//! of `NaN` or infinity. A zero-ward county therefore reports a `0%` share
//! and a `0` density, never a division fault.

#![allow(clippy::cast_precision_loss)]

/// `part / whole * 100`, or `0.0` when `whole` is zero.
#[must_use]
pub fn percentage(part: u64, whole: u64) -> f64 {
    ratio(part as f64, whole as f64) * 100.0
}

/// `part / whole`, or `0.0` when `whole` is zero or not finite.
#[must_use]
pub fn ratio(part: f64, whole: f64) -> f64 {
    if whole == 0.0 || !whole.is_finite() {
        0.0
    } else {
        part / whole
    }
}

/// `round(part / whole)` with halves rounded up, or `0` when `whole` is
/// zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rounded_average(total: u64, count: u64) -> u64 {
    ratio(total as f64, count as f64).round() as u64
}

/// `a - b` as a signed count.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub const fn signed_difference(a: u64, b: u64) -> i64 {
    a as i64 - b as i64
}

/// `difference / base * 100`, truncated toward zero, or `0` when `base` is
/// zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn truncated_percentage_difference(difference: i64, base: u64) -> i64 {
    (ratio(difference as f64, base as f64) * 100.0).trunc() as i64
}

/// Wards per 1,000 km², or `0.0` when the area is zero.
#[must_use]
pub fn density_per_1000_sq_km(ward_count: u64, area_sq_km: f64) -> f64 {
    ratio(ward_count as f64, area_sq_km) * 1_000.0
}

/// Arithmetic mean, or `0.0` for an empty slice.
#[must_use]
pub fn mean(values: &[u64]) -> f64 {
    ratio(values.iter().sum::<u64>() as f64, values.len() as f64)
}

/// Population variance (divides by `n`), or `0.0` for an empty slice.
#[must_use]
pub fn population_variance(values: &[u64]) -> f64 {
    let m = mean(values);
    let squares: f64 = values.iter().map(|&v| (v as f64 - m).powi(2)).sum();
    ratio(squares, values.len() as f64)
}
