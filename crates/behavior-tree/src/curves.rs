//! Response curves for shaping consideration inputs.
//!
//! Every curve clamps its input to `[0, 1]` before evaluation and clamps its
//! output to the same range. `NaN` maps to 0.

/// Clamps to `[0, 1]`, mapping `NaN` to 0.
#[inline]
pub fn unit(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

/// `m * x + b`.
pub fn linear(x: f64, m: f64, b: f64) -> f64 {
    unit(m * unit(x) + b)
}

/// `x ^ exp`.
pub fn quadratic(x: f64, exp: f64) -> f64 {
    unit(unit(x).powf(exp))
}

/// Sigmoid with steepness `k` centred on `midpoint`.
pub fn logistic(x: f64, k: f64, midpoint: f64) -> f64 {
    unit(1.0 / (1.0 + (-k * (unit(x) - midpoint)).exp()))
}

/// `1 - x ^ steepness`.
pub fn inverse(x: f64, steepness: f64) -> f64 {
    unit(1.0 - unit(x).powf(steepness))
}

/// 1 at or above `threshold`, 0 below.
pub fn step(x: f64, threshold: f64) -> f64 {
    if unit(x) >= threshold { 1.0 } else { 0.0 }
}
