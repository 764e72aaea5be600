//! Weight arithmetic shared by the allocator and the calculator.
//!
//! All comparisons use an absolute tolerance of `WEIGHT_EPSILON`.

/// Absolute tolerance for every weight comparison.
pub const WEIGHT_EPSILON: f64 = 1e-4;

/// Full course weight (100%).
pub const FULL_WEIGHT: f64 = 1.0;

/// Returns whether two weights are equal within `WEIGHT_EPSILON`.
pub fn approx_eq(left: f64, right: f64) -> bool {
    (left - right).abs() <= WEIGHT_EPSILON
}

/// Returns whether a weight is too small to keep as its own row.
pub fn is_effectively_zero(value: f64) -> bool {
    value.abs() <= WEIGHT_EPSILON
}

/// Returns whether `total` counts as a complete (100%) allocation.
pub fn is_full_allocation(total: f64) -> bool {
    approx_eq(total, FULL_WEIGHT)
}

/// Sums weights, compensating for float drift across many small rows.
pub fn total_weight(weights: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    for weight in weights {
        let adjusted = weight - compensation;
        let next = sum + adjusted;
        compensation = (next - sum) - adjusted;
        sum = next;
    }
    sum
}
