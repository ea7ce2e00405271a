//! Numeric reductions shared by the estimators

use nalgebra::DVector;

/// Largest element of a vector, or `None` for an empty vector
pub fn max_element(values: &DVector<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Smallest element of a vector, or `None` for an empty vector
pub fn min_element(values: &DVector<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().copied().fold(f64::INFINITY, f64::min))
}

/// Numerically stable `ln(sum(exp(x)))`
///
/// Computed as `max(x) + ln(sum(exp(x - max(x))))` so that terms in the
/// hundreds (in either direction) neither overflow nor underflow to zero.
/// An empty input is the empty sum, `ln(0) = -inf`.
pub fn logsumexp(values: &DVector<f64>) -> f64 {
    let max = match max_element(values) {
        Some(m) => m,
        None => return f64::NEG_INFINITY,
    };

    // All terms -inf (sum is 0) or any term +inf (sum is +inf)
    if max.is_infinite() {
        return max;
    }

    let sum: f64 = values.iter().map(|x| (x - max).exp()).sum();
    max + sum.ln()
}
