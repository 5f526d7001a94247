//! Centre estimators over neighbour wind components.

use crate::Vector2;

/// Median of `values` (midpoint of the two middle values for even counts).
/// Reorders `values`; `None` when empty.
pub fn median(values: &mut [f32]) -> Option<f32> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    })
}

/// Independent medians of the u and v components.
pub fn component_median(vectors: &[Vector2]) -> Option<Vector2> {
    let mut u: Vec<f32> = vectors.iter().map(|v| v.x).collect();
    let mut v: Vec<f32> = vectors.iter().map(|v| v.y).collect();
    Some(Vector2::new(median(&mut u)?, median(&mut v)?))
}

/// Vector mean.
pub fn component_mean(vectors: &[Vector2]) -> Option<Vector2> {
    if vectors.is_empty() {
        return None;
    }
    let sum: Vector2 = vectors.iter().sum();
    Some(sum / vectors.len() as f32)
}
