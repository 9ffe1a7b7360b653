//! Cosine similarity over precomputed magnitudes.
//!
//! Scores are "higher = more similar" and nominally in [-1, 1].
//! Documents carry their magnitude, so a search computes the query norm once
//! and every per-document score costs a single dot product.
//!
//! Sums are accumulated in `f64`, so large finite components do not overflow
//! before the division. A score that still comes out non-finite is reported
//! as 0.0; every score is finite and totally ordered.
//!
//! Vectors of different lengths are compared over the shorter prefix.
//! `try_cosine_similarity` is the strict variant that rejects the mismatch.

use crate::error::{Error, Result};

/// Cosine similarity: dot(a,b) / (magnitude_a * magnitude_b)
///
/// The dot product runs over `min(a.len(), b.len())` elements.
/// Returns 0.0 if either magnitude is zero or the result is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32], magnitude_a: f32, magnitude_b: f32) -> f32 {
    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }
    let score = dot_product_f64(a, b) / (magnitude_a as f64 * magnitude_b as f64);
    if !score.is_finite() || score == 0.0 {
        // Also folds -0.0 into 0.0
        return 0.0;
    }
    (score as f32).clamp(-1.0, 1.0)
}

/// Strict cosine similarity.
///
/// Same as [`cosine_similarity`] but fails with `DimensionMismatch` when the
/// vectors differ in length. `a` is treated as the reference (query) vector.
pub fn try_cosine_similarity(
    a: &[f32],
    b: &[f32],
    magnitude_a: f32,
    magnitude_b: f32,
) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(cosine_similarity(a, b, magnitude_a, magnitude_b))
}

/// Dot product over the common prefix of `a` and `b`
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    dot_product_f64(a, b) as f32
}

fn dot_product_f64(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| *x as f64 * *y as f64)
        .sum()
}

/// L2 norm (Euclidean length)
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter()
        .map(|x| {
            let x = *x as f64;
            x * x
        })
        .sum::<f64>()
        .sqrt() as f32
}
