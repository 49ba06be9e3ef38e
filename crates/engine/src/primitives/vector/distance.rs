//! Similarity functions for vector search.
//!
//! All scores are normalized to "higher = more similar", so ranking is a
//! plain descending sort whatever the metric. Vectors are used as stored:
//! nothing is normalized implicitly.

use fabric_core::DistanceMetric;

/// Similarity of two equal-length vectors under `metric`.
///
/// Sums run in `f64`: large but finite components would overflow `f32`
/// norms and collapse the score.
pub fn similarity(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "dimension mismatch in similarity");

    let score = match metric {
        DistanceMetric::Cosine => cosine(a, b),
        DistanceMetric::Euclidean => 1.0 / (1.0 + l2_distance(a, b)),
        DistanceMetric::DotProduct => dot(a, b),
    };
    score as f32
}

/// Cosine similarity in [-1, 1]; 0 when either vector has zero norm.
fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .map(|(x, y)| (f64::from(*x), f64::from(*y)))
        .fold((0.0f64, 0.0f64, 0.0f64), |(d, na, nb), (x, y)| {
            (d + x * y, na + x * x, nb + y * y)
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

fn l2_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
