//! Shared vector math.
//!
//! All similarity computations in this crate go through `cosine_similarity`
//! so a single metric is used consistently across fit and score.

/// Dot product of two equal-length slices.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has (near-)zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

/// Element-wise mean of a non-empty set of equal-length vectors.
pub fn mean_vector(vectors: &[&[f32]]) -> Vec<f32> {
    debug_assert!(!vectors.is_empty());
    let dim = vectors[0].len();
    let mut mean = vec![0.0f32; dim];
    for v in vectors {
        for (m, x) in mean.iter_mut().zip(v.iter()) {
            *m += x;
        }
    }
    let n = vectors.len() as f32;
    for m in mean.iter_mut() {
        *m /= n;
    }
    mean
}
