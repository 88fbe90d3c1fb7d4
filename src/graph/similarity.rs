use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimilarityError {
    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Thresholds within this distance of 1.0 leave no range to remap from.
const DEGENERATE_RANGE: f32 = 1e-6;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a <= 0.0 || norm_b <= 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32)
}

/// Linearly remaps `similarity` from `[threshold, 1]` onto `[min, max]`.
pub fn thickness_from_similarity(
    similarity: f32,
    threshold: f32,
    min_thickness: f32,
    max_thickness: f32,
) -> f32 {
    let range = 1.0 - threshold;
    if range <= DEGENERATE_RANGE {
        return max_thickness;
    }

    let t = ((similarity - threshold) / range).clamp(0.0, 1.0);
    min_thickness + (max_thickness - min_thickness) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_are_fully_similar() {
        let v = [0.3, -1.2, 4.0, 0.01];
        let similarity = cosine_similarity(&v, &v).unwrap();
        assert!((similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_has_zero_similarity() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn orthogonal_vectors_are_unrelated() {
        let similarity = cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).unwrap();
        assert!(similarity.abs() < 1e-6);
    }

    #[test]
    fn unequal_lengths_are_rejected() {
        assert_eq!(
            cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]),
            Err(SimilarityError::DimensionMismatch { left: 2, right: 3 })
        );
    }

    #[test]
    fn thickness_spans_configured_range() {
        assert_eq!(thickness_from_similarity(0.7, 0.7, 0.5, 5.0), 0.5);
        assert_eq!(thickness_from_similarity(1.0, 0.7, 0.5, 5.0), 5.0);

        let middle = thickness_from_similarity(0.85, 0.7, 1.0, 3.0);
        assert!((middle - 2.0).abs() < 1e-5);
    }

    #[test]
    fn threshold_of_one_maps_to_max_thickness() {
        assert_eq!(thickness_from_similarity(1.0, 1.0, 0.5, 5.0), 5.0);
    }
}
