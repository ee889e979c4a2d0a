//! Small dense-vector helpers shared by the encoders, the builder and the search engine.

/// Plain dot product. Equals cosine similarity when both inputs are unit length.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Scale `vector` to unit length in place. Returns `false` (leaving the input
/// untouched) for zero or non-finite vectors, which have no direction.
pub fn l2_normalize(vector: &mut [f32]) -> bool {
    let norm = l2_norm(vector);
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
    true
}

pub fn is_unit_length(vector: &[f32], tolerance: f32) -> bool {
    (l2_norm(vector) - 1.0).abs() <= tolerance
}
