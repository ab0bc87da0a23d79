//! Embedding vector blob codec and cosine similarity.

/// Encode a vector as a tight little-endian float64 blob, no length
/// prefix — the column's byte length recovers the dimension.
pub fn serialize_vector(v: &[f64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() * 8);
    for x in v {
        out.extend_from_slice(&x.to_le_bytes());
    }
    out
}

/// Decode a blob produced by [`serialize_vector`]. `None` on a blob
/// whose length is not a multiple of 8, or an empty blob.
pub fn deserialize_vector(b: &[u8]) -> Option<Vec<f64>> {
    if b.is_empty() || b.len() % 8 != 0 {
        return None;
    }
    Some(
        b.chunks_exact(8)
            .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
            .collect(),
    )
}

/// Cosine similarity. Returns 0 on empty input, mismatched dimensions,
/// or either vector having zero norm.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_is_identity() {
        let v = vec![1.0, -2.5, 0.0, 3.333_333_3];
        let blob = serialize_vector(&v);
        assert_eq!(blob.len(), v.len() * 8);
        assert_eq!(deserialize_vector(&blob).unwrap(), v);
    }

    #[test]
    fn deserialize_rejects_misaligned_blob() {
        assert_eq!(deserialize_vector(&[1, 2, 3]), None);
        assert_eq!(deserialize_vector(&[]), None);
    }

    #[test]
    fn cosine_self_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_opposite_is_minus_one() {
        let v = vec![1.0, 2.0, 3.0];
        let neg: Vec<f64> = v.iter().map(|x| -x).collect();
        assert!((cosine_similarity(&v, &neg) - (-1.0)).abs() < 1e-9);
    }

    #[test]
    fn cosine_zero_on_mismatched_dims_or_empty_or_zero_norm() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn semantic_auto_link_scenario_threshold() {
        let a = vec![1.0, 0.0, 0.0, 0.0];
        let b = vec![0.99, 0.01, 0.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!(sim > 0.999 && sim < 1.0, "expected ~0.9998, got {sim}");

        let orthogonal = cosine_similarity(&[1.0, 0.0, 0.0, 0.0], &[0.0, 1.0, 0.0, 0.0]);
        assert_eq!(orthogonal, 0.0);
    }
}
