//! Vector blob encoding and cosine math
//!
//! Embeddings are stored as little-endian BLOBs, half-precision when
//! `USE_HALF_VEC` is set. Cosine distance runs in Rust and is exposed to the
//! store through a registered scalar function.

use half::f16;

/// Encode an embedding as a BLOB
pub fn encode_vector(embedding: &[f32], use_half: bool) -> Vec<u8> {
    if use_half {
        embedding
            .iter()
            .flat_map(|v| f16::from_f32(*v).to_le_bytes())
            .collect()
    } else {
        embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}

/// Decode a BLOB back into an f32 embedding
pub fn decode_vector(bytes: &[u8], use_half: bool) -> Vec<f32> {
    if use_half {
        bytes
            .chunks_exact(2)
            .map(|chunk| f16::from_le_bytes([chunk[0], chunk[1]]).to_f32())
            .collect()
    } else {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Cosine distance `1 - similarity`; stored vectors are not unit length
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_blob_round_trip() {
        let original = vec![1.0f32, 2.0, 3.0, -1.5];
        let bytes = encode_vector(&original, false);
        assert_eq!(bytes.len(), 16);
        assert_eq!(decode_vector(&bytes, false), original);
    }

    #[test]
    fn f16_blob_round_trip() {
        let original = vec![0.5f32, -0.25, 1.0, 0.0];
        let bytes = encode_vector(&original, true);
        assert_eq!(bytes.len(), 8);
        // these values are exactly representable in f16
        assert_eq!(decode_vector(&bytes, true), original);
    }

    #[test]
    fn cosine_of_parallel_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![2.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
        assert!(cosine_distance(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_or_zero_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }
}
