// Similarity scoring for the local retrieval fallback


/// Cosine similarity between two equal-length vectors.
///
/// A zero-norm operand makes the denominator 1 instead of 0, so comparing
/// against an all-zero vector yields 0.0 rather than dividing by zero.
/// Malformed embeddings are the only way to hit that path and callers rely
/// on the score being 0 there, so it stays.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have equal length");

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return dot;
    }

    dot / denominator
}
