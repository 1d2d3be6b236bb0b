//! Vector similarity and ranking utilities shared by the backends.
//!
//! Pure-Rust implementations of:
//! - Cosine similarity and the `[0, 1]` distance derived from it
//! - Nearest-neighbour ranking over a scanned collection
//! - Dump ordering (`chunk_index` first, insertion order second)

use shiksha_core::chunk::{ChunkMetadata, metadata_chunk_index};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Cosine distance rescaled into `[0, 1]`: 0 = identical, 1 = opposite.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    ((1.0 - cosine_similarity(a, b)) / 2.0).clamp(0.0, 1.0)
}

/// Rank `candidates` by distance to `query`, closest first.
///
/// Returns `(position, distance)` pairs for at most `limit` candidates.
/// Ties keep the candidates' original order.
pub fn nearest<'a>(
    query: &[f32],
    candidates: impl IntoIterator<Item = &'a [f32]>,
    limit: usize,
) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = candidates
        .into_iter()
        .enumerate()
        .map(|(i, emb)| (i, cosine_distance(query, emb)))
        .collect();

    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}

/// Sort key for full-collection dumps. Chunks without an index sort last.
pub fn dump_order_key(metadata: &ChunkMetadata, position: usize) -> (bool, usize, usize) {
    match metadata_chunk_index(metadata) {
        Some(index) => (false, index, position),
        None => (true, 0, position),
    }
}

/// Serialize an embedding vector to little-endian bytes.
pub fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Inverse of [`embedding_to_blob`]. Trailing partial floats are dropped.
pub fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
