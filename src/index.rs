//! In-memory vector index.
//!
//! Holds a document's chunks and their embedding vectors behind
//! `std::sync::RwLock`. Search is brute-force cosine similarity over all
//! stored vectors — document-scale corpora are a few hundred chunks, so no
//! approximate index is needed. Nothing is persisted; the index lives and
//! dies with its session.

use anyhow::{bail, Result};
use std::sync::RwLock;

use crate::models::{DocumentChunk, ScoredChunk};

#[derive(Default)]
struct Inner {
    chunks: Vec<DocumentChunk>,
    vectors: Vec<Vec<f32>>,
}

/// Brute-force cosine-similarity index over one document's chunks.
#[derive(Default)]
pub struct VectorIndex {
    inner: RwLock<Inner>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the index contents with a new chunk/vector set.
    ///
    /// The two slices must be parallel: `vectors[i]` embeds `chunks[i]`.
    pub fn replace(&self, chunks: Vec<DocumentChunk>, vectors: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != vectors.len() {
            bail!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }
        let mut inner = self.inner.write().unwrap();
        inner.chunks = chunks;
        inner.vectors = vectors;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the `top_k` most similar chunks to the query vector,
    /// descending by cosine score.
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<ScoredChunk> {
        let inner = self.inner.read().unwrap();
        let mut scored: Vec<ScoredChunk> = inner
            .vectors
            .iter()
            .zip(inner.chunks.iter())
            .map(|(v, c)| ScoredChunk {
                chunk: c.clone(),
                score: cosine_similarity(query, v),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }
}

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, text: &str) -> DocumentChunk {
        DocumentChunk {
            text: text.to_string(),
            index,
            total_chunks: 3,
            page_numbers: vec![1],
        }
    }

    #[test]
    fn cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_or_empty_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn search_returns_descending_top_k() {
        let index = VectorIndex::new();
        index
            .replace(
                vec![chunk(0, "a"), chunk(1, "b"), chunk(2, "c")],
                vec![
                    vec![1.0, 0.0],
                    vec![0.0, 1.0],
                    vec![0.7, 0.7],
                ],
            )
            .unwrap();

        let results = index.search(&[1.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.index, 0);
        assert_eq!(results[1].chunk.index, 2);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn replace_rejects_mismatched_lengths() {
        let index = VectorIndex::new();
        assert!(index.replace(vec![chunk(0, "a")], vec![]).is_err());
    }
}
