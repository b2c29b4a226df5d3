//! Core data types shared across the extraction, indexing, and chat pipeline.

use serde::{Deserialize, Serialize};

/// A single entry in the derived requirements list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementEntry {
    pub heading: String,
    pub description: String,
}

/// A bounded span of document text used as the unit of embedding/retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub text: String,
    /// Position of this chunk within the document, starting at 0.
    pub index: usize,
    /// Total number of chunks produced for the document.
    pub total_chunks: usize,
    /// Ordered set of 1-based page numbers the chunk's span overlaps.
    pub page_numbers: Vec<usize>,
}

/// A chunk returned from similarity search, with its cosine score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}
