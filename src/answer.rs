//! Retrieval-augmented question answering.
//!
//! Embeds the question, retrieves the top-k most similar chunks from the
//! session's index, and asks the model to answer strictly from those
//! excerpts. Grounding is enforced only through the prompt contract: the
//! model is told to reply with [`crate::prompts::REFUSAL_ANSWER`] when the
//! excerpts do not contain the answer.

use serde::Serialize;

use crate::index::VectorIndex;
use crate::mistral::{LlmClient, LlmError};
use crate::prompts;

/// A retrieved chunk reference returned alongside the answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    /// Chunk index within the document.
    pub index: usize,
    /// 1-based page numbers the chunk spans.
    pub page_numbers: Vec<usize>,
    /// Cosine similarity against the query.
    pub score: f32,
}

/// An answer plus the sources it was generated from.
#[derive(Debug, Clone)]
pub struct Answer {
    pub response: String,
    pub sources: Vec<SourceRef>,
}

/// Answer a question against the indexed document.
pub async fn answer_question(
    llm: &dyn LlmClient,
    index: &VectorIndex,
    question: &str,
    top_k: usize,
) -> Result<Answer, LlmError> {
    let query_vec = llm
        .embed(&[question.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("empty embedding response".to_string()))?;

    let retrieved = index.search(&query_vec, top_k);
    if retrieved.is_empty() {
        return Ok(Answer {
            response: prompts::REFUSAL_ANSWER.to_string(),
            sources: Vec::new(),
        });
    }

    let context = retrieved
        .iter()
        .map(|s| {
            let pages = s
                .chunk
                .page_numbers
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("[Excerpt {} (pages {})]\n{}", s.chunk.index + 1, pages, s.chunk.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    let response = llm
        .complete(&prompts::answer_messages(&context, question))
        .await?;

    let sources = retrieved
        .iter()
        .map(|s| SourceRef {
            index: s.chunk.index,
            page_numbers: s.chunk.page_numbers.clone(),
            score: s.score,
        })
        .collect();

    Ok(Answer {
        response: response.trim().to_string(),
        sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mistral::ChatMessage;
    use crate::models::DocumentChunk;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Mock that records the prompt it received and replies with a fixed
    /// string; embeds everything to the same direction so retrieval is
    /// deterministic.
    struct RecordingLlm {
        reply: String,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for RecordingLlm {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
            let prompt = messages
                .iter()
                .map(|m| m.content.clone())
                .collect::<Vec<_>>()
                .join("\n");
            self.seen.lock().unwrap().push(prompt);
            Ok(self.reply.clone())
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn indexed_chunk(index: usize, text: &str, vec: Vec<f32>) -> (DocumentChunk, Vec<f32>) {
        (
            DocumentChunk {
                text: text.to_string(),
                index,
                total_chunks: 2,
                page_numbers: vec![index + 1],
            },
            vec,
        )
    }

    #[tokio::test]
    async fn answers_with_sources_from_top_k() {
        let index = VectorIndex::new();
        let (c0, v0) = indexed_chunk(0, "The deadline is March 1.", vec![1.0, 0.0]);
        let (c1, v1) = indexed_chunk(1, "Unrelated boilerplate.", vec![0.0, 1.0]);
        index.replace(vec![c0, c1], vec![v0, v1]).unwrap();

        let llm = RecordingLlm {
            reply: "The deadline is March 1.".to_string(),
            seen: Mutex::new(Vec::new()),
        };

        let answer = answer_question(&llm, &index, "What is the deadline?", 1)
            .await
            .unwrap();
        assert_eq!(answer.response, "The deadline is March 1.");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].index, 0);
        assert_eq!(answer.sources[0].page_numbers, vec![1]);

        // The prompt carried the retrieved excerpt, not the whole document.
        let prompts_seen = llm.seen.lock().unwrap();
        assert!(prompts_seen[0].contains("The deadline is March 1."));
        assert!(!prompts_seen[0].contains("Unrelated boilerplate."));
    }

    #[tokio::test]
    async fn empty_index_refuses_without_calling_the_model() {
        let index = VectorIndex::new();
        let llm = RecordingLlm {
            reply: "should not be used".to_string(),
            seen: Mutex::new(Vec::new()),
        };

        let answer = answer_question(&llm, &index, "Anything?", 3).await.unwrap();
        assert_eq!(answer.response, prompts::REFUSAL_ANSWER);
        assert!(answer.sources.is_empty());
        assert!(llm.seen.lock().unwrap().is_empty());
    }
}
