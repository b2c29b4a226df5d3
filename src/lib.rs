//! # RFI Assistant
//!
//! A document-question-answering service for government Request-for-Information
//! (RFI) PDFs.
//!
//! A client uploads a PDF; the service extracts per-page text, asks the
//! Mistral API to derive a structured requirements list, chunks and embeds
//! the document into an in-memory vector index, and serves a chat endpoint
//! that routes each message either to a requirements-list editor or to a
//! retrieval-augmented question answerer.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────┐   ┌───────────────┐   ┌─────────────────┐
//! │ Upload │──▶│ Extract+Chunk │──▶│ Session          │
//! │  (PDF) │   │  +Embed       │   │  requirements    │
//! └────────┘   └───────────────┘   │  vector index    │
//!                                  └───────┬─────────┘
//!              ┌────────┐                  │
//! ┌──────┐     │ Router │──▶ edit ──▶ requirements editor
//! │ Chat │────▶│ (LLM)  │                  │
//! └──────┘     └────────┘──▶ question ──▶ RAG answerer
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with env overrides |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Overlapping fixed-size chunker |
//! | [`index`] | In-memory cosine-similarity index |
//! | [`mistral`] | Provider client with bounded retry |
//! | [`prompts`] | Prompt templates and output contracts |
//! | [`requirements`] | Requirements list and bullet parser |
//! | [`router`] | Edit/question classification |
//! | [`editor`] | Requirements editing pipeline |
//! | [`answer`] | Retrieval-augmented answering |
//! | [`session`] | Per-upload session state |
//! | [`baseline`] | Baseline questions file |
//! | [`server`] | HTTP API |

pub mod answer;
pub mod baseline;
pub mod chunk;
pub mod config;
pub mod editor;
pub mod extract;
pub mod index;
pub mod mistral;
pub mod models;
pub mod prompts;
pub mod requirements;
pub mod router;
pub mod server;
pub mod session;
