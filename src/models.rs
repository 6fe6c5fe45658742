//! Core data types flowing through the ingestion and answer pipeline.

use serde::Serialize;
use uuid::Uuid;

/// One file handed to the ingestion orchestrator by the calling layer.
#[derive(Debug, Clone)]
pub struct IngestEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A chunk row ready for persistence, embedding included.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub content: String,
    /// Bounded-length prefix of `content`, shown in attributions.
    pub snippet: String,
    pub page_from: Option<i32>,
    pub page_to: Option<i32>,
    pub embedding: Vec<f32>,
}

/// A chunk returned by similarity search, with enough document context
/// to build answer grounding and attribution.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub document_id: Uuid,
    pub title: String,
    pub content: String,
    pub snippet: String,
    pub page_from: Option<i32>,
    pub page_to: Option<i32>,
}

/// Per-entry result of an ingestion batch.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub title: String,
    pub pages: Option<i32>,
    pub chunks: usize,
}

/// Response to one question: a bounded preview plus the id under which the
/// full answer text is cached.
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub answer_preview: String,
    pub answer_id: String,
    pub is_truncated: bool,
}
