//! Response types for processing and chat

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::Turn;
use crate::retrieval::SearchResult;

/// A retrieved chunk shown alongside an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceChunk {
    /// Chunk position in source order
    pub chunk_index: usize,
    /// Chunk text
    pub content: String,
    /// Raw metric score (distance for euclidean, similarity otherwise)
    pub score: f32,
}

impl From<&SearchResult> for SourceChunk {
    fn from(result: &SearchResult) -> Self {
        Self {
            chunk_index: result.chunk.index,
            content: result.chunk.content.clone(),
            score: result.score,
        }
    }
}

/// Generated answer for one question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text, unstructured
    pub text: String,
    /// Chunks the answer was conditioned on
    pub sources: Vec<SourceChunk>,
    /// Zero-based position of the recorded turn
    pub turn_index: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Per-document details of a processed batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Filename
    pub filename: String,
    /// SHA-256 of the uploaded bytes
    pub content_hash: String,
    /// File size in bytes
    pub file_size: u64,
    /// Number of pages read
    pub pages: u32,
    /// Characters contributed to the batch text
    pub characters: usize,
}

/// Result of a successful process action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSummary {
    /// Documents included in the index
    pub documents: Vec<DocumentSummary>,
    /// Documents dropped under the skip policy
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub skipped: Vec<SkippedDocument>,
    /// Total characters extracted
    pub total_characters: usize,
    /// Chunks indexed
    pub total_chunks: usize,
    /// Embedding dimensions of the index
    pub dimensions: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// When the index was built
    pub processed_at: DateTime<Utc>,
}

/// A document dropped from a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedDocument {
    /// Filename
    pub filename: String,
    /// Why it was dropped
    pub error: String,
}

/// Body of the process endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessResponse {
    /// Pipeline was not invoked
    Rejected { warning: String },
    /// Index built and conversation reset
    Processed {
        #[serde(flatten)]
        summary: ProcessSummary,
    },
}

/// Body of the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Answer text
    pub answer: String,
    /// Chunks the answer was conditioned on
    pub sources: Vec<SourceChunk>,
    /// Zero-based position of the recorded turn
    pub turn_index: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl From<Answer> for ChatResponse {
    fn from(answer: Answer) -> Self {
        Self {
            answer: answer.text,
            sources: answer.sources,
            turn_index: answer.turn_index,
            processing_time_ms: answer.processing_time_ms,
        }
    }
}

/// Body of the history endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Turns in ask order
    pub turns: Vec<Turn>,
}

/// Body of the session status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Session ID
    pub session_id: uuid::Uuid,
    /// Whether a conversation engine is bound
    pub active: bool,
    /// Number of recorded turns
    pub turns: usize,
    /// Summary of the last processed batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_batch: Option<ProcessSummary>,
    /// Session creation time
    pub created_at: DateTime<Utc>,
}
