//! Core types for the chatbot

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, UploadedDocument};
pub use query::ChatRequest;
pub use response::{Answer, ProcessSummary, SourceChunk};
