//! kb-chat: chat with your PDFs through retrieval-augmented generation
//!
//! Uploaded PDFs are split into overlapping chunks, embedded into an
//! in-memory vector index, and questions are answered by an
//! OpenAI-compatible chat model conditioned on the closest chunks and the
//! conversation so far. Served over HTTP (`kb-chat-server`) or in the
//! terminal (`kb-chat`).

pub mod config;
pub mod conversation;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod session;
pub mod types;

pub use config::ChatConfig;
pub use conversation::{ConversationEngine, Turn};
pub use error::{Error, Result};
pub use session::{Pipeline, ProcessOutcome, Session, SessionManager};
pub use types::{
    document::{Chunk, UploadedDocument},
    query::ChatRequest,
    response::{Answer, ProcessSummary, SourceChunk},
};
