//! Provider abstractions for embeddings and chat completion
//!
//! The conversation engine and index builder only see the traits, so tests
//! and alternative backends can swap the OpenAI-compatible client out.

pub mod embedding;
pub mod llm;
pub mod openai;

pub use embedding::EmbeddingProvider;
pub use llm::{ChatMessage, ChatProvider, Role};
pub use openai::OpenAiClient;
