//! Request types

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A question sent to the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The question to answer
    pub question: String,
}

impl ChatRequest {
    /// Create a new chat request
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }

    /// Trimmed question, rejecting blank input
    pub fn validated_question(&self) -> Result<&str> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(Error::InvalidRequest("question must not be empty".to_string()));
        }
        Ok(question)
    }
}
