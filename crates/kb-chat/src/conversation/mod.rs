//! Conversational retrieval over a bound vector index

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::{ChatMessage, ChatProvider, EmbeddingProvider};
use crate::retrieval::VectorSearch;
use crate::types::response::SourceChunk;
use crate::types::Answer;

/// One question and the answer it received
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        }
    }
}

/// Turn history of one engine, in ask order
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    turns: Vec<Turn>,
}

impl ConversationState {
    pub fn push(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Answers questions against one index, remembering prior turns.
///
/// Built once per processed batch. A new batch gets a new engine, which
/// starts with an empty history.
pub struct ConversationEngine {
    index: Arc<dyn VectorSearch>,
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatProvider>,
    top_k: usize,
    condense_question: bool,
    state: ConversationState,
}

impl ConversationEngine {
    /// Bind an index and providers with an empty history
    pub fn new(
        index: Arc<dyn VectorSearch>,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            chat,
            top_k: top_k.max(1),
            condense_question: false,
            state: ConversationState::default(),
        }
    }

    /// Rephrase follow-up questions into standalone ones before retrieval
    pub fn with_condense_question(mut self, enabled: bool) -> Self {
        self.condense_question = enabled;
        self
    }

    /// Bound index
    pub fn index(&self) -> &Arc<dyn VectorSearch> {
        &self.index
    }

    /// Recorded turns in ask order
    pub fn history(&self) -> &[Turn] {
        self.state.turns()
    }

    /// Number of recorded turns
    pub fn turns(&self) -> usize {
        self.state.len()
    }

    /// Answer a question and record the turn.
    ///
    /// On any failure the history is left unchanged.
    pub async fn answer(&mut self, question: &str) -> Result<Answer> {
        let start = Instant::now();
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidRequest("question must not be empty".to_string()));
        }

        let search_query = self.standalone_question(question).await?;

        let query_vector = self.embedder.embed(&search_query).await?;
        let results = self.index.search(&query_vector, self.top_k)?;
        tracing::debug!("Retrieved {} chunks for question", results.len());

        let context = PromptBuilder::build_context(&results);
        let messages = PromptBuilder::answer_messages(question, &context, self.state.turns());
        let text = self.chat.generate(&messages).await?;

        let turn_index = self.state.push(Turn::new(question, text.clone()));
        let processing_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "Answered turn {} with {} sources in {}ms",
            turn_index,
            results.len(),
            processing_time_ms
        );

        Ok(Answer {
            text,
            sources: results.iter().map(SourceChunk::from).collect(),
            turn_index,
            processing_time_ms,
        })
    }

    async fn standalone_question(&self, question: &str) -> Result<String> {
        if !self.condense_question || self.state.is_empty() {
            return Ok(question.to_string());
        }

        let prompt = PromptBuilder::condense_prompt(question, self.state.turns());
        let rephrased = self.chat.generate(&[ChatMessage::user(prompt)]).await?;
        let rephrased = rephrased.trim();

        if rephrased.is_empty() {
            Ok(question.to_string())
        } else {
            tracing::debug!("Condensed follow-up to: {}", rephrased);
            Ok(rephrased.to_string())
        }
    }
}
