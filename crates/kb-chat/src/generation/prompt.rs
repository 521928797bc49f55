//! Prompt templates for conversational retrieval

use crate::conversation::Turn;
use crate::providers::ChatMessage;
use crate::retrieval::SearchResult;

const ANSWER_INSTRUCTIONS: &str = "Use the following pieces of context to answer the user's question. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Prompt builder for conversational RAG
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunks in rank order
    pub fn build_context(results: &[SearchResult]) -> String {
        results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Messages for the answer request.
    ///
    /// System message with instructions and context, then every prior turn
    /// as a user/assistant pair, then the current question.
    pub fn answer_messages(question: &str, context: &str, history: &[Turn]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(ChatMessage::system(format!(
            "{}\n----------------\n{}",
            ANSWER_INSTRUCTIONS, context
        )));

        for turn in history {
            messages.push(ChatMessage::user(turn.question.as_str()));
            messages.push(ChatMessage::assistant(turn.answer.as_str()));
        }

        messages.push(ChatMessage::user(question));
        messages
    }

    /// Prompt asking for a standalone rephrasing of a follow-up question
    pub fn condense_prompt(question: &str, history: &[Turn]) -> String {
        format!(
            "Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question, in its original language.\n\n\
             Chat History:\n{}\nFollow Up Input: {}\nStandalone question:",
            Self::format_history(history),
            question
        )
    }

    /// Render history as alternating Human/Assistant lines
    pub fn format_history(history: &[Turn]) -> String {
        history
            .iter()
            .map(|turn| format!("Human: {}\nAssistant: {}", turn.question, turn.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
