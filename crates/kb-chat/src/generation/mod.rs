//! Prompt construction for grounded answers and question condensing

pub mod prompt;

pub use prompt::PromptBuilder;
