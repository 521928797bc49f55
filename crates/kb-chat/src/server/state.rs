//! Application state for the chat server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::ChatConfig;
use crate::error::Result;
use crate::session::{Pipeline, SessionManager};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: ChatConfig,
    /// Providers, loader, chunker and retrieval settings shared by all sessions
    pipeline: Pipeline,
    /// Live sessions
    sessions: SessionManager,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create state backed by the configured OpenAI-compatible API
    pub fn new(config: ChatConfig) -> Result<Self> {
        let pipeline = Pipeline::from_config(&config)?;
        tracing::info!(
            "Using {} for chat and {} for embeddings at {}",
            config.llm.chat_model,
            config.embeddings.model,
            config.llm.base_url
        );
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Create state with an explicit pipeline
    pub fn with_pipeline(config: ChatConfig, pipeline: Pipeline) -> Self {
        let sessions = SessionManager::with_idle_ttl(config.server.session_ttl());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                sessions,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &ChatConfig {
        &self.inner.config
    }

    /// Get the processing pipeline
    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    /// Get live sessions
    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
