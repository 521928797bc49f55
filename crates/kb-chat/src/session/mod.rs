//! Per-user session state and the processing pipeline

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::{ChatConfig, RetrievalConfig};
use crate::conversation::{ConversationEngine, Turn};
use crate::error::{Error, Result};
use crate::ingestion::{DocumentLoader, TextChunker};
use crate::providers::{ChatProvider, EmbeddingProvider, OpenAiClient};
use crate::retrieval::{VectorIndex, VectorSearch};
use crate::types::response::{ProcessResponse, ProcessSummary, SessionStatus};
use crate::types::{Answer, UploadedDocument};

/// Warning returned when a process action receives no documents
pub const EMPTY_BATCH_WARNING: &str = "Please upload documents.";

/// Greeting shown when a session starts
pub const GREETING: &str = "Hello👋, How can I help you today?";

/// Result of a process action
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// Nothing was run; the session is unchanged
    Rejected { warning: String },
    /// A new engine replaced the previous one
    Processed(ProcessSummary),
}

impl From<ProcessOutcome> for ProcessResponse {
    fn from(outcome: ProcessOutcome) -> Self {
        match outcome {
            ProcessOutcome::Rejected { warning } => ProcessResponse::Rejected { warning },
            ProcessOutcome::Processed(summary) => ProcessResponse::Processed { summary },
        }
    }
}

/// Loader, chunker, index builder and the shared providers
#[derive(Clone)]
pub struct Pipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatProvider>,
    loader: DocumentLoader,
    chunker: TextChunker,
    retrieval: RetrievalConfig,
    batch_size: usize,
    condense_question: bool,
}

impl Pipeline {
    /// Create a pipeline with explicit providers
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatProvider>,
        config: &ChatConfig,
    ) -> Result<Self> {
        Ok(Self {
            embedder,
            chat,
            loader: DocumentLoader::new(config.ingestion.on_parse_error),
            chunker: TextChunker::from_config(&config.chunking)?,
            retrieval: config.retrieval.clone(),
            batch_size: config.embeddings.batch_size,
            condense_question: config.conversation.condense_question,
        })
    }

    /// Create a pipeline backed by one OpenAI-compatible client
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let client = Arc::new(OpenAiClient::new(config)?);
        Self::new(client.clone(), client, config)
    }

    /// Embedding provider
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Chat provider
    pub fn chat(&self) -> &Arc<dyn ChatProvider> {
        &self.chat
    }

    /// Run loader, chunker and index builder, then bind a fresh engine
    pub async fn build_engine(
        &self,
        documents: Vec<UploadedDocument>,
    ) -> Result<(ConversationEngine, ProcessSummary)> {
        let start = Instant::now();

        let loader = self.loader.clone();
        let raw = tokio::task::spawn_blocking(move || loader.load(&documents))
            .await
            .map_err(|e| Error::internal(format!("Extraction task failed: {}", e)))??;

        let chunks = self.chunker.chunk(&raw.text);
        tracing::info!(
            "Split {} characters from {} documents into {} chunks",
            raw.char_len(),
            raw.documents.len(),
            chunks.len()
        );

        let index = VectorIndex::build(
            chunks,
            self.embedder.as_ref(),
            self.batch_size,
            self.retrieval.metric,
        )
        .await?;

        let summary = ProcessSummary {
            total_characters: raw.char_len(),
            total_chunks: index.len(),
            dimensions: index.dimensions(),
            documents: raw.documents,
            skipped: raw.skipped,
            processing_time_ms: start.elapsed().as_millis() as u64,
            processed_at: Utc::now(),
        };

        let engine = ConversationEngine::new(
            Arc::new(index),
            self.embedder.clone(),
            self.chat.clone(),
            self.retrieval.top_k,
        )
        .with_condense_question(self.condense_question);

        Ok((engine, summary))
    }
}

/// One user's conversation: zero or one engine plus the last batch summary
pub struct Session {
    id: Uuid,
    engine: Option<ConversationEngine>,
    last_batch: Option<ProcessSummary>,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            engine: None,
            last_batch: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether an engine is bound
    pub fn is_active(&self) -> bool {
        self.engine.is_some()
    }

    /// Turns of the current engine, empty when idle
    pub fn history(&self) -> &[Turn] {
        self.engine.as_ref().map(|e| e.history()).unwrap_or(&[])
    }

    /// Build a new engine from `documents` and make it current.
    ///
    /// An empty batch is rejected without touching the pipeline. Errors
    /// leave the current engine in place.
    pub async fn process(
        &mut self,
        pipeline: &Pipeline,
        documents: Vec<UploadedDocument>,
    ) -> Result<ProcessOutcome> {
        if documents.is_empty() {
            tracing::warn!("Process requested for session {} with no documents", self.id);
            return Ok(ProcessOutcome::Rejected {
                warning: EMPTY_BATCH_WARNING.to_string(),
            });
        }

        tracing::info!("Processing {} documents for session {}", documents.len(), self.id);
        let (engine, summary) = match pipeline.build_engine(documents).await {
            Ok(built) => built,
            Err(e) => {
                if e.is_ingestion_error() {
                    tracing::warn!("Session {} kept its previous index: {}", self.id, e);
                } else {
                    tracing::error!("Session {} processing failed: {}", self.id, e);
                }
                return Err(e);
            }
        };

        self.replace_engine(engine);
        self.last_batch = Some(summary.clone());

        tracing::info!(
            "Session {} ready: {} chunks in {}ms",
            self.id,
            summary.total_chunks,
            summary.processing_time_ms
        );
        Ok(ProcessOutcome::Processed(summary))
    }

    /// Make `engine` current, discarding the previous one and its history
    pub fn replace_engine(&mut self, engine: ConversationEngine) {
        if let Some(previous) = self.engine.replace(engine) {
            tracing::debug!(
                "Session {} discarded engine with {} turns",
                self.id,
                previous.turns()
            );
        }
    }

    /// Answer a question with the current engine
    pub async fn ask(&mut self, question: &str) -> Result<Answer> {
        let engine = self.engine.as_mut().ok_or(Error::NoActiveConversation)?;
        engine.answer(question).await
    }

    /// Snapshot for the status endpoint
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.id,
            active: self.is_active(),
            turns: self.history().len(),
            last_batch: self.last_batch.clone(),
            created_at: self.created_at,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_used: Instant,
}

impl SessionEntry {
    fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            last_used: Instant::now(),
        }
    }
}

/// Live sessions keyed by ID, each behind its own lock
///
/// With an idle TTL, sessions untouched for longer than the TTL are dropped
/// on the next [`SessionManager::evict_idle`] pass. Sessions a request is
/// still holding are never evicted.
#[derive(Default)]
pub struct SessionManager {
    sessions: DashMap<Uuid, SessionEntry>,
    idle_ttl: Option<Duration>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that evicts sessions idle for longer than `ttl`
    pub fn with_idle_ttl(ttl: Option<Duration>) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl: ttl.filter(|ttl| !ttl.is_zero()),
        }
    }

    pub fn idle_ttl(&self) -> Option<Duration> {
        self.idle_ttl
    }

    /// Start a new idle session
    pub fn create(&self) -> Uuid {
        self.evict_idle();

        let session = Session::new();
        let id = session.id();
        self.sessions.insert(id, SessionEntry::new(session));
        tracing::info!("Created session {}", id);
        id
    }

    /// Look up a session and mark it used
    pub fn get(&self, id: Uuid) -> Result<Arc<Mutex<Session>>> {
        let mut entry = self
            .sessions
            .get_mut(&id)
            .ok_or(Error::SessionNotFound(id))?;
        entry.last_used = Instant::now();
        Ok(entry.session.clone())
    }

    pub fn remove(&self, id: Uuid) -> Result<()> {
        if self.sessions.remove(&id).is_none() {
            return Err(Error::SessionNotFound(id));
        }
        tracing::info!("Removed session {}", id);
        Ok(())
    }

    /// Drop sessions idle past the TTL, returning how many were removed
    pub fn evict_idle(&self) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };

        let before = self.sessions.len();
        self.sessions.retain(|id, entry| {
            let keep = Arc::strong_count(&entry.session) > 1 || entry.last_used.elapsed() < ttl;
            if !keep {
                tracing::debug!("Evicting idle session {}", id);
            }
            keep
        });

        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::info!("Evicted {} idle sessions", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
