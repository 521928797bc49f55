//! Configuration for the chatbot

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retrieval::DistanceMetric;

/// Environment variable holding the API key for embeddings and chat
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable pointing at an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "KB_CHAT_CONFIG";

/// Upper bound on `llm.max_retries`
pub const MAX_RETRIES: u32 = 10;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// OpenAI-compatible API configuration
    pub llm: LlmConfig,
    /// Embedding request configuration
    pub embeddings: EmbeddingConfig,
    /// Text chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Document ingestion configuration
    pub ingestion: IngestionConfig,
    /// Conversation configuration
    pub conversation: ConversationConfig,
}

impl ChatConfig {
    /// Load configuration: optional TOML file, then environment overrides.
    ///
    /// Reads `.env` first so values defined there behave like real
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(Into::into));

        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV) {
            self.llm.api_key = key;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("KB_CHAT_CHAT_MODEL") {
            self.llm.chat_model = model;
        }
        if let Some(model) = lookup("KB_CHAT_EMBED_MODEL") {
            self.embeddings.model = model;
        }
        if let Some(host) = lookup("KB_CHAT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("KB_CHAT_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid KB_CHAT_PORT '{}': {}", port, e)))?;
        }
        Ok(())
    }

    /// Fail when the API credential is absent or empty
    pub fn require_credential(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            return Err(Error::MissingCredential(API_KEY_ENV));
        }
        Ok(())
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".to_string()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be at least 1".to_string()));
        }
        if self.llm.max_retries > MAX_RETRIES {
            return Err(Error::Config(format!(
                "llm.max_retries ({}) is larger than {}",
                self.llm.max_retries, MAX_RETRIES
            )));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
    /// Seconds a session may sit idle before it is dropped (0 = never)
    pub session_ttl_secs: u64,
}

impl ServerConfig {
    /// Idle session lifetime, `None` when eviction is off
    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
            session_ttl_secs: 3600,
        }
    }
}

/// OpenAI-compatible API configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL (without the `/v1` suffix)
    pub base_url: String,
    /// API key, normally taken from `OPENAI_API_KEY`
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Chat completion model name
    pub chat_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests (0 = fail on first error)
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            chat_model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            timeout_secs: 120,
            max_retries: 0,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("chat_model", &self.chat_model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model name
    pub model: String,
    /// Number of texts sent per embeddings request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            batch_size: 100,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
    /// Preferred split boundary; falls back to single characters
    pub separator: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separator: "\n".to_string(),
        }
    }
}

impl ChunkingConfig {
    /// Check chunk size and overlap
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be at least 1".to_string()));
        }
        if self.chunk_overlap > self.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) is larger than chunking.chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per question
    pub top_k: usize,
    /// Distance metric used by the vector index
    pub metric: DistanceMetric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            metric: DistanceMetric::Euclidean,
        }
    }
}

/// What to do with a batch when one of its documents cannot be parsed
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParseFailurePolicy {
    /// Fail the whole batch
    #[default]
    Abort,
    /// Drop the document and continue with the rest
    Skip,
}

/// Document ingestion configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Batch behaviour on unparseable documents
    pub on_parse_error: ParseFailurePolicy,
}

/// Conversation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Rephrase follow-up questions into standalone questions before retrieval
    pub condense_question: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ChatConfig::default();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.chunking.separator, "\n");
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.retrieval.metric, DistanceMetric::Euclidean);
        assert_eq!(config.ingestion.on_parse_error, ParseFailurePolicy::Abort);
        assert_eq!(config.llm.max_retries, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_credential() {
        let mut config = ChatConfig::default();
        assert!(matches!(
            config.require_credential(),
            Err(Error::MissingCredential(API_KEY_ENV))
        ));

        config.llm.api_key = "   ".to_string();
        assert!(config.require_credential().is_err());

        config.llm.api_key = "sk-test".to_string();
        assert!(config.require_credential().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-env"),
            ("OPENAI_BASE_URL", "http://localhost:9999"),
            ("KB_CHAT_PORT", "3000"),
        ]
        .into_iter()
        .collect();

        let mut config = ChatConfig::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.llm.api_key, "sk-env");
        assert_eq!(config.llm.base_url, "http://localhost:9999");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = ChatConfig::default();
        let result = config.apply_env_overrides(|k| {
            (k == "KB_CHAT_PORT").then(|| "not-a-port".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_toml() {
        let config = ChatConfig::from_toml(
            r#"
            [retrieval]
            top_k = 6
            metric = "cosine"

            [ingestion]
            on_parse_error = "skip"
            "#,
        )
        .unwrap();

        assert_eq!(config.retrieval.top_k, 6);
        assert_eq!(config.retrieval.metric, DistanceMetric::Cosine);
        assert_eq!(config.ingestion.on_parse_error, ParseFailurePolicy::Skip);
        // Untouched sections keep their defaults
        assert_eq!(config.chunking.chunk_size, 1000);
    }

    #[test]
    fn test_overlap_larger_than_size_rejected() {
        let chunking = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 200,
            ..Default::default()
        };
        assert!(chunking.validate().is_err());
    }

    #[test]
    fn test_excessive_retries_rejected() {
        let mut config = ChatConfig::default();
        config.llm.max_retries = MAX_RETRIES;
        assert!(config.validate().is_ok());

        config.llm.max_retries = MAX_RETRIES + 1;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_session_ttl() {
        let mut server = ServerConfig::default();
        assert_eq!(server.session_ttl(), Some(Duration::from_secs(3600)));

        server.session_ttl_secs = 0;
        assert_eq!(server.session_ttl(), None);
    }

    #[test]
    fn test_debug_redacts_key() {
        let mut llm = LlmConfig::default();
        llm.api_key = "sk-secret".to_string();
        let printed = format!("{:?}", llm);
        assert!(!printed.contains("sk-secret"));
    }
}
