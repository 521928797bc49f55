//! Error types for the chatbot

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for chatbot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Chatbot errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// API credential is absent or empty
    #[error("{0} is not set. Please add your key in .env file.")]
    MissingCredential(&'static str),

    /// Processing was requested without any documents
    #[error("Please upload documents.")]
    EmptyDocumentSet,

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Documents parsed but contained no text
    #[error("No text could be extracted from the uploaded documents")]
    NoTextExtracted,

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index error
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// Chat completion error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Question asked before any documents were processed
    #[error("No documents have been processed for this session")]
    NoActiveConversation,

    /// Session not found
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    /// Malformed request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector index error
    pub fn vector_index(message: impl Into<String>) -> Self {
        Self::VectorIndex(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error came from the uploaded documents rather than the system
    pub fn is_ingestion_error(&self) -> bool {
        matches!(
            self,
            Error::EmptyDocumentSet | Error::FileParse { .. } | Error::NoTextExtracted
        )
    }

    /// HTTP status and machine-readable type for this error
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::MissingCredential(_) => (StatusCode::INTERNAL_SERVER_ERROR, "missing_credential"),
            Error::EmptyDocumentSet => (StatusCode::BAD_REQUEST, "empty_document_set"),
            Error::FileParse { .. } => (StatusCode::BAD_REQUEST, "parse_error"),
            Error::NoTextExtracted => (StatusCode::UNPROCESSABLE_ENTITY, "no_text_extracted"),
            Error::Embedding(_) => (StatusCode::BAD_GATEWAY, "embedding_error"),
            Error::VectorIndex(_) => (StatusCode::INTERNAL_SERVER_ERROR, "vector_index_error"),
            Error::Llm(_) => (StatusCode::SERVICE_UNAVAILABLE, "llm_error"),
            Error::NoActiveConversation => (StatusCode::CONFLICT, "no_active_conversation"),
            Error::SessionNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
