//! Uploaded document and chunk types

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One uploaded PDF, consumed once by the loader
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Original filename (used only for reporting)
    pub filename: String,
    /// Raw file bytes
    pub data: Bytes,
}

impl UploadedDocument {
    /// Create a new uploaded document
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Read a document from disk
    pub async fn from_path(path: &std::path::Path) -> crate::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(filename, data))
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// SHA-256 of the raw bytes, hex encoded
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.data);
        hex::encode(hasher.finalize())
    }
}

/// A bounded-length slice of the extracted text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in source order
    pub index: usize,
    /// Chunk text
    pub content: String,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(index: usize, content: impl Into<String>) -> Self {
        Self {
            index,
            content: content.into(),
        }
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}
