//! Document ingestion: PDF text extraction and chunking

mod chunker;
mod loader;

pub use chunker::TextChunker;
pub use loader::{DocumentLoader, RawText};

#[cfg(test)]
pub(crate) use loader::tests::pdf_with_pages;
