//! Text chunking with newline-preferred boundaries and character fallback

use std::collections::VecDeque;

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::Chunk;

/// Text chunker with configurable size and overlap.
///
/// Splits on the first separator present in the text, greedily merges the
/// pieces into chunks of at most `chunk_size` characters, and carries up to
/// `overlap` characters of trailing pieces into the next chunk. Pieces that
/// are too large on their own are split again with the next separator; the
/// final separator is the empty string, which splits into single characters.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks in characters
    overlap: usize,
    /// Separators in order of preference
    separators: Vec<String>,
}

impl TextChunker {
    /// Create a new chunker splitting on newlines, then characters
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            separators: vec!["\n".to_string(), String::new()],
        }
    }

    /// Create a chunker from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        config.validate()?;

        let mut separators = Vec::with_capacity(2);
        if !config.separator.is_empty() {
            separators.push(config.separator.clone());
        }
        separators.push(String::new());

        Ok(Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
            separators,
        })
    }

    /// Maximum chunk size in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap in characters
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into indexed chunks in source order
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        self.split_text(text)
            .into_iter()
            .enumerate()
            .map(|(index, content)| Chunk::new(index, content))
            .collect()
    }

    /// Split text into chunk strings
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut final_chunks = Vec::new();

        // First separator found in the text wins; "" always matches
        let (separator, remaining) = match separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s.as_str()))
        {
            Some(i) => (separators[i].as_str(), &separators[i + 1..]),
            None => (
                separators.last().map(String::as_str).unwrap_or(""),
                &separators[separators.len()..],
            ),
        };

        let mut good_splits: Vec<&str> = Vec::new();

        for piece in split_on(text, separator) {
            if char_len(piece) < self.chunk_size {
                good_splits.push(piece);
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits, separator));
                good_splits.clear();
            }

            if remaining.is_empty() {
                // Unsplittable unit larger than the chunk size
                if let Some(doc) = trimmed(piece) {
                    final_chunks.push(doc);
                }
            } else {
                final_chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits, separator));
        }

        final_chunks
    }

    /// Merge small pieces into overlapping chunks
    fn merge_splits(&self, splits: &[&str], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in splits {
            let len = char_len(piece);
            let joiner = if current.is_empty() { 0 } else { separator_len };

            if total + len + joiner > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        self.chunk_size
                    );
                }

                if !current.is_empty() {
                    if let Some(doc) = join_pieces(&current, separator) {
                        docs.push(doc);
                    }

                    // Drop from the front until only the overlap remains
                    loop {
                        let joiner = if current.is_empty() { 0 } else { separator_len };
                        let no_room = total > 0 && total + len + joiner > self.chunk_size;
                        if total <= self.overlap && !no_room {
                            break;
                        }

                        let joined = if current.len() > 1 { separator_len } else { 0 };
                        let Some(first) = current.pop_front() else {
                            break;
                        };
                        total -= char_len(first) + joined;
                    }
                }
            }

            current.push_back(piece);
            total += len;
            if current.len() > 1 {
                total += separator_len;
            }
        }

        if let Some(doc) = join_pieces(&current, separator) {
            docs.push(doc);
        }

        docs
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

/// Length in characters
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split on a separator, dropping empty pieces; "" yields single characters
fn split_on<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        text.char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect()
    } else {
        text.split(separator).filter(|s| !s.is_empty()).collect()
    }
}

fn join_pieces(pieces: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = pieces.iter().copied().collect::<Vec<_>>().join(separator);
    trimmed(&joined)
}

fn trimmed(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
