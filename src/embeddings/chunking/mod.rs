
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;
use crate::loader::Document;

/// Boundaries a chunk may end on, in order of preference
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// A piece of a document ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text
    pub content: String,
    /// File the chunk was cut from
    pub source: PathBuf,
    /// Page of the source document, for paginated sources
    pub page: Option<u32>,
    /// Offset of the first character within the document, in chars
    pub char_offset: usize,
    /// Position of this chunk within its document
    pub chunk_index: usize,
}

/// A span of text produced by [`TextSplitter::split_text`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub char_offset: usize,
}

/// Configuration for text splitting. Sizes are measured in characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length
    pub chunk_size: usize,
    /// Characters shared by adjacent chunks of the same document
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 120,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(100..=8192).contains(&self.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }

        // Every chunk cut early is still longer than half the chunk size, so
        // this keeps the window moving forward
        if self.chunk_overlap >= self.chunk_size / 2 {
            return Err(ConfigError::OverlapTooLarge(
                self.chunk_overlap,
                self.chunk_size,
            ));
        }

        Ok(())
    }
}

/// Fixed-size sliding window splitter that prefers to cut on paragraph,
/// line, then word boundaries.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: ChunkingConfig,
}

impl TextSplitter {
    #[inline]
    pub fn new(config: ChunkingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split every document, numbering chunks per document
    #[inline]
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for document in documents {
            let spans = self.split_text(&document.content);
            debug!(
                "Split {} (page {:?}) into {} chunk(s)",
                document.source.display(),
                document.page,
                spans.len()
            );

            chunks.extend(
                spans
                    .into_iter()
                    .enumerate()
                    .map(|(chunk_index, span)| Chunk {
                        content: span.text,
                        source: document.source.clone(),
                        page: document.page,
                        char_offset: span.char_offset,
                        chunk_index,
                    }),
            );
        }

        chunks
    }

    /// Split `text` into spans of at most `chunk_size` characters where each
    /// span after the first starts with the last `chunk_overlap` characters of
    /// its predecessor. Whitespace-only text yields nothing.
    #[inline]
    pub fn split_text(&self, text: &str) -> Vec<TextSpan> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut spans = Vec::new();
        let mut start = 0;

        loop {
            let window_end = (start + self.config.chunk_size).min(len);
            let end = if window_end == len {
                len
            } else {
                self.find_boundary(&chars, start, window_end)
            };

            spans.push(TextSpan {
                text: chars[start..end].iter().collect(),
                char_offset: start,
            });

            if end == len {
                break;
            }

            start = if end > start + self.config.chunk_overlap {
                end - self.config.chunk_overlap
            } else {
                end
            };
        }

        spans
    }

    /// Latest separator boundary in `(start + chunk_size / 2, window_end]`,
    /// or `window_end` when the window contains none
    fn find_boundary(&self, chars: &[char], start: usize, window_end: usize) -> usize {
        let min_end = start + self.config.chunk_size / 2 + 1;

        for separator in SEPARATORS {
            let separator: Vec<char> = separator.chars().collect();
            let found = (min_end.max(separator.len())..=window_end)
                .rev()
                .find(|&end| chars[end - separator.len()..end] == separator[..]);

            if let Some(end) = found {
                return end;
            }
        }

        window_end
    }
}
