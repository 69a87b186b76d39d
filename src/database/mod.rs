// Database module
// Vector storage behind a provider-neutral trait

pub mod lancedb;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::RagError;
use crate::embeddings::Chunk;

pub use self::lancedb::LanceVectorStore;
pub use memory::InMemoryVectorStore;

/// Embedding record stored in the vector database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRecord {
    /// Unique identifier for this embedding
    pub id: String,
    /// The vector embedding
    pub vector: Vec<f32>,
    /// Metadata about the chunk this embedding represents
    pub metadata: ChunkMetadata,
}

/// Metadata for a chunk stored alongside its embedding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Path of the source file
    pub source: String,
    /// Page of the source file, for PDFs
    pub page: Option<u32>,
    /// Index of this chunk within its document
    pub chunk_index: u32,
    /// Character offset of the chunk within its document
    pub char_offset: u32,
    /// The actual text content of the chunk
    pub content: String,
    /// Timestamp when this embedding was created
    pub created_at: String,
}

/// Search result from vector similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk_metadata: ChunkMetadata,
    pub similarity_score: f32,
    pub distance: f32,
}

impl EmbeddingRecord {
    /// Pair a freshly embedded chunk with a new id and timestamp
    #[inline]
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            vector,
            metadata: ChunkMetadata {
                source: chunk.source.display().to_string(),
                page: chunk.page,
                chunk_index: u32::try_from(chunk.chunk_index).unwrap_or(u32::MAX),
                char_offset: u32::try_from(chunk.char_offset).unwrap_or(u32::MAX),
                content: chunk.content.clone(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }
}

/// Durable collection of embedded chunks supporting nearest-neighbour lookup.
///
/// Stores only ever grow: there is no update or delete operation.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append records to the store
    async fn add(&mut self, records: Vec<EmbeddingRecord>) -> Result<(), RagError>;

    /// The `k` records closest to `vector`, nearest first. Returns fewer only
    /// when the store holds fewer than `k` records.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>, RagError>;

    /// Number of stored records
    async fn count(&self) -> Result<u64, RagError>;
}
