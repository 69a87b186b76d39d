// Retrieval module
// Top-k similarity lookup over the vector store


use anyhow::{Context, Result};
use tracing::debug;

use crate::database::{SearchResult, VectorStore};
use crate::embeddings::Embedder;

pub const DEFAULT_TOP_K: usize = 4;

/// Embeds queries and returns the `k` nearest stored chunks
pub struct Retriever<E, S> {
    embedder: E,
    store: S,
    k: usize,
}

impl<E: Embedder, S: VectorStore> Retriever<E, S> {
    #[inline]
    pub fn new(embedder: E, store: S, k: usize) -> Self {
        Self { embedder, store, k }
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[inline]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>> {
        let vector = self
            .embedder
            .embed(query)
            .context("Failed to embed query")?;

        let results = self
            .store
            .query(&vector, self.k)
            .await
            .context("Failed to search vector store")?;

        debug!(
            "Retrieved {} chunk(s) for query ({} chars)",
            results.len(),
            query.chars().count()
        );
        Ok(results)
    }
}
