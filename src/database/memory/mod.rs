
use async_trait::async_trait;
use tracing::debug;

use super::{EmbeddingRecord, SearchResult, VectorStore};
use crate::RagError;

/// Brute-force cosine store held entirely in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryVectorStore {
    records: Vec<EmbeddingRecord>,
}

impl InMemoryVectorStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }

    fn dimension(&self) -> Option<usize> {
        self.records.first().map(|r| r.vector.len())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&mut self, records: Vec<EmbeddingRecord>) -> Result<(), RagError> {
        let Some(dim) = self.dimension().or_else(|| records.first().map(|r| r.vector.len()))
        else {
            return Ok(());
        };

        if let Some(record) = records.iter().find(|r| r.vector.len() != dim) {
            return Err(RagError::Database(format!(
                "Vector dimension mismatch: store holds {} dimensions, record {} has {}",
                dim,
                record.id,
                record.vector.len()
            )));
        }

        debug!("Storing {} embeddings in memory", records.len());
        self.records.extend(records);
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>, RagError> {
        if let Some(dim) = self.dimension() {
            if vector.len() != dim {
                return Err(RagError::Database(format!(
                    "Query vector has {} dimensions but the store holds {}",
                    vector.len(),
                    dim
                )));
            }
        }

        let mut results: Vec<SearchResult> = self
            .records
            .iter()
            .map(|record| {
                let distance = cosine_distance(vector, &record.vector);
                SearchResult {
                    chunk_metadata: record.metadata.clone(),
                    similarity_score: 1.0 - distance,
                    distance,
                }
            })
            .collect();

        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(k);
        Ok(results)
    }

    async fn count(&self) -> Result<u64, RagError> {
        Ok(self.records.len() as u64)
    }
}

/// `1 - cos(a, b)`; zero vectors are treated as maximally distant
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - dot / (norm_a * norm_b)
}
