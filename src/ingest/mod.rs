// Ingest module
// Builds the vector store from the notes in the data directory


use std::path::PathBuf;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::config::Config;
use crate::database::{EmbeddingRecord, LanceVectorStore, VectorStore};
use crate::embeddings::{Chunk, Embedder, TextSplitter};
use crate::loader::{discover_files, load_documents};
use crate::openai::OpenAiClient;
use crate::{RagError, Result};

/// Counters for a finished ingest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub files: usize,
    pub documents: usize,
    pub chunks: usize,
    /// Records in the store after the run, including earlier runs
    pub stored: u64,
    pub duration: Duration,
}

/// Load, split, embed and store `files`.
///
/// Chunks are embedded and added one batch at a time, so a failure part way
/// through leaves the earlier batches in the store.
#[inline]
pub async fn ingest_files<E, S>(
    files: &[PathBuf],
    splitter: &TextSplitter,
    embedder: &E,
    store: &mut S,
    batch_size: usize,
) -> Result<IngestStats>
where
    E: Embedder + ?Sized,
    S: VectorStore + ?Sized,
{
    let start = Instant::now();

    let documents = load_documents(files)?;

    let chunks = splitter.split_documents(&documents);
    println!("Split into {} chunk(s).", chunks.len());

    let bar = progress_bar(chunks.len());
    for batch in chunks.chunks(batch_size.max(1)) {
        let records = embed_chunks(embedder, batch)?;
        store.add(records).await?;
        bar.inc(batch.len() as u64);
    }
    bar.finish_and_clear();

    let stats = IngestStats {
        files: files.len(),
        documents: documents.len(),
        chunks: chunks.len(),
        stored: store.count().await?,
        duration: start.elapsed(),
    };
    info!(
        "Ingested {} chunk(s) from {} file(s) in {:?}",
        stats.chunks, stats.files, stats.duration
    );
    Ok(stats)
}

fn embed_chunks<E>(embedder: &E, chunks: &[Chunk]) -> Result<Vec<EmbeddingRecord>>
where
    E: Embedder + ?Sized,
{
    let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
    let vectors = embedder
        .embed_batch(&texts)
        .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

    if vectors.len() != chunks.len() {
        return Err(RagError::Embedding(format!(
            "Expected {} embeddings, got {}",
            chunks.len(),
            vectors.len()
        )));
    }

    Ok(chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| EmbeddingRecord::from_chunk(chunk, vector))
        .collect())
}

fn progress_bar(len: usize) -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }

    let style = ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding chunks")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(len as u64).with_style(style)
}

/// Runs the ingest pipeline for a configured base directory
pub struct Ingestor {
    config: Config,
    splitter: TextSplitter,
    client: OpenAiClient,
}

impl Ingestor {
    /// Build the embedding client from `config` and the API key in the
    /// environment
    #[inline]
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let api_key = crate::config::OpenAiConfig::api_key()?;
        let client = OpenAiClient::new(&config.openai, api_key)?;
        Self::with_client(config, client)
    }

    #[inline]
    pub fn with_client(config: Config, client: OpenAiClient) -> anyhow::Result<Self> {
        let splitter = TextSplitter::new(config.chunking.clone())?;
        Ok(Self {
            config,
            splitter,
            client,
        })
    }

    /// Ingest every supported file in the data directory.
    ///
    /// Fails with [`RagError::NoDocuments`] before the store is opened when
    /// there is nothing to ingest.
    #[inline]
    pub async fn run(&self) -> Result<IngestStats> {
        let data_dir = self.config.data_dir_path();
        let files = discover_files(&data_dir)?;
        if files.is_empty() {
            return Err(RagError::NoDocuments { dir: data_dir });
        }

        println!(
            "Loading {} file(s) from {}...",
            files.len(),
            data_dir.display()
        );

        let db_path = self.config.vector_database_path();
        let mut store = LanceVectorStore::open(&db_path).await?;

        let stats = ingest_files(
            &files,
            &self.splitter,
            &self.client,
            &mut store,
            self.config.openai.batch_size as usize,
        )
        .await?;

        println!("Persisted vector DB to {}", db_path.display());
        Ok(stats)
    }
}
