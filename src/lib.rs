use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("Loader error: {0}")]
    Loader(String),

    #[error("No .txt or .pdf files found in {}. Add notes and try again.", dir.display())]
    NoDocuments { dir: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub mod chat;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod ingest;
pub mod loader;
pub mod openai;
pub mod retrieval;
