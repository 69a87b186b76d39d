// Document loader module
// Discovers note files and turns them into raw text documents


use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{RagError, Result};

/// A loaded document before splitting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Full text of the document
    pub content: String,
    /// File the text was read from
    pub source: PathBuf,
    /// 1-based page number for paginated sources
    pub page: Option<u32>,
}

/// Loader selected by file extension, compared case-insensitively
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Text,
    Pdf,
}

impl DocumentKind {
    fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "txt" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Whether the loader knows how to read `path`
#[inline]
pub fn is_supported(path: &Path) -> bool {
    DocumentKind::from_path(path).is_some()
}

/// List the supported files directly inside `data_dir`, sorted by path.
///
/// A missing directory yields an empty list so callers can report it the same
/// way as a directory without notes.
#[inline]
pub fn discover_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    if !data_dir.is_dir() {
        debug!("Data directory {} does not exist", data_dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(data_dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            continue;
        }
        if is_supported(&path) {
            files.push(path);
        } else {
            debug!("Skipping unsupported file {}", path.display());
        }
    }

    files.sort();
    info!(
        "Discovered {} supported file(s) in {}",
        files.len(),
        data_dir.display()
    );
    Ok(files)
}

/// Load every path into one or more documents. Fails on the first file that
/// cannot be read or parsed.
#[inline]
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for path in paths {
        match DocumentKind::from_path(path) {
            Some(DocumentKind::Text) => documents.push(load_text(path)?),
            Some(DocumentKind::Pdf) => documents.extend(load_pdf(path)?),
            None => debug!("Skipping unsupported file {}", path.display()),
        }
    }
    debug!(
        "Loaded {} document(s) from {} file(s)",
        documents.len(),
        paths.len()
    );
    Ok(documents)
}

fn load_text(path: &Path) -> Result<Document> {
    let content = fs::read_to_string(path)
        .map_err(|e| RagError::Loader(format!("Failed to read {}: {}", path.display(), e)))?;

    Ok(Document {
        content,
        source: path.to_path_buf(),
        page: None,
    })
}

fn load_pdf(path: &Path) -> Result<Vec<Document>> {
    let pages = pdf_extract::extract_text_by_pages(path)
        .map_err(|e| RagError::Loader(format!("Failed to parse PDF {}: {}", path.display(), e)))?;

    debug!("Extracted {} page(s) from {}", pages.len(), path.display());

    Ok(pages
        .into_iter()
        .zip(1..)
        .map(|(content, page)| Document {
            content,
            source: path.to_path_buf(),
            page: Some(page),
        })
        .collect())
}
