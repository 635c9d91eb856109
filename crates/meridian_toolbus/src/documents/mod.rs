//! Document workspace contract used by the document tools.
//!
//! Paths are virtual and rooted at `/` (e.g. `/drafts/chapter-1`). The
//! engine never touches document storage except through [`DocumentStore`].

mod fs;

pub use fs::FsDocumentStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Path escapes the document root: {0}")]
    PathEscape(String),

    #[error("Document is not valid UTF-8: {0}")]
    NotUtf8(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub name: String,
    pub path: String,
    pub content: String,
    pub word_count: usize,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Document metadata without content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub name: String,
    pub path: String,
    pub word_count: usize,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderEntry {
    pub name: String,
    pub path: String,
}

/// Direct children of one folder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderListing {
    pub path: String,
    pub folders: Vec<FolderEntry>,
    pub documents: Vec<DocumentSummary>,
}

/// Folder subtree, children sorted by name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderTree {
    pub name: String,
    pub path: String,
    pub folders: Vec<FolderTree>,
    pub documents: Vec<DocumentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub document: DocumentSummary,
    pub score: f64,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    pub total_count: usize,
    pub has_more: bool,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `Ok(None)` when no document exists at `path`.
    async fn get_document(&self, path: &str) -> DocumentResult<Option<Document>>;

    /// `Ok(None)` when no folder exists at `path`.
    async fn list_folder(&self, path: &str) -> DocumentResult<Option<FolderListing>>;

    /// Subtree of `path` down to `depth` folder levels.
    async fn tree(&self, path: &str, depth: usize) -> DocumentResult<FolderTree>;

    /// Case-insensitive search over names and content, best matches first.
    async fn search(
        &self,
        query: &str,
        folder: Option<&str>,
        limit: usize,
    ) -> DocumentResult<SearchPage>;

    /// Overwrite an existing document.
    async fn write_document(&self, path: &str, content: &str) -> DocumentResult<()>;

    /// Create a document, creating missing parent folders.
    async fn create_document(&self, path: &str, content: &str) -> DocumentResult<()>;
}

/// Canonical virtual path: leading `/`, no trailing `/`, `.` segments dropped.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .trim()
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    format!("/{}", segments.join("/"))
}

/// Split a virtual path into (parent folder, name).
pub fn split_path(path: &str) -> (String, String) {
    let normalized = normalize_path(path);
    match normalized.rfind('/') {
        Some(0) => ("/".to_string(), normalized[1..].to_string()),
        Some(idx) => (normalized[..idx].to_string(), normalized[idx + 1..].to_string()),
        None => ("/".to_string(), normalized),
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
