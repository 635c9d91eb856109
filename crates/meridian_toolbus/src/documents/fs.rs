//! Filesystem-backed document workspace: folders are directories, every
//! regular file is a document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;

use super::{
    Document, DocumentError, DocumentResult, DocumentStore, DocumentSummary, FolderEntry,
    FolderListing, FolderTree, SearchHit, SearchPage, normalize_path, word_count,
};

const PREVIEW_CHARS: usize = 200;
/// Characters of context kept before the first match in a preview
const PREVIEW_LEAD: usize = 40;

pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a virtual path onto the root; `..` segments are rejected.
    fn resolve(&self, path: &str) -> DocumentResult<PathBuf> {
        let normalized = normalize_path(path);
        let mut full = self.root.clone();
        for segment in normalized.split('/').filter(|s| !s.is_empty()) {
            if segment == ".." {
                return Err(DocumentError::PathEscape(path.to_string()));
            }
            full.push(segment);
        }
        Ok(full)
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

fn modified_at(metadata: &std::fs::Metadata) -> Option<DateTime<Utc>> {
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

fn summarize(fs_path: &Path, virtual_path: String, name: String) -> DocumentResult<DocumentSummary> {
    let metadata = std::fs::metadata(fs_path)?;
    let words = std::fs::read_to_string(fs_path)
        .map(|content| word_count(&content))
        .unwrap_or(0);
    Ok(DocumentSummary {
        name,
        path: virtual_path,
        word_count: words,
        updated_at: modified_at(&metadata),
    })
}

/// Directory children split into (folders, documents), each sorted by name.
fn read_children(dir: &Path) -> DocumentResult<(Vec<(String, PathBuf)>, Vec<(String, PathBuf)>)> {
    let mut folders = Vec::new();
    let mut documents = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            folders.push((name, entry.path()));
        } else if file_type.is_file() {
            documents.push((name, entry.path()));
        }
    }
    folders.sort_by(|a, b| a.0.cmp(&b.0));
    documents.sort_by(|a, b| a.0.cmp(&b.0));
    Ok((folders, documents))
}

fn list_folder_blocking(dir: &Path, virtual_path: &str) -> DocumentResult<FolderListing> {
    let (folders, documents) = read_children(dir)?;
    let folders = folders
        .into_iter()
        .map(|(name, _)| FolderEntry {
            path: child_path(virtual_path, &name),
            name,
        })
        .collect();
    let documents = documents
        .into_iter()
        .map(|(name, fs_path)| summarize(&fs_path, child_path(virtual_path, &name), name))
        .collect::<DocumentResult<Vec<_>>>()?;
    Ok(FolderListing {
        path: virtual_path.to_string(),
        folders,
        documents,
    })
}

fn build_tree(dir: &Path, virtual_path: &str, name: String, depth: usize) -> DocumentResult<FolderTree> {
    let mut tree = FolderTree {
        name,
        path: virtual_path.to_string(),
        folders: Vec::new(),
        documents: Vec::new(),
    };
    if depth == 0 {
        return Ok(tree);
    }
    let (folders, documents) = read_children(dir)?;
    for (child_name, fs_path) in folders {
        let child = child_path(virtual_path, &child_name);
        tree.folders
            .push(build_tree(&fs_path, &child, child_name, depth - 1)?);
    }
    for (child_name, fs_path) in documents {
        let child = child_path(virtual_path, &child_name);
        tree.documents.push(summarize(&fs_path, child, child_name)?);
    }
    Ok(tree)
}

/// Up to `PREVIEW_CHARS` characters around the first match of `needle`.
fn preview(content: &str, needle: &str) -> String {
    // Lowercasing can change the char count (`İ`), so positions are taken
    // on the original text.
    let start = content
        .char_indices()
        .position(|(byte, _)| starts_with_folded(&content[byte..], needle))
        .map(|at| at.saturating_sub(PREVIEW_LEAD))
        .unwrap_or(0);
    let total = content.chars().count();
    let snippet: String = content.chars().skip(start).take(PREVIEW_CHARS).collect();

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(&snippet);
    if start + PREVIEW_CHARS < total {
        out.push_str("...");
    }
    out
}

fn starts_with_folded(text: &str, needle: &str) -> bool {
    let mut folded = text.chars().flat_map(char::to_lowercase);
    needle.chars().all(|expected| folded.next() == Some(expected))
}

fn search_blocking(
    dir: &Path,
    virtual_path: &str,
    needle: &str,
    hits: &mut Vec<SearchHit>,
) -> DocumentResult<()> {
    let (folders, documents) = read_children(dir)?;
    for (name, fs_path) in documents {
        // Binary files are not documents for search purposes
        let Ok(content) = std::fs::read_to_string(&fs_path) else {
            continue;
        };
        let name_hit = name.to_lowercase().contains(needle);
        let occurrences = content.to_lowercase().matches(needle).count();
        if !name_hit && occurrences == 0 {
            continue;
        }
        let metadata = std::fs::metadata(&fs_path)?;
        hits.push(SearchHit {
            score: if name_hit { 2.0 } else { 0.0 } + occurrences as f64,
            preview: preview(&content, needle),
            document: DocumentSummary {
                path: child_path(virtual_path, &name),
                name,
                word_count: word_count(&content),
                updated_at: modified_at(&metadata),
            },
        });
    }
    for (name, fs_path) in folders {
        search_blocking(&fs_path, &child_path(virtual_path, &name), needle, hits)?;
    }
    Ok(())
}

async fn is_dir(path: &Path) -> DocumentResult<bool> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_dir()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn run_blocking<T, F>(f: F) -> DocumentResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> DocumentResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DocumentError::Io(std::io::Error::other(e)))?
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn get_document(&self, path: &str) -> DocumentResult<Option<Document>> {
        let virtual_path = normalize_path(path);
        if virtual_path == "/" {
            return Ok(None);
        }
        let full = self.resolve(path)?;
        let metadata = match fs::metadata(&full).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let bytes = fs::read(&full).await?;
        let content =
            String::from_utf8(bytes).map_err(|_| DocumentError::NotUtf8(virtual_path.clone()))?;
        let (_, name) = super::split_path(&virtual_path);
        Ok(Some(Document {
            name,
            word_count: word_count(&content),
            path: virtual_path,
            content,
            updated_at: modified_at(&metadata),
        }))
    }

    async fn list_folder(&self, path: &str) -> DocumentResult<Option<FolderListing>> {
        let full = self.resolve(path)?;
        if !is_dir(&full).await? {
            return Ok(None);
        }
        let virtual_path = normalize_path(path);
        run_blocking(move || list_folder_blocking(&full, &virtual_path))
            .await
            .map(Some)
    }

    async fn tree(&self, path: &str, depth: usize) -> DocumentResult<FolderTree> {
        let full = self.resolve(path)?;
        let virtual_path = normalize_path(path);
        if !is_dir(&full).await? {
            return Err(DocumentError::NotFound(virtual_path));
        }
        let (_, name) = super::split_path(&virtual_path);
        run_blocking(move || build_tree(&full, &virtual_path, name, depth)).await
    }

    async fn search(
        &self,
        query: &str,
        folder: Option<&str>,
        limit: usize,
    ) -> DocumentResult<SearchPage> {
        let folder = folder.unwrap_or("/");
        let full = self.resolve(folder)?;
        let virtual_path = normalize_path(folder);
        if !is_dir(&full).await? {
            return Err(DocumentError::NotFound(virtual_path));
        }
        let needle = query.trim().to_lowercase();

        let mut hits = run_blocking(move || {
            let mut hits = Vec::new();
            search_blocking(&full, &virtual_path, &needle, &mut hits)?;
            Ok(hits)
        })
        .await?;

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.document.path.cmp(&b.document.path))
        });
        let total_count = hits.len();
        hits.truncate(limit);
        Ok(SearchPage {
            has_more: total_count > hits.len(),
            total_count,
            hits,
        })
    }

    async fn write_document(&self, path: &str, content: &str) -> DocumentResult<()> {
        let full = self.resolve(path)?;
        match fs::metadata(&full).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(DocumentError::NotFound(normalize_path(path))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DocumentError::NotFound(normalize_path(path)));
            }
            Err(e) => return Err(e.into()),
        }
        fs::write(&full, content).await?;
        Ok(())
    }

    async fn create_document(&self, path: &str, content: &str) -> DocumentResult<()> {
        if normalize_path(path) == "/" {
            return Err(DocumentError::AlreadyExists("/".to_string()));
        }
        let full = self.resolve(path)?;
        if fs::try_exists(&full).await? {
            return Err(DocumentError::AlreadyExists(normalize_path(path)));
        }
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, content).await?;
        Ok(())
    }
}
