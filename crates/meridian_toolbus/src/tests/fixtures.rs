use std::sync::Arc;

use tempfile::TempDir;

use crate::documents::{DocumentStore, FsDocumentStore};

pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().unwrap()
}

/// A small novel workspace:
///
/// ```text
/// /outline
/// /drafts/chapter-1
/// /drafts/chapter-2
/// /drafts/act-2/chapter-3
/// /notes/characters
/// ```
pub fn workspace() -> (TempDir, Arc<dyn DocumentStore>) {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("drafts/act-2")).unwrap();
    std::fs::create_dir_all(root.join("notes")).unwrap();
    std::fs::write(root.join("outline"), "Three acts. Aria leaves the harbor.").unwrap();
    std::fs::write(
        root.join("drafts/chapter-1"),
        "The harbor was quiet.\nAria counted the boats.\nNobody came.\n",
    )
    .unwrap();
    std::fs::write(root.join("drafts/chapter-2"), "Rain. Aria waited, and Aria listened.").unwrap();
    std::fs::write(root.join("drafts/act-2/chapter-3"), "The storm arrived.").unwrap();
    std::fs::write(root.join("notes/characters"), "Aria: a lighthouse keeper.").unwrap();

    let store: Arc<dyn DocumentStore> = Arc::new(FsDocumentStore::new(root));
    (dir, store)
}
