use thiserror::Error;

use crate::documents::DocumentError;

#[derive(Debug, Error)]
pub enum DocTreeError {
    #[error("folder not found: {0}")]
    FolderNotFound(String),

    #[error(transparent)]
    Store(DocumentError),
}

impl From<DocumentError> for DocTreeError {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::NotFound(path) => DocTreeError::FolderNotFound(path),
            other => DocTreeError::Store(other),
        }
    }
}
