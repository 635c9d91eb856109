use thiserror::Error;

use crate::documents::DocumentError;

#[derive(Debug, Error)]
pub enum DocSearchError {
    #[error("Search query cannot be empty")]
    EmptyQuery,

    #[error("folder not found: {0}")]
    FolderNotFound(String),

    #[error(transparent)]
    Store(DocumentError),
}

impl From<DocumentError> for DocSearchError {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::NotFound(path) => DocSearchError::FolderNotFound(path),
            other => DocSearchError::Store(other),
        }
    }
}
