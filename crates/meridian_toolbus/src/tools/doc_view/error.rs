use thiserror::Error;

use crate::documents::DocumentError;

#[derive(Debug, Error)]
pub enum DocViewError {
    #[error("path not found: {0} (tried as both document and folder)")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] DocumentError),
}
