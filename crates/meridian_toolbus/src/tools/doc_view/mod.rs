mod args;
mod error;

pub use args::DocViewArgs;
pub use error::DocViewError;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use crate::documents::{normalize_path, Document, DocumentStore, FolderListing};
use crate::tools::{Tool, ToolResult};

/// Documents longer than this are cut before being handed to the model.
pub const MAX_CONTENT_CHARS: usize = 20_000;
const TRUNCATION_NOTICE: &str = "\n\n[Content truncated - too large to display fully]";

pub struct DocView {
    store: Arc<dyn DocumentStore>,
}

impl DocView {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

fn truncate_content(content: &str) -> (String, bool) {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((cut, _)) => (format!("{}{}", &content[..cut], TRUNCATION_NOTICE), true),
        None => (content.to_string(), false),
    }
}

fn document_json(doc: Document) -> JsonValue {
    let (content, was_truncated) = truncate_content(&doc.content);
    json!({
        "type": "document",
        "name": doc.name,
        "path": doc.path,
        "content": content,
        "word_count": doc.word_count,
        "updated_at": doc.updated_at,
        "was_truncated": was_truncated,
    })
}

fn folder_json(listing: FolderListing) -> JsonValue {
    json!({
        "type": "folder",
        "path": listing.path,
        "documents": listing.documents,
        "folders": listing.folders,
    })
}

#[async_trait]
impl Tool for DocView {
    fn name(&self) -> &'static str {
        "doc_view"
    }

    fn description(&self) -> &'static str {
        "View a document's content or list a folder. Pass a document path to read it, a folder path to see its documents and subfolders, or '/' for the workspace root."
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the document or folder, e.g. '/drafts/chapter-1'"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: JsonValue) -> ToolResult {
        let tool_args: DocViewArgs = serde_json::from_value(args)?;
        let path = normalize_path(&tool_args.path);

        if path != "/" {
            if let Some(doc) = self.store.get_document(&path).await.map_err(DocViewError::from)? {
                return Ok(document_json(doc));
            }
        }

        match self.store.list_folder(&path).await.map_err(DocViewError::from)? {
            Some(listing) => Ok(folder_json(listing)),
            None => Err(DocViewError::NotFound(tool_args.path).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_content_short() {
        let (content, truncated) = truncate_content("short text");
        assert_eq!(content, "short text");
        assert!(!truncated);
    }

    #[test]
    fn test_truncate_content_multibyte_boundary() {
        let long = "é".repeat(MAX_CONTENT_CHARS + 10);
        let (content, truncated) = truncate_content(&long);
        assert!(truncated);
        assert!(content.ends_with(TRUNCATION_NOTICE));
        assert_eq!(
            content.chars().count(),
            MAX_CONTENT_CHARS + TRUNCATION_NOTICE.chars().count()
        );
    }
}
