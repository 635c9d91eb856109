mod args;
mod error;

pub use args::DocSearchArgs;
pub use error::DocSearchError;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use crate::documents::DocumentStore;
use crate::tools::{Tool, ToolResult};

pub struct DocSearch {
    store: Arc<dyn DocumentStore>,
}

impl DocSearch {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DocSearch {
    fn name(&self) -> &'static str {
        "doc_search"
    }

    fn description(&self) -> &'static str {
        "Search documents by name and content (case-insensitive). Returns the best matches first with a short preview around the first match."
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to search for"
                },
                "folder": {
                    "type": "string",
                    "description": "Only search inside this folder"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of results (default: 20)",
                    "minimum": 1,
                    "default": 20
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: JsonValue) -> ToolResult {
        let tool_args: DocSearchArgs = serde_json::from_value(args)?;
        if tool_args.query.trim().is_empty() {
            return Err(DocSearchError::EmptyQuery.into());
        }
        let limit = tool_args.limit.max(1);

        let page = self
            .store
            .search(&tool_args.query, tool_args.folder.as_deref(), limit)
            .await
            .map_err(DocSearchError::from)?;

        let results: Vec<JsonValue> = page
            .hits
            .into_iter()
            .map(|hit| {
                json!({
                    "name": hit.document.name,
                    "path": hit.document.path,
                    "score": hit.score,
                    "word_count": hit.document.word_count,
                    "updated_at": hit.document.updated_at,
                    "preview": hit.preview,
                })
            })
            .collect();

        Ok(json!({
            "results": results,
            "total_count": page.total_count,
            "has_more": page.has_more,
            "limit": limit,
        }))
    }
}
