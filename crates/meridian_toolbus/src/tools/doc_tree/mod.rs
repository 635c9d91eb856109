mod args;
mod error;

pub use args::{DocTreeArgs, MAX_DEPTH};
pub use error::DocTreeError;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use crate::documents::{normalize_path, DocumentStore, FolderTree};
use crate::tools::{Tool, ToolResult};

pub struct DocTree {
    store: Arc<dyn DocumentStore>,
}

impl DocTree {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

fn children_json(tree: &FolderTree) -> (Vec<JsonValue>, Vec<JsonValue>) {
    let folders = tree
        .folders
        .iter()
        .map(|folder| {
            let (folders, documents) = children_json(folder);
            json!({
                "name": folder.name,
                "folders": folders,
                "documents": documents,
            })
        })
        .collect();
    let documents = tree
        .documents
        .iter()
        .map(|doc| json!({ "name": doc.name, "word_count": doc.word_count }))
        .collect();
    (folders, documents)
}

#[async_trait]
impl Tool for DocTree {
    fn name(&self) -> &'static str {
        "doc_tree"
    }

    fn description(&self) -> &'static str {
        "Show the folder and document hierarchy under a folder, with word counts. Use it to get an overview of the workspace before viewing individual documents."
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "folder": {
                    "type": "string",
                    "description": "Folder to start from (default: '/')",
                    "default": "/"
                },
                "depth": {
                    "type": "integer",
                    "description": "How many folder levels to show (default: 2, capped at 5)",
                    "default": 2
                }
            }
        })
    }

    async fn execute(&self, args: JsonValue) -> ToolResult {
        let tool_args: DocTreeArgs = serde_json::from_value(args)?;
        let depth = tool_args.effective_depth();
        let path = normalize_path(&tool_args.folder);

        let tree = self
            .store
            .tree(&path, depth)
            .await
            .map_err(DocTreeError::from)?;
        let (folders, documents) = children_json(&tree);

        Ok(json!({
            "type": "tree",
            "path": tree.path,
            "depth": depth,
            "folders": folders,
            "documents": documents,
        }))
    }
}
