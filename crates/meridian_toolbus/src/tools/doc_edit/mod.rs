mod args;
mod error;

pub use args::{DocEditArgs, EditCommand};
pub use error::DocEditError;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use crate::documents::{normalize_path, DocumentError, DocumentStore};
use crate::tools::{Tool, ToolResult};

pub struct DocEdit {
    store: Arc<dyn DocumentStore>,
}

impl DocEdit {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

fn replace_once(path: &str, content: &str, old: &str, new: &str) -> Result<String, DocEditError> {
    match content.matches(old).count() {
        0 => Err(DocEditError::NoMatch(path.to_string())),
        1 => Ok(content.replacen(old, new, 1)),
        count => Err(DocEditError::AmbiguousMatch {
            path: path.to_string(),
            count,
        }),
    }
}

fn insert_at_line(content: &str, line: usize, text: &str) -> Result<String, DocEditError> {
    let mut lines: Vec<&str> = content.lines().collect();
    if line > lines.len() {
        return Err(DocEditError::InvalidLine {
            line,
            lines: lines.len(),
        });
    }
    lines.insert(line, text);
    let mut out = lines.join("\n");
    if content.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

fn append_text(content: &str, text: &str) -> String {
    let mut out = content.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(text);
    out
}

fn require<'a>(
    value: &'a Option<String>,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, DocEditError> {
    value
        .as_deref()
        .ok_or(DocEditError::MissingArgument { command, argument })
}

impl DocEdit {
    async fn load(&self, path: &str) -> anyhow::Result<Result<String, DocEditError>> {
        Ok(match self.store.get_document(path).await? {
            Some(doc) => Ok(doc.content),
            None => Err(DocEditError::DocNotFound(path.to_string())),
        })
    }

    async fn apply(&self, args: &DocEditArgs, path: &str) -> anyhow::Result<Result<String, DocEditError>> {
        let updated = match args.command {
            EditCommand::Create => {
                let text = args.file_text.as_deref().unwrap_or_default();
                return Ok(match self.store.create_document(path, text).await {
                    Ok(()) => Ok(format!("Created {path}")),
                    Err(DocumentError::AlreadyExists(_)) => {
                        Err(DocEditError::AlreadyExists(path.to_string()))
                    }
                    Err(e) => return Err(e.into()),
                });
            }
            EditCommand::StrReplace => {
                let old = match require(&args.old_str, "str_replace", "old_str") {
                    Ok(old) => old,
                    Err(e) => return Ok(Err(e)),
                };
                let new = args.new_str.as_deref().unwrap_or_default();
                self.load(path)
                    .await?
                    .and_then(|content| replace_once(path, &content, old, new))
            }
            EditCommand::Insert => {
                let text = match require(&args.new_str, "insert", "new_str") {
                    Ok(text) => text,
                    Err(e) => return Ok(Err(e)),
                };
                let line = args.insert_line.unwrap_or(0);
                self.load(path)
                    .await?
                    .and_then(|content| insert_at_line(&content, line, text))
            }
            EditCommand::Append => {
                let text = match require(&args.new_str, "append", "new_str") {
                    Ok(text) => text,
                    Err(e) => return Ok(Err(e)),
                };
                self.load(path)
                    .await?
                    .map(|content| append_text(&content, text))
            }
        };

        match updated {
            Ok(content) => {
                self.store.write_document(path, &content).await?;
                Ok(Ok(format!("Updated {path}")))
            }
            Err(e) => Ok(Err(e)),
        }
    }
}

#[async_trait]
impl Tool for DocEdit {
    fn name(&self) -> &'static str {
        "doc_edit"
    }

    fn description(&self) -> &'static str {
        "Edit documents. Commands: 'str_replace' replaces old_str (must match exactly once) with new_str; 'insert' inserts new_str after line insert_line (0 inserts at the top); 'append' adds new_str at the end; 'create' creates a new document with file_text."
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "enum": ["str_replace", "insert", "append", "create"],
                    "description": "Edit operation to perform"
                },
                "path": {
                    "type": "string",
                    "description": "Path of the document to edit"
                },
                "old_str": {
                    "type": "string",
                    "description": "Text to replace (str_replace only); must match exactly once"
                },
                "new_str": {
                    "type": "string",
                    "description": "Replacement or inserted text (str_replace, insert, append)"
                },
                "insert_line": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Line after which new_str is inserted (insert only)"
                },
                "file_text": {
                    "type": "string",
                    "description": "Content of the new document (create only)"
                }
            },
            "required": ["command", "path"]
        })
    }

    async fn execute(&self, args: JsonValue) -> ToolResult {
        let tool_args: DocEditArgs = serde_json::from_value(args)?;
        let path = normalize_path(&tool_args.path);

        match self.apply(&tool_args, &path).await? {
            Ok(message) => Ok(json!({
                "success": true,
                "path": path,
                "message": message,
            })),
            Err(e) => {
                tracing::debug!(tool.name = "doc_edit", code = e.code(), "edit rejected: {}", e);
                Ok(json!({
                    "success": false,
                    "error_code": e.code(),
                    "message": e.to_string(),
                }))
            }
        }
    }
}
