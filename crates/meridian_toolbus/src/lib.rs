pub mod documents;
pub mod format;
pub mod limits;
pub mod tools;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;

pub use documents::{
    Document, DocumentError, DocumentResult, DocumentStore, DocumentSummary, FolderEntry,
    FolderListing, FolderTree, FsDocumentStore, SearchHit, SearchPage,
};
pub use format::{FormatterRegistry, ResultFormatter};
pub use limits::{StaticToolLimits, ToolLimitResolver};
pub use tools::{
    DocEdit, DocEditArgs, DocEditError, DocSearch, DocSearchArgs, DocSearchError, DocTree,
    DocTreeArgs, DocTreeError, DocView, DocViewArgs, DocViewError, EditCommand, SearchTopic,
    TavilyClient, Tool, ToolResult, WebResult, WebSearch, WebSearchArgs, WebSearchError,
};

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    validator: Option<jsonschema::Validator>,
}

/// Named tools with schema-validated dispatch.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let schema = tool.parameters_schema();
        let validator = match jsonschema::validator_for(&schema) {
            Ok(validator) => Some(validator),
            Err(e) => {
                tracing::warn!(tool.name = tool.name(), "invalid parameter schema, arguments will not be validated: {}", e);
                None
            }
        };
        self.tools.insert(
            tool.name().to_string(),
            RegisteredTool {
                tool: Arc::new(tool),
                validator,
            },
        );
    }

    pub fn contains(&self, tool_name: &str) -> bool {
        self.tools.contains_key(tool_name)
    }

    /// Validate `args` against the tool's schema, run it, and report elapsed milliseconds.
    pub async fn call(&self, tool_name: &str, args: JsonValue) -> Result<(JsonValue, u64)> {
        let entry = self
            .tools
            .get(tool_name)
            .ok_or_else(|| anyhow!("Tool not found: {}", tool_name))?;

        if let Some(validator) = &entry.validator {
            if let Err(error) = validator.validate(&args) {
                return Err(anyhow!("Invalid arguments for tool '{}': {}", tool_name, error));
            }
        }

        let start = Instant::now();
        let result = entry.tool.execute(args).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        Ok((result, duration_ms))
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        let mut tools: Vec<ToolInfo> = self
            .tools
            .values()
            .map(|entry| ToolInfo::from_tool(entry.tool.as_ref()))
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Definitions for a request's tool set; `None` selects every tool.
    /// Unknown names are skipped.
    pub fn definitions(&self, names: Option<&[String]>) -> Vec<ToolInfo> {
        match names {
            None => self.list_tools(),
            Some(names) => {
                let mut seen = std::collections::HashSet::new();
                names
                    .iter()
                    .filter(|name| seen.insert(name.as_str()))
                    .filter_map(|name| match self.tools.get(name.as_str()) {
                        Some(entry) => Some(ToolInfo::from_tool(entry.tool.as_ref())),
                        None => {
                            tracing::debug!(tool.name = %name, "requested tool is not registered");
                            None
                        }
                    })
                    .collect()
            }
        }
    }
}

#[derive(Default)]
pub struct ToolRegistryBuilder {
    registry: ToolRegistry,
}

impl ToolRegistryBuilder {
    /// `doc_view`, `doc_tree`, `doc_search` and `doc_edit` over one store.
    pub fn with_document_tools(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.registry.register(DocView::new(Arc::clone(&store)));
        self.registry.register(DocTree::new(Arc::clone(&store)));
        self.registry.register(DocSearch::new(Arc::clone(&store)));
        self.registry.register(DocEdit::new(store));
        self
    }

    pub fn with_web_search(mut self, client: TavilyClient) -> Self {
        self.registry.register(WebSearch::new(client));
        self
    }

    pub fn with_tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.registry.register(tool);
        self
    }

    pub fn build(self) -> ToolRegistry {
        self.registry
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

impl ToolInfo {
    fn from_tool(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters_schema(),
        }
    }
}
