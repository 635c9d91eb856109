//! Result formatters: reshape raw tool output before it is replayed to the
//! model in later turns.

mod doc_search;
mod doc_tree;
mod doc_view;

pub use doc_search::DocSearchFormatter;
pub use doc_tree::{DocTreeFormatter, NodeMetadataRenderer, TreeNode, TreeRenderer, WordCountRenderer};
pub use doc_view::DocViewFormatter;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

pub trait ResultFormatter: Send + Sync {
    fn format(&self, raw: &JsonValue) -> JsonValue;
}

/// Tool name → formatter. Tools without a formatter pass through unchanged.
#[derive(Default, Clone)]
pub struct FormatterRegistry {
    formatters: HashMap<String, Arc<dyn ResultFormatter>>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the document tool formatters.
    pub fn with_document_formatters() -> Self {
        let mut registry = Self::new();
        registry.register("doc_search", DocSearchFormatter);
        registry.register("doc_view", DocViewFormatter);
        registry.register("doc_tree", DocTreeFormatter::default());
        registry
    }

    pub fn register<F: ResultFormatter + 'static>(&mut self, tool_name: impl Into<String>, formatter: F) {
        self.formatters.insert(tool_name.into(), Arc::new(formatter));
    }

    pub fn has_formatter(&self, tool_name: &str) -> bool {
        self.formatters.contains_key(tool_name)
    }

    pub fn format(&self, tool_name: &str, raw: &JsonValue) -> JsonValue {
        match self.formatters.get(tool_name) {
            Some(formatter) => formatter.format(raw),
            None => raw.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unregistered_tool_passes_through() {
        let registry = FormatterRegistry::with_document_formatters();
        let raw = json!({"results": [1, 2, 3]});
        assert_eq!(registry.format("web_search", &raw), raw);
        assert!(!registry.has_formatter("web_search"));
        assert!(registry.has_formatter("doc_tree"));
    }
}
