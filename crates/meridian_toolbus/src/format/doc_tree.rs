use serde_json::Value as JsonValue;

use super::ResultFormatter;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// One line of the rendered tree. `depth` starts at 1 for root children.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub name: String,
    pub is_folder: bool,
    pub depth: usize,
    pub is_last: bool,
    pub metadata: Option<String>,
}

/// Annotation rendered after a document name.
pub trait NodeMetadataRenderer: Send + Sync {
    fn render(&self, document: &JsonValue) -> Option<String>;
}

pub struct WordCountRenderer;

impl NodeMetadataRenderer for WordCountRenderer {
    fn render(&self, document: &JsonValue) -> Option<String> {
        match document.get("word_count").and_then(JsonValue::as_u64) {
            Some(0) | None => None,
            Some(words) => Some(format!("({words} words)")),
        }
    }
}

pub struct TreeRenderer {
    metadata: Box<dyn NodeMetadataRenderer>,
}

impl TreeRenderer {
    pub fn new(metadata: impl NodeMetadataRenderer + 'static) -> Self {
        Self {
            metadata: Box::new(metadata),
        }
    }

    /// Folders first, then documents, depth-first.
    pub fn flatten(&self, folder: &JsonValue) -> Vec<TreeNode> {
        let mut nodes = Vec::new();
        self.collect(folder, 1, &mut nodes);
        nodes
    }

    fn collect(&self, folder: &JsonValue, depth: usize, nodes: &mut Vec<TreeNode>) {
        let empty = Vec::new();
        let folders = folder
            .get("folders")
            .and_then(JsonValue::as_array)
            .unwrap_or(&empty);
        let documents = folder
            .get("documents")
            .and_then(JsonValue::as_array)
            .unwrap_or(&empty);
        let total = folders.len() + documents.len();

        for (i, child) in folders.iter().enumerate() {
            nodes.push(TreeNode {
                name: node_name(child),
                is_folder: true,
                depth,
                is_last: i + 1 == total,
                metadata: None,
            });
            self.collect(child, depth + 1, nodes);
        }
        for (i, doc) in documents.iter().enumerate() {
            nodes.push(TreeNode {
                name: node_name(doc),
                is_folder: false,
                depth,
                is_last: folders.len() + i + 1 == total,
                metadata: self.metadata.render(doc),
            });
        }
    }

    pub fn render(&self, root_label: &str, nodes: &[TreeNode]) -> String {
        let mut lines = vec![root_label.to_string()];
        // continuation[d] is true while the ancestor at depth d+1 has siblings below it
        let mut continuation: Vec<bool> = Vec::new();

        for node in nodes {
            continuation.truncate(node.depth.saturating_sub(1));
            let mut line: String = continuation
                .iter()
                .map(|open| if *open { PIPE } else { SPACE })
                .collect();
            line.push_str(if node.is_last { LAST_BRANCH } else { BRANCH });
            line.push_str(&node.name);
            if node.is_folder {
                line.push('/');
            }
            if let Some(meta) = &node.metadata {
                line.push(' ');
                line.push_str(meta);
            }
            lines.push(line);
            continuation.push(!node.is_last);
        }
        lines.join("\n")
    }
}

fn node_name(value: &JsonValue) -> String {
    value
        .get("name")
        .and_then(JsonValue::as_str)
        .unwrap_or("?")
        .to_string()
}

/// Renders `doc_tree` output as an ASCII tree string.
pub struct DocTreeFormatter {
    renderer: TreeRenderer,
}

impl Default for DocTreeFormatter {
    fn default() -> Self {
        Self {
            renderer: TreeRenderer::new(WordCountRenderer),
        }
    }
}

impl ResultFormatter for DocTreeFormatter {
    fn format(&self, raw: &JsonValue) -> JsonValue {
        if raw.get("type").and_then(JsonValue::as_str) != Some("tree") {
            return raw.clone();
        }
        let root_label = match raw.get("path").and_then(JsonValue::as_str) {
            None | Some("/") => "/ (root)".to_string(),
            Some(path) => path.to_string(),
        };
        let nodes = self.renderer.flatten(raw);
        JsonValue::String(self.renderer.render(&root_label, &nodes))
    }
}
