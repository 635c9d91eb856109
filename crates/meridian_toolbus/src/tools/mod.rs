pub mod doc_edit;
pub mod doc_search;
pub mod doc_tree;
pub mod doc_view;
pub mod web_search;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

pub use doc_edit::{DocEdit, DocEditArgs, DocEditError, EditCommand};
pub use doc_search::{DocSearch, DocSearchArgs, DocSearchError};
pub use doc_tree::{DocTree, DocTreeArgs, DocTreeError};
pub use doc_view::{DocView, DocViewArgs, DocViewError};
pub use web_search::{SearchTopic, TavilyClient, WebResult, WebSearch, WebSearchArgs, WebSearchError};

pub type ToolResult = anyhow::Result<JsonValue>;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn parameters_schema(&self) -> JsonValue;
    async fn execute(&self, args: JsonValue) -> ToolResult;
}
