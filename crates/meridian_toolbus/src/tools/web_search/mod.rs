mod args;
mod client;
mod error;

pub use args::{SearchTopic, WebSearchArgs, MAX_RESULTS};
pub use client::{TavilyClient, WebResult, DEFAULT_BASE_URL, ENV_API_KEY};
pub use error::WebSearchError;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use crate::tools::{Tool, ToolResult};

pub struct WebSearch {
    client: TavilyClient,
}

impl WebSearch {
    pub fn new(client: TavilyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn description(&self) -> &'static str {
        "Search the web for current information. Returns titles, URLs and snippets of the most relevant pages."
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Number of results (default: 5, capped at 20)",
                    "default": 5
                },
                "topic": {
                    "type": "string",
                    "enum": ["general", "news", "finance"],
                    "description": "Search category (default: general)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: JsonValue) -> ToolResult {
        let tool_args: WebSearchArgs = serde_json::from_value(args)?;
        if tool_args.query.trim().is_empty() {
            return Err(WebSearchError::EmptyQuery.into());
        }
        let max_results = tool_args.effective_max_results();

        let results = self
            .client
            .search(
                &tool_args.query,
                max_results,
                tool_args.topic.unwrap_or_default(),
            )
            .await?;

        Ok(json!({
            "result_count": results.len(),
            "results": results,
            "query": tool_args.query,
        }))
    }
}
