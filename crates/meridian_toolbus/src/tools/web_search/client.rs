use serde::{Deserialize, Serialize};

use super::args::SearchTopic;
use super::error::WebSearchError;

pub const DEFAULT_BASE_URL: &str = "https://api.tavily.com/search";
pub const ENV_API_KEY: &str = "TAVILY_API_KEY";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    topic: SearchTopic,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    published_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Thin client for the Tavily search API.
#[derive(Clone)]
pub struct TavilyClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Result<Self, WebSearchError> {
        std::env::var(ENV_API_KEY)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(Self::new)
            .ok_or(WebSearchError::MissingApiKey)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        topic: SearchTopic,
    ) -> Result<Vec<WebResult>, WebSearchError> {
        let body = SearchRequest {
            api_key: &self.api_key,
            query,
            max_results,
            topic,
        };
        let response = self
            .client
            .post(&self.base_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WebSearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| WebSearchError::RequestFailed(e.to_string()))?;
        if !status.is_success() {
            return Err(WebSearchError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: SearchResponse = serde_json::from_str(&text)
            .map_err(|e| WebSearchError::InvalidResponse(e.to_string()))?;
        Ok(parsed
            .results
            .into_iter()
            .map(|r| WebResult {
                title: r.title,
                url: r.url,
                snippet: r.content,
                published_at: r.published_date,
                score: r.score,
            })
            .collect())
    }
}
