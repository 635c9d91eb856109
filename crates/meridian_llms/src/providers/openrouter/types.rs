//! OpenRouter-specific types (OpenAI chat-completions shape)

use serde::{Deserialize, Serialize};

/// Configuration for the OpenRouter provider
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL (default: https://openrouter.ai/api/v1/)
    pub base_url: String,
    /// Sent as `HTTP-Referer` for OpenRouter app attribution
    pub referer: Option<String>,
    /// Sent as `X-Title`
    pub title: Option<String>,
}

impl OpenRouterConfig {
    /// Create new config with API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://openrouter.ai/api/v1/".to_string(),
            referer: None,
            title: None,
        }
    }

    /// Set base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut url = base_url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.base_url = url;
        self
    }

    pub fn with_app(mut self, referer: impl Into<String>, title: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self.title = Some(title.into());
        self
    }
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct OpenRouterRequest {
    pub model: String,
    pub messages: Vec<OpenRouterMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningConfig>,
}

#[derive(Debug, Serialize)]
pub struct StreamOptions {
    pub include_usage: bool,
}

/// Unified reasoning control
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReasoningConfig {
    pub effort: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenRouterMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenRouterToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub function: OpenRouterFunction,
}

/// Function in a tool call; `arguments` is a JSON-encoded string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterFunction {
    pub name: String,
    pub arguments: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct OpenRouterResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<OpenRouterChoice>,
    #[serde(default)]
    pub usage: Option<OpenRouterUsage>,
}

#[derive(Debug, Deserialize)]
pub struct OpenRouterChoice {
    pub message: OpenRouterResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpenRouterResponseMessage {
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenRouterToolCall>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenRouterUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Streaming chunk
#[derive(Debug, Deserialize)]
pub struct OpenRouterStreamChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub choices: Vec<OpenRouterStreamChoice>,
    #[serde(default)]
    pub usage: Option<OpenRouterUsage>,
    /// Mid-stream provider error
    #[serde(default)]
    pub error: Option<OpenRouterStreamError>,
}

#[derive(Debug, Deserialize)]
pub struct OpenRouterStreamError {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenRouterStreamChoice {
    #[serde(default)]
    pub index: u32,
    pub delta: OpenRouterDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenRouterDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenRouterStreamToolCall>>,
}

/// Streaming tool call (partial)
#[derive(Debug, Clone, Deserialize)]
pub struct OpenRouterStreamToolCall {
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: OpenRouterStreamFunction,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenRouterStreamFunction {
    pub name: Option<String>,
    pub arguments: Option<String>,
}
