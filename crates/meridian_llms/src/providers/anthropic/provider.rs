//! Anthropic provider implementation

use super::convert::{from_anthropic_response, to_anthropic_request};
use super::stream::create_stream;
use super::types::{AnthropicConfig, AnthropicResponse, ErrorEnvelope};
use crate::capabilities::CapabilityRegistry;
use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::types::{GenerateRequest, GenerateResponse, GenerateStream, Headers};
use async_trait::async_trait;
use reqwest::Client;
use reqwest_eventsource::EventSource;

/// Anthropic provider (Messages API)
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    /// Environment variable for API key
    pub const API_KEY_ENV: &'static str = "ANTHROPIC_API_KEY";

    pub fn new(config: AnthropicConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::MissingApiKey("anthropic".to_string()));
        }

        let client = Client::new();
        Ok(Self { config, client })
    }

    /// Create provider from environment
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(Self::API_KEY_ENV)
            .map_err(|_| Error::MissingApiKey("anthropic".to_string()))?;

        let mut config = AnthropicConfig::new(api_key);
        if let Ok(base_url) = std::env::var("ANTHROPIC_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        Self::new(config)
    }

    fn messages_url(&self) -> String {
        format!("{}messages", self.config.base_url)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn provider_id(&self) -> &str {
        "anthropic"
    }

    fn build_headers(&self, custom_headers: Option<&Headers>) -> Headers {
        let mut headers = Headers::new();
        headers.insert("x-api-key", self.config.api_key.clone());
        headers.insert("anthropic-version", self.config.version.clone());
        headers.insert("Content-Type", "application/json");

        if let Some(custom) = custom_headers {
            headers.merge_with(custom);
        }

        headers
    }

    fn supports_model(&self, model: &str) -> bool {
        model.starts_with("claude-")
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let registry = CapabilityRegistry::load_builtin()?;
        Ok(registry
            .list_provider_models("anthropic")?
            .iter()
            .map(|m| m.id.clone())
            .collect())
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let body = to_anthropic_request(&request, false)?;
        let headers = self.build_headers(request.options.headers.as_ref());

        let response = self
            .client
            .post(self.messages_url())
            .headers(headers.to_reqwest_headers())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&error_text)
                .map(|e| format!("{}: {}", e.error.type_, e.error.message))
                .unwrap_or(error_text);
            return Err(Error::from_status(
                status.as_u16(),
                format!("Anthropic API error: {}", message),
            ));
        }

        let resp: AnthropicResponse = response.json().await?;
        from_anthropic_response(resp)
    }

    async fn stream(&self, request: GenerateRequest) -> Result<GenerateStream> {
        let body = to_anthropic_request(&request, true)?;
        let headers = self.build_headers(request.options.headers.as_ref());

        let req_builder = self
            .client
            .post(self.messages_url())
            .headers(headers.to_reqwest_headers())
            .json(&body);

        let event_source = EventSource::new(req_builder)
            .map_err(|e| Error::stream_error(format!("Failed to create event source: {}", e)))?;

        create_stream(event_source).await
    }
}
