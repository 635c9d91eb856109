//! OpenRouter provider implementation

use super::convert::{from_openrouter_response, to_openrouter_request};
use super::stream::create_stream;
use super::types::{OpenRouterConfig, OpenRouterResponse};
use crate::capabilities::CapabilityRegistry;
use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::types::{GenerateRequest, GenerateResponse, GenerateStream, Headers};
use async_trait::async_trait;
use reqwest::Client;
use reqwest_eventsource::EventSource;

/// OpenRouter provider
pub struct OpenRouterProvider {
    config: OpenRouterConfig,
    client: Client,
}

impl OpenRouterProvider {
    /// Environment variable for API key
    pub const API_KEY_ENV: &'static str = "OPENROUTER_API_KEY";

    /// Create a new OpenRouter provider
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::MissingApiKey("openrouter".to_string()));
        }

        let client = Client::new();
        Ok(Self { config, client })
    }

    /// Create provider from environment
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(Self::API_KEY_ENV)
            .map_err(|_| Error::MissingApiKey("openrouter".to_string()))?;

        let mut config = OpenRouterConfig::new(api_key);
        if let Ok(base_url) = std::env::var("OPENROUTER_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        Self::new(config)
    }

    fn completions_url(&self) -> String {
        format!("{}chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    fn provider_id(&self) -> &str {
        "openrouter"
    }

    fn build_headers(&self, custom_headers: Option<&Headers>) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Authorization", format!("Bearer {}", self.config.api_key));
        headers.insert("Content-Type", "application/json");
        if let Some(referer) = &self.config.referer {
            headers.insert("HTTP-Referer", referer.clone());
        }
        if let Some(title) = &self.config.title {
            headers.insert("X-Title", title.clone());
        }

        if let Some(custom) = custom_headers {
            headers.merge_with(custom);
        }

        headers
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let registry = CapabilityRegistry::load_builtin()?;
        Ok(registry
            .list_provider_models("openrouter")?
            .iter()
            .map(|m| m.id.clone())
            .collect())
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let body = to_openrouter_request(&request, false)?;
        let headers = self.build_headers(request.options.headers.as_ref());

        let response = self
            .client
            .post(self.completions_url())
            .headers(headers.to_reqwest_headers())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::from_status(
                status.as_u16(),
                format!("OpenRouter API error: {}", error_text),
            ));
        }

        let resp: OpenRouterResponse = response.json().await?;
        from_openrouter_response(resp)
    }

    async fn stream(&self, request: GenerateRequest) -> Result<GenerateStream> {
        let body = to_openrouter_request(&request, true)?;
        let headers = self.build_headers(request.options.headers.as_ref());

        let req_builder = self
            .client
            .post(self.completions_url())
            .headers(headers.to_reqwest_headers())
            .json(&body);

        let event_source = EventSource::new(req_builder)
            .map_err(|e| Error::stream_error(format!("Failed to create event source: {}", e)))?;

        create_stream(event_source).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FinishReasonKind, Message, StreamEvent};
    use futures::StreamExt;

    fn provider(base_url: &str) -> OpenRouterProvider {
        OpenRouterProvider::new(
            OpenRouterConfig::new("test-key")
                .with_base_url(base_url)
                .with_app("https://meridian.local", "meridian"),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(matches!(
            OpenRouterProvider::new(OpenRouterConfig::new("")),
            Err(Error::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_build_headers() {
        let p = provider("http://localhost");
        let mut custom = Headers::new();
        custom.insert("X-Title", "override");
        let headers = p.build_headers(Some(&custom));
        assert_eq!(headers.get("Authorization"), Some("Bearer test-key"));
        assert_eq!(headers.get("HTTP-Referer"), Some("https://meridian.local"));
        assert_eq!(headers.get("X-Title"), Some("override"));
    }

    #[tokio::test]
    async fn test_list_models_from_capabilities() {
        let models = provider("http://localhost").list_models().await.unwrap();
        assert!(models.contains(&"openai/gpt-4o-mini".to_string()));
    }

    #[tokio::test]
    async fn test_generate_maps_status_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error":{"message":"rate limited"}}"#)
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate(GenerateRequest::new("openai/gpt-4o-mini", vec![Message::user("hi")]))
            .await
            .unwrap_err();
        mock.assert_async().await;
        assert!(err.is_retryable());
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn test_generate_text_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id":"gen-1","model":"openai/gpt-4o-mini","choices":[{"message":{"content":"Hello"},"finish_reason":"stop"}],"usage":{"prompt_tokens":3,"completion_tokens":1,"total_tokens":4}}"#,
            )
            .create_async()
            .await;

        let resp = provider(&server.url())
            .generate(GenerateRequest::new("openai/gpt-4o-mini", vec![Message::user("hi")]))
            .await
            .unwrap();
        assert_eq!(resp.text(), "Hello");
        assert_eq!(resp.usage.total_tokens, 4);
    }

    #[tokio::test]
    async fn test_stream_text_and_finish() {
        let body = concat!(
            "data: {\"id\":\"gen-1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"id\":\"gen-1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: {\"id\":\"gen-1\",\"choices\":[],\"usage\":{\"prompt_tokens\":5,\"completion_tokens\":2,\"total_tokens\":7}}\n\n",
            "data: [DONE]\n\n",
        );
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let mut stream = provider(&server.url())
            .stream(GenerateRequest::new("openai/gpt-4o-mini", vec![Message::user("hi")]))
            .await
            .unwrap();

        let mut text = String::new();
        let mut finish = None;
        while let Some(event) = stream.next().await {
            match event.unwrap() {
                StreamEvent::TextDelta { delta, .. } => text.push_str(&delta),
                StreamEvent::Finish { usage, reason } => finish = Some((usage, reason)),
                _ => {}
            }
        }
        assert_eq!(text, "Hello");
        let (usage, reason) = finish.unwrap();
        assert_eq!(usage.completion_tokens, 2);
        assert_eq!(reason.unified, FinishReasonKind::Stop);
    }

    #[tokio::test]
    async fn test_stream_error_status_surfaces_on_first_poll() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let mut stream = provider(&server.url())
            .stream(GenerateRequest::new("openai/gpt-4o-mini", vec![Message::user("hi")]))
            .await
            .unwrap();
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Provider { status: Some(503), .. }));
    }
}
