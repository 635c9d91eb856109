//! Unified, provider-agnostic request/response/stream types

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{Context, Poll};

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

// ============================================================================
// Messages
// ============================================================================

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Typed content part of a multi-part message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    /// Model reasoning; replayed only within the tool loop that produced it
    Reasoning {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    ToolCall {
        id: String,
        name: String,
        arguments: JsonValue,
    },
    ToolResult {
        tool_call_id: String,
        content: JsonValue,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        ContentPart::Image {
            url: url.into(),
            detail: None,
        }
    }

    pub fn reasoning(text: impl Into<String>, signature: Option<String>) -> Self {
        ContentPart::Reasoning {
            text: text.into(),
            signature,
        }
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: JsonValue) -> Self {
        ContentPart::ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: JsonValue, is_error: bool) -> Self {
        ContentPart::ToolResult {
            tool_call_id: tool_call_id.into(),
            content,
            is_error,
        }
    }
}

/// Message content: plain text or typed parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn with_parts(role: Role, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            content: MessageContent::Parts(parts),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Content as parts; plain text becomes a single text part.
    pub fn parts(&self) -> Vec<ContentPart> {
        match &self.content {
            MessageContent::Text(text) => vec![ContentPart::text(text.clone())],
            MessageContent::Parts(parts) => parts.clone(),
        }
    }

    /// Concatenated text parts, `None` when the message carries no text.
    pub fn text(&self) -> Option<String> {
        match &self.content {
            MessageContent::Text(text) => Some(text.clone()),
            MessageContent::Parts(parts) => {
                let text: Vec<&str> = parts
                    .iter()
                    .filter_map(|p| match p {
                        ContentPart::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                if text.is_empty() {
                    None
                } else {
                    Some(text.join(""))
                }
            }
        }
    }

    pub fn tool_calls(&self) -> Vec<ToolCall> {
        match &self.content {
            MessageContent::Text(_) => Vec::new(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::ToolCall {
                        id,
                        name,
                        arguments,
                    } => Some(ToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        arguments: arguments.clone(),
                    }),
                    _ => None,
                })
                .collect(),
        }
    }
}

// ============================================================================
// Tools
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

/// Tool definition exposed to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: ToolFunction,
}

impl Tool {
    pub fn function(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: ToolFunction {
                name: name.into(),
                description: description.into(),
                parameters: serde_json::json!({ "type": "object", "properties": {} }),
            },
        }
    }

    pub fn parameters(mut self, schema: JsonValue) -> Self {
        self.function.parameters = schema;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    None,
    /// Model must call some tool
    Required,
    /// Model must call the named tool
    Function { name: String },
}

/// A completed tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: JsonValue,
}

// ============================================================================
// Request
// ============================================================================

/// Extended thinking effort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningLevel {
    Low,
    Medium,
    High,
}

impl ReasoningLevel {
    /// Thinking token budget for providers that take one.
    pub fn budget_tokens(&self) -> u32 {
        match self {
            ReasoningLevel::Low => 2048,
            ReasoningLevel::Medium => 8192,
            ReasoningLevel::High => 16384,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningLevel::Low => "low",
            ReasoningLevel::Medium => "medium",
            ReasoningLevel::High => "high",
        }
    }
}

impl fmt::Display for ReasoningLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasoningLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(ReasoningLevel::Low),
            "medium" => Ok(ReasoningLevel::Medium),
            "high" => Ok(ReasoningLevel::High),
            other => Err(Error::InvalidRequest(format!(
                "unknown reasoning level '{other}' (expected low, medium or high)"
            ))),
        }
    }
}

/// HTTP headers sent with a provider request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Headers {
    entries: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Overlay `other` on top of `self`.
    pub fn merge_with(&mut self, other: &Headers) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    /// Invalid header names or values are skipped.
    pub fn to_reqwest_headers(&self) -> reqwest::header::HeaderMap {
        let mut map = reqwest::header::HeaderMap::new();
        for (k, v) in &self.entries {
            if let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(k.as_bytes()),
                reqwest::header::HeaderValue::from_str(v),
            ) {
                map.insert(name, value);
            }
        }
        map
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningLevel>,
    #[serde(skip)]
    pub headers: Option<Headers>,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn add_tool(mut self, tool: Tool) -> Self {
        self.tools.get_or_insert_with(Vec::new).push(tool);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn reasoning(mut self, level: ReasoningLevel) -> Self {
        self.reasoning = Some(level);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(Headers::new).insert(key, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// System instruction kept out of `messages`; adapters place it where
    /// their wire format expects it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub options: GenerateOptions,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: None,
            options: GenerateOptions::default(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReasonKind {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    Error,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishReason {
    pub unified: FinishReasonKind,
    /// Provider's own stop reason string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl FinishReason {
    pub fn new(unified: FinishReasonKind) -> Self {
        Self { unified, raw: None }
    }

    pub fn with_raw(unified: FinishReasonKind, raw: impl Into<String>) -> Self {
        Self {
            unified,
            raw: Some(raw.into()),
        }
    }

    pub fn stop() -> Self {
        Self::new(FinishReasonKind::Stop)
    }

    pub fn other() -> Self {
        Self::new(FinishReasonKind::Other)
    }

    /// Raw reason if known, else the unified name.
    pub fn label(&self) -> String {
        self.raw.clone().unwrap_or_else(|| {
            serde_json::to_value(self.unified)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| "other".to_string())
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Field-wise max; providers report usage in several partial events.
    pub fn merge(&mut self, other: Usage) {
        self.prompt_tokens = self.prompt_tokens.max(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.max(other.completion_tokens);
        self.total_tokens = self.prompt_tokens + self.completion_tokens;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseContent {
    Text {
        text: String,
    },
    Reasoning {
        reasoning: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    ToolCall(ToolCall),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub id: String,
    pub model: String,
    pub content: Vec<ResponseContent>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl GenerateResponse {
    /// Concatenated text content.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                ResponseContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.content
            .iter()
            .filter_map(|c| match c {
                ResponseContent::ToolCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }
}

// ============================================================================
// Streaming
// ============================================================================

/// Unified stream chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Start {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    ReasoningDelta {
        id: String,
        delta: String,
    },
    /// Opaque signature closing a reasoning segment
    ReasoningSignature {
        id: String,
        signature: String,
    },
    ToolCallStart {
        id: String,
        name: String,
    },
    ToolCallDelta {
        id: String,
        delta: String,
    },
    /// Tool call with fully assembled, parsed arguments
    ToolCallEnd {
        id: String,
        name: String,
        arguments: JsonValue,
    },
    Finish {
        usage: Usage,
        reason: FinishReason,
    },
    Error {
        message: String,
    },
}

impl StreamEvent {
    pub fn start(id: impl Into<String>) -> Self {
        StreamEvent::Start { id: id.into() }
    }

    pub fn text_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        StreamEvent::TextDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    pub fn reasoning_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        StreamEvent::ReasoningDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    pub fn reasoning_signature(id: impl Into<String>, signature: impl Into<String>) -> Self {
        StreamEvent::ReasoningSignature {
            id: id.into(),
            signature: signature.into(),
        }
    }

    pub fn tool_call_start(id: impl Into<String>, name: impl Into<String>) -> Self {
        StreamEvent::ToolCallStart {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn tool_call_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        StreamEvent::ToolCallDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    pub fn tool_call_end(id: impl Into<String>, name: impl Into<String>, arguments: JsonValue) -> Self {
        StreamEvent::ToolCallEnd {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    pub fn finish(usage: Usage, reason: FinishReason) -> Self {
        StreamEvent::Finish { usage, reason }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
        }
    }
}

type BoxedEventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Stream of unified events returned by `Provider::stream`
pub struct GenerateStream {
    inner: BoxedEventStream,
}

impl GenerateStream {
    pub fn new(inner: BoxedEventStream) -> Self {
        Self { inner }
    }

    /// Stream over a fixed list of events.
    pub fn from_events(events: Vec<Result<StreamEvent>>) -> Self {
        Self::new(Box::pin(futures::stream::iter(events)))
    }
}

impl Stream for GenerateStream {
    type Item = Result<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for GenerateStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerateStream").finish_non_exhaustive()
    }
}
