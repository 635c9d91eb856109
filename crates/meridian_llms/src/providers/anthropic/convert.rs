//! Conversion between unified types and Anthropic Messages API types

use super::types::{
    AnthropicContent, AnthropicMessage, AnthropicRequest, AnthropicResponse, AnthropicTool,
    ImageSource, ThinkingConfig,
};
use crate::error::Result;
use crate::types::{
    ContentPart, FinishReason, FinishReasonKind, GenerateRequest, GenerateResponse, Message,
    ResponseContent, Role, ToolCall, ToolChoice, Usage,
};
use serde_json::{Value, json};

/// `max_tokens` is mandatory on the Messages API
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Convert unified request to Anthropic request
pub fn to_anthropic_request(req: &GenerateRequest, stream: bool) -> Result<AnthropicRequest> {
    let mut system_parts: Vec<String> = req
        .system
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect();

    let mut messages: Vec<AnthropicMessage> = Vec::with_capacity(req.messages.len());
    for msg in &req.messages {
        if msg.role == Role::System {
            if let Some(text) = msg.text() {
                system_parts.push(text);
            }
            continue;
        }
        let role = match msg.role {
            Role::Assistant => "assistant",
            _ => "user",
        };
        let content = to_anthropic_content(msg);
        if content.is_empty() {
            continue;
        }
        // Consecutive same-role turns must be merged; tool results for one
        // assistant turn travel together in a single user message.
        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(content),
            _ => messages.push(AnthropicMessage {
                role: role.to_string(),
                content,
            }),
        }
    }

    let tools: Option<Vec<AnthropicTool>> = req
        .options
        .tools
        .as_ref()
        .filter(|t| !t.is_empty())
        .map(|tools| {
            tools
                .iter()
                .map(|tool| AnthropicTool {
                    name: tool.function.name.clone(),
                    description: tool.function.description.clone(),
                    input_schema: tool.function.parameters.clone(),
                })
                .collect()
        });

    let tool_choice = tools.as_ref().and(req.options.tool_choice.as_ref()).map(|choice| match choice {
        ToolChoice::Auto => json!({"type": "auto"}),
        ToolChoice::None => json!({"type": "none"}),
        ToolChoice::Required => json!({"type": "any"}),
        ToolChoice::Function { name } => json!({"type": "tool", "name": name}),
    });

    let mut max_tokens = req.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
    let thinking = req.options.reasoning.map(|level| {
        let budget = level.budget_tokens();
        if max_tokens <= budget {
            max_tokens = budget + DEFAULT_MAX_TOKENS;
        }
        ThinkingConfig::enabled(budget)
    });

    // Sampling overrides are rejected while extended thinking is on
    let (temperature, top_p) = if thinking.is_some() {
        (None, None)
    } else {
        (req.options.temperature, req.options.top_p)
    };

    Ok(AnthropicRequest {
        model: req.model.clone(),
        messages,
        system: if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        },
        max_tokens,
        temperature,
        top_p,
        stop_sequences: req.options.stop_sequences.clone(),
        stream: stream.then_some(true),
        tools,
        tool_choice,
        thinking,
    })
}

fn to_anthropic_content(msg: &Message) -> Vec<AnthropicContent> {
    msg.parts()
        .into_iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } if text.is_empty() => None,
            ContentPart::Text { text } => Some(AnthropicContent::Text { text }),
            ContentPart::Image { url, .. } => Some(AnthropicContent::Image {
                source: image_source(url),
            }),
            // Unsigned thinking cannot be replayed
            ContentPart::Reasoning { text, signature } => {
                signature.map(|signature| AnthropicContent::Thinking {
                    thinking: text,
                    signature,
                })
            }
            ContentPart::ToolCall {
                id,
                name,
                arguments,
            } => Some(AnthropicContent::ToolUse {
                id,
                name,
                input: arguments,
            }),
            ContentPart::ToolResult {
                tool_call_id,
                content,
                is_error,
            } => Some(AnthropicContent::ToolResult {
                tool_use_id: tool_call_id,
                content: match content {
                    Value::String(s) => s,
                    other => other.to_string(),
                },
                is_error,
            }),
        })
        .collect()
}

fn image_source(url: String) -> ImageSource {
    match url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
    {
        Some((media_type, data)) => ImageSource::Base64 {
            media_type: media_type.to_string(),
            data: data.to_string(),
        },
        None => ImageSource::Url { url },
    }
}

/// Convert Anthropic response to unified response
pub fn from_anthropic_response(resp: AnthropicResponse) -> Result<GenerateResponse> {
    let content = resp
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicContent::Text { text } => Some(ResponseContent::Text { text }),
            AnthropicContent::Thinking {
                thinking,
                signature,
            } => Some(ResponseContent::Reasoning {
                reasoning: thinking,
                signature: (!signature.is_empty()).then_some(signature),
            }),
            AnthropicContent::ToolUse { id, name, input } => {
                Some(ResponseContent::ToolCall(ToolCall {
                    id,
                    name,
                    arguments: input,
                }))
            }
            _ => None,
        })
        .collect();

    Ok(GenerateResponse {
        id: resp.id,
        model: resp.model,
        content,
        finish_reason: parse_stop_reason(resp.stop_reason.as_deref()),
        usage: Usage::new(resp.usage.input_tokens, resp.usage.output_tokens),
    })
}

pub fn parse_stop_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some(raw @ ("end_turn" | "stop_sequence")) => FinishReason::with_raw(FinishReasonKind::Stop, raw),
        Some(raw @ "tool_use") => FinishReason::with_raw(FinishReasonKind::ToolCalls, raw),
        Some(raw @ "max_tokens") => FinishReason::with_raw(FinishReasonKind::Length, raw),
        Some(raw @ "refusal") => FinishReason::with_raw(FinishReasonKind::ContentFilter, raw),
        Some(raw) => FinishReason::with_raw(FinishReasonKind::Other, raw),
        None => FinishReason::other(),
    }
}
