//! Conversion between unified types and OpenRouter types

use super::types::{
    OpenRouterFunction, OpenRouterMessage, OpenRouterRequest, OpenRouterResponse, OpenRouterToolCall,
    ReasoningConfig, StreamOptions,
};
use crate::error::{Error, Result};
use crate::types::{
    ContentPart, FinishReason, FinishReasonKind, GenerateRequest, GenerateResponse, Message,
    MessageContent, ResponseContent, Role, ToolCall, ToolChoice, Usage,
};
use serde_json::json;

/// Convert unified request to OpenRouter request
pub fn to_openrouter_request(req: &GenerateRequest, stream: bool) -> Result<OpenRouterRequest> {
    let mut messages = Vec::with_capacity(req.messages.len() + 1);
    if let Some(system) = req.system.as_deref().filter(|s| !s.is_empty()) {
        messages.push(OpenRouterMessage {
            role: "system".to_string(),
            content: Some(json!(system)),
            tool_calls: None,
            tool_call_id: None,
        });
    }
    for msg in &req.messages {
        messages.extend(to_openrouter_messages(msg)?);
    }

    let tools: Option<Vec<serde_json::Value>> = req.options.tools.as_ref().filter(|t| !t.is_empty()).map(|tools| {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.function.name,
                        "description": tool.function.description,
                        "parameters": tool.function.parameters,
                    }
                })
            })
            .collect()
    });

    let tool_choice = tools.as_ref().and(req.options.tool_choice.as_ref()).map(|choice| match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Function { name } => json!({
            "type": "function",
            "function": { "name": name }
        }),
    });

    let reasoning = req.options.reasoning.map(|level| ReasoningConfig {
        effort: level.as_str().to_string(),
    });

    Ok(OpenRouterRequest {
        model: req.model.clone(),
        messages,
        temperature: req.options.temperature,
        top_p: req.options.top_p,
        max_tokens: req.options.max_tokens,
        stream: stream.then_some(true),
        stream_options: stream.then_some(StreamOptions {
            include_usage: true,
        }),
        stop: req.options.stop_sequences.clone(),
        tools,
        tool_choice,
        reasoning,
    })
}

/// Convert one unified message; tool results fan out into one `tool` message each.
fn to_openrouter_messages(msg: &Message) -> Result<Vec<OpenRouterMessage>> {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    if let MessageContent::Text(text) = &msg.content {
        return Ok(vec![OpenRouterMessage {
            role: role.to_string(),
            content: Some(json!(text)),
            tool_calls: None,
            tool_call_id: None,
        }]);
    }

    let parts = msg.parts();
    let mut out = Vec::new();

    let results: Vec<&ContentPart> = parts
        .iter()
        .filter(|p| matches!(p, ContentPart::ToolResult { .. }))
        .collect();
    for part in results {
        if let ContentPart::ToolResult {
            tool_call_id,
            content,
            ..
        } = part
        {
            let content = match content {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out.push(OpenRouterMessage {
                role: "tool".to_string(),
                content: Some(json!(content)),
                tool_calls: None,
                tool_call_id: Some(tool_call_id.clone()),
            });
        }
    }

    let tool_calls: Vec<OpenRouterToolCall> = parts
        .iter()
        .filter_map(|p| match p {
            ContentPart::ToolCall {
                id,
                name,
                arguments,
            } => Some(OpenRouterToolCall {
                id: id.clone(),
                type_: "function".to_string(),
                function: OpenRouterFunction {
                    name: name.clone(),
                    arguments: arguments.to_string(),
                },
            }),
            _ => None,
        })
        .collect();

    let mut content_parts = Vec::new();
    for part in &parts {
        match part {
            ContentPart::Text { text } => content_parts.push(json!({ "type": "text", "text": text })),
            ContentPart::Image { url, detail } => {
                let mut image = json!({ "url": url });
                if let Some(detail) = detail {
                    image["detail"] = json!(detail);
                }
                content_parts.push(json!({ "type": "image_url", "image_url": image }));
            }
            // Reasoning is not replayed over the chat-completions shape.
            ContentPart::Reasoning { .. }
            | ContentPart::ToolCall { .. }
            | ContentPart::ToolResult { .. } => {}
        }
    }

    if !content_parts.is_empty() || !tool_calls.is_empty() {
        let content = match content_parts.as_slice() {
            [] => None,
            [single] if single["type"] == "text" => Some(single["text"].clone()),
            _ => Some(json!(content_parts)),
        };
        out.push(OpenRouterMessage {
            role: role.to_string(),
            content,
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            tool_call_id: None,
        });
    }

    if out.is_empty() {
        return Err(Error::InvalidRequest(format!("{role} message has no content")));
    }
    Ok(out)
}

/// Convert OpenRouter response to unified response
pub fn from_openrouter_response(resp: OpenRouterResponse) -> Result<GenerateResponse> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::invalid_response("No choices in OpenRouter response"))?;

    let mut content = Vec::new();

    if let Some(reasoning) = choice.message.reasoning.filter(|r| !r.is_empty()) {
        content.push(ResponseContent::Reasoning {
            reasoning,
            signature: None,
        });
    }

    if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
        content.push(ResponseContent::Text { text });
    }

    for tc in choice.message.tool_calls.unwrap_or_default() {
        let arguments = if tc.function.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&tc.function.arguments).map_err(|e| Error::InvalidToolArguments {
                id: tc.id.clone(),
                name: tc.function.name.clone(),
                message: e.to_string(),
            })?
        };
        content.push(ResponseContent::ToolCall(ToolCall {
            id: tc.id,
            name: tc.function.name,
            arguments,
        }));
    }

    if content.is_empty() {
        return Err(Error::invalid_response("No content in OpenRouter response"));
    }

    let usage = resp
        .usage
        .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    Ok(GenerateResponse {
        id: resp.id,
        model: resp.model,
        content,
        finish_reason: parse_finish_reason(&choice.finish_reason),
        usage,
    })
}

/// Parse OpenAI-style finish reason to unified finish reason
pub fn parse_finish_reason(reason: &Option<String>) -> FinishReason {
    match reason.as_deref() {
        Some("stop") => FinishReason::with_raw(FinishReasonKind::Stop, "stop"),
        Some("length") => FinishReason::with_raw(FinishReasonKind::Length, "length"),
        Some("tool_calls") => FinishReason::with_raw(FinishReasonKind::ToolCalls, "tool_calls"),
        Some("content_filter") => {
            FinishReason::with_raw(FinishReasonKind::ContentFilter, "content_filter")
        }
        Some("error") => FinishReason::with_raw(FinishReasonKind::Error, "error"),
        Some(raw) => FinishReason::with_raw(FinishReasonKind::Other, raw),
        None => FinishReason::other(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerateOptions, ReasoningLevel, Tool};

    #[test]
    fn test_parse_finish_reason() {
        assert_eq!(
            parse_finish_reason(&Some("stop".to_string())).unified,
            FinishReasonKind::Stop
        );
        assert_eq!(
            parse_finish_reason(&Some("length".to_string())).unified,
            FinishReasonKind::Length
        );
        assert_eq!(
            parse_finish_reason(&Some("tool_calls".to_string())).unified,
            FinishReasonKind::ToolCalls
        );
        assert_eq!(
            parse_finish_reason(&None).unified,
            FinishReasonKind::Other
        );
    }

    #[test]
    fn test_system_prompt_prepended_as_message() {
        let req = GenerateRequest::new("openai/gpt-4o-mini", vec![Message::user("What's 2+2?")])
            .with_system("You are a helpful assistant.");
        let out = to_openrouter_request(&req, true).unwrap();
        assert_eq!(out.messages.len(), 2);
        assert_eq!(out.messages[0].role, "system");
        assert_eq!(out.messages[0].content, Some(json!("You are a helpful assistant.")));
        assert_eq!(out.messages[1].role, "user");
        assert_eq!(out.stream, Some(true));
        assert!(out.stream_options.is_some());
    }

    #[test]
    fn test_tool_round_trip_messages() {
        let assistant = Message::with_parts(
            Role::Assistant,
            vec![
                ContentPart::reasoning("thinking", None),
                ContentPart::tool_call("call_1", "doc_search", json!({"query": "Aria"})),
            ],
        );
        let results = Message::with_parts(
            Role::Tool,
            vec![
                ContentPart::tool_result("call_1", json!({"results": []}), false),
                ContentPart::tool_result("call_2", json!("plain"), true),
            ],
        );
        let req = GenerateRequest::new("m", vec![assistant, results]);
        let out = to_openrouter_request(&req, false).unwrap();

        assert_eq!(out.messages.len(), 3);
        let call = &out.messages[0];
        assert_eq!(call.role, "assistant");
        assert!(call.content.is_none());
        let calls = call.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.arguments, r#"{"query":"Aria"}"#);

        assert_eq!(out.messages[1].role, "tool");
        assert_eq!(out.messages[1].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(out.messages[1].content, Some(json!(r#"{"results":[]}"#)));
        assert_eq!(out.messages[2].content, Some(json!("plain")));
    }

    #[test]
    fn test_reasoning_and_tools_mapping() {
        let options = GenerateOptions::new()
            .add_tool(Tool::function("doc_view", "View"))
            .tool_choice(ToolChoice::Auto)
            .reasoning(ReasoningLevel::High);
        let req = GenerateRequest::new("m", vec![Message::user("hi")]).with_options(options);
        let out = to_openrouter_request(&req, false).unwrap();
        assert_eq!(out.reasoning.unwrap().effort, "high");
        assert_eq!(out.tool_choice, Some(json!("auto")));
        assert_eq!(out.tools.unwrap()[0]["function"]["name"], "doc_view");
    }

    #[test]
    fn test_tool_choice_dropped_without_tools() {
        let options = GenerateOptions::new().tool_choice(ToolChoice::Auto);
        let req = GenerateRequest::new("m", vec![Message::user("hi")]).with_options(options);
        let out = to_openrouter_request(&req, false).unwrap();
        assert!(out.tools.is_none());
        assert!(out.tool_choice.is_none());
    }

    #[test]
    fn test_response_with_bad_tool_arguments_fails() {
        let resp: OpenRouterResponse = serde_json::from_value(json!({
            "id": "gen-1",
            "model": "m",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "doc_view", "arguments": "{\"path\":" }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();
        assert!(matches!(
            from_openrouter_response(resp),
            Err(Error::InvalidToolArguments { .. })
        ));
    }

    #[test]
    fn test_response_text_and_usage() {
        let resp: OpenRouterResponse = serde_json::from_value(json!({
            "id": "gen-1",
            "model": "openai/gpt-4o-mini",
            "choices": [{ "message": { "content": "4" }, "finish_reason": "stop" }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13 }
        }))
        .unwrap();
        let out = from_openrouter_response(resp).unwrap();
        assert_eq!(out.text(), "4");
        assert_eq!(out.usage.total_tokens, 13);
        assert_eq!(out.finish_reason.unified, FinishReasonKind::Stop);
    }
}
