//! OpenRouter streaming support
//!
//! OpenRouter uses the OpenAI-compatible SSE format:
//! - `data: {"choices":[{"delta":{"content":"..."}}]}` for text deltas
//! - `data: {"choices":[{"delta":{"reasoning":"..."}}]}` for reasoning
//! - `data: {"choices":[{"delta":{"tool_calls":[...]}}]}` for tool calls
//! - a final chunk carrying `usage` (with `stream_options.include_usage`)
//! - `data: [DONE]` to signal stream end
//!
//! The finish reason and usage can arrive in different chunks, so `Finish`
//! is emitted once the stream is done.

use super::convert::parse_finish_reason;
use super::types::OpenRouterStreamChunk;
use crate::accumulate::ToolCallAccumulator;
use crate::error::{Error, Result};
use crate::types::{FinishReason, GenerateStream, StreamEvent, Usage};
use futures::stream::StreamExt;
use reqwest_eventsource::{Event, EventSource};

/// Per-response stream state
#[derive(Debug, Default)]
pub(crate) struct StreamState {
    started: bool,
    tool_calls: ToolCallAccumulator,
    finish_reason: Option<FinishReason>,
    usage: Usage,
}

impl StreamState {
    /// Close open tool calls and produce the terminal `Finish`.
    pub(crate) fn finish(&mut self) -> Result<Vec<StreamEvent>> {
        let reason = self
            .finish_reason
            .take()
            .ok_or_else(|| Error::stream_error("stream ended without a finish reason"))?;
        let mut events = self.tool_calls.finish()?;
        events.push(StreamEvent::finish(self.usage, reason));
        Ok(events)
    }
}

/// Create a stream from an OpenRouter EventSource
pub async fn create_stream(mut event_source: EventSource) -> Result<GenerateStream> {
    let stream = async_stream::stream! {
        let mut state = StreamState::default();

        loop {
            let Some(event) = event_source.next().await else {
                break;
            };
            match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => {
                    if message.data == "[DONE]" {
                        break;
                    }

                    let chunk = match serde_json::from_str::<OpenRouterStreamChunk>(&message.data) {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            yield Err(Error::stream_error(format!(
                                "Failed to parse OpenRouter chunk: {}", e
                            )));
                            event_source.close();
                            return;
                        }
                    };
                    match process_chunk(chunk, &mut state) {
                        Ok(events) => {
                            for stream_event in events {
                                yield Ok(stream_event);
                            }
                        }
                        Err(e) => {
                            yield Err(e);
                            event_source.close();
                            return;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unable to read error body".to_string());
                    yield Err(Error::from_status(status.as_u16(), format!(
                        "OpenRouter API error: {}", error_body
                    )));
                    event_source.close();
                    return;
                }
                Err(reqwest_eventsource::Error::Transport(e)) => {
                    yield Err(Error::Transport(e.to_string()));
                    event_source.close();
                    return;
                }
                Err(e) => {
                    yield Err(Error::stream_error(format!("Stream error: {}", e)));
                    event_source.close();
                    return;
                }
            }
        }

        event_source.close();
        match state.finish() {
            Ok(events) => {
                for stream_event in events {
                    yield Ok(stream_event);
                }
            }
            Err(e) => yield Err(e),
        }
    };

    Ok(GenerateStream::new(Box::pin(stream)))
}

/// Process a single stream chunk into unified StreamEvent(s)
pub(crate) fn process_chunk(
    chunk: OpenRouterStreamChunk,
    state: &mut StreamState,
) -> Result<Vec<StreamEvent>> {
    if let Some(err) = chunk.error {
        let code = err.code.map(|c| format!(" [{c}]")).unwrap_or_default();
        return Err(Error::provider_error(format!("OpenRouter stream error{code}: {}", err.message)));
    }

    let mut events = Vec::new();

    if !state.started {
        state.started = true;
        events.push(StreamEvent::start(chunk.id.clone()));
    }

    if let Some(usage) = &chunk.usage {
        state
            .usage
            .merge(Usage::new(usage.prompt_tokens, usage.completion_tokens));
    }

    for choice in chunk.choices {
        let delta = choice.delta;

        if let Some(reasoning) = delta.reasoning.filter(|r| !r.is_empty()) {
            events.push(StreamEvent::reasoning_delta(chunk.id.clone(), reasoning));
        }

        if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
            events.push(StreamEvent::text_delta(chunk.id.clone(), content));
        }

        for tc in delta.tool_calls.unwrap_or_default() {
            if let Some(id) = tc.id {
                let name = tc.function.name.clone().unwrap_or_default();
                events.push(state.tool_calls.start(tc.index, id, name));
            }
            if let Some(args) = tc.function.arguments.as_deref() {
                events.extend(state.tool_calls.push(tc.index, args));
            }
        }

        if choice.finish_reason.is_some() {
            state.finish_reason = Some(parse_finish_reason(&choice.finish_reason));
        }
    }

    Ok(events)
}
