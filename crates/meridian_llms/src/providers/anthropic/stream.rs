//! Anthropic streaming support
//!
//! The Messages API streams typed events rather than OpenAI-style chunks:
//! - `message_start` carries the message id and prompt usage
//! - `content_block_start` opens a text, thinking or tool_use block
//! - `content_block_delta` carries text, thinking, signature or partial JSON
//! - `content_block_stop` closes a block
//! - `message_delta` carries the stop reason and output usage
//! - `message_stop` ends the message
//! - `error` reports a mid-stream failure (e.g. overloaded)

use super::convert::parse_stop_reason;
use super::types::{BlockDelta, StartBlock, StreamEventPayload};
use crate::accumulate::ToolCallAccumulator;
use crate::error::{Error, Result};
use crate::types::{GenerateStream, StreamEvent, Usage};
use futures::stream::StreamExt;
use reqwest_eventsource::{Event, EventSource};

#[derive(Debug, Default)]
pub(crate) struct StreamState {
    message_id: String,
    tool_calls: ToolCallAccumulator,
    stop_reason: Option<String>,
    usage: Usage,
    finished: bool,
}

/// Create a stream from an Anthropic EventSource
pub async fn create_stream(mut event_source: EventSource) -> Result<GenerateStream> {
    let stream = async_stream::stream! {
        let mut state = StreamState::default();

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => {
                    let payload = match serde_json::from_str::<StreamEventPayload>(&message.data) {
                        Ok(payload) => payload,
                        Err(e) => {
                            yield Err(Error::stream_error(format!(
                                "Failed to parse Anthropic event '{}': {}", message.event, e
                            )));
                            event_source.close();
                            return;
                        }
                    };
                    match process_event(payload, &mut state) {
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
                    if state.finished {
                        break;
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unable to read error body".to_string());
                    yield Err(Error::from_status(status.as_u16(), format!(
                        "Anthropic API error: {}", error_body
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
        if !state.finished {
            yield Err(Error::stream_error("stream ended before message_stop"));
        }
    };

    Ok(GenerateStream::new(Box::pin(stream)))
}

/// Process one Anthropic event into unified StreamEvent(s)
pub(crate) fn process_event(
    payload: StreamEventPayload,
    state: &mut StreamState,
) -> Result<Vec<StreamEvent>> {
    let id = state.message_id.clone();
    let events = match payload {
        StreamEventPayload::MessageStart { message } => {
            state.message_id = message.id.clone();
            state
                .usage
                .merge(Usage::new(message.usage.input_tokens, message.usage.output_tokens));
            vec![StreamEvent::start(message.id)]
        }
        StreamEventPayload::ContentBlockStart {
            index,
            content_block,
        } => match content_block {
            StartBlock::Text { text } if !text.is_empty() => vec![StreamEvent::text_delta(id, text)],
            StartBlock::Thinking { thinking } if !thinking.is_empty() => {
                vec![StreamEvent::reasoning_delta(id, thinking)]
            }
            StartBlock::ToolUse { id: call_id, name } => {
                vec![state.tool_calls.start(index, call_id, name)]
            }
            _ => Vec::new(),
        },
        StreamEventPayload::ContentBlockDelta { index, delta } => match delta {
            BlockDelta::TextDelta { text } => vec![StreamEvent::text_delta(id, text)],
            BlockDelta::ThinkingDelta { thinking } => vec![StreamEvent::reasoning_delta(id, thinking)],
            BlockDelta::SignatureDelta { signature } => {
                vec![StreamEvent::reasoning_signature(id, signature)]
            }
            BlockDelta::InputJsonDelta { partial_json } => {
                state.tool_calls.push(index, &partial_json).into_iter().collect()
            }
            BlockDelta::Unknown => Vec::new(),
        },
        StreamEventPayload::ContentBlockStop { index } => {
            state.tool_calls.end(index)?.into_iter().collect()
        }
        StreamEventPayload::MessageDelta { delta, usage } => {
            if delta.stop_reason.is_some() {
                state.stop_reason = delta.stop_reason;
            }
            state
                .usage
                .merge(Usage::new(usage.input_tokens, usage.output_tokens));
            Vec::new()
        }
        StreamEventPayload::MessageStop => {
            let mut events = state.tool_calls.finish()?;
            events.push(StreamEvent::finish(
                state.usage,
                parse_stop_reason(state.stop_reason.as_deref()),
            ));
            state.finished = true;
            events
        }
        StreamEventPayload::Error { error } => {
            let message = format!("Anthropic stream error ({}): {}", error.type_, error.message);
            return Err(match error.type_.as_str() {
                "overloaded_error" => Error::from_status(529, message),
                "api_error" => Error::from_status(500, message),
                "rate_limit_error" => Error::from_status(429, message),
                _ => Error::provider_error(message),
            });
        }
        StreamEventPayload::Ping | StreamEventPayload::Unknown => Vec::new(),
    };
    Ok(events)
}
