//! Reassembly of streamed tool-call argument fragments.
//!
//! Providers stream a tool call as a start (id + name) followed by raw JSON
//! text fragments keyed by the call's position in the response. Arguments
//! are only parsed once the call is closed; an unparseable payload is a
//! protocol error, never silently replaced.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::types::StreamEvent;

#[derive(Debug, Clone)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

impl PendingCall {
    fn into_event(self) -> Result<StreamEvent> {
        let arguments = parse_arguments(&self.id, &self.name, &self.arguments)?;
        Ok(StreamEvent::tool_call_end(self.id, self.name, arguments))
    }
}

fn parse_arguments(id: &str, name: &str, raw: &str) -> Result<JsonValue> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    let value: JsonValue = serde_json::from_str(raw).map_err(|e| Error::InvalidToolArguments {
        id: id.to_string(),
        name: name.to_string(),
        message: format!("{e} (raw: {})", truncate(raw, 200)),
    })?;
    if !value.is_object() {
        return Err(Error::InvalidToolArguments {
            id: id.to_string(),
            name: name.to_string(),
            message: "arguments must be a JSON object".to_string(),
        });
    }
    Ok(value)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Tool calls in flight for one model response, keyed by stream index.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<u32, PendingCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a call at `index`; returns the `ToolCallStart` to surface.
    pub fn start(&mut self, index: u32, id: impl Into<String>, name: impl Into<String>) -> StreamEvent {
        let call = PendingCall {
            id: id.into(),
            name: name.into(),
            arguments: String::new(),
        };
        let event = StreamEvent::tool_call_start(call.id.clone(), call.name.clone());
        self.calls.insert(index, call);
        event
    }

    /// Append a fragment; `None` if no call is open at `index` or the fragment is empty.
    pub fn push(&mut self, index: u32, fragment: &str) -> Option<StreamEvent> {
        if fragment.is_empty() {
            return None;
        }
        let call = self.calls.get_mut(&index)?;
        call.arguments.push_str(fragment);
        Some(StreamEvent::tool_call_delta(call.id.clone(), fragment))
    }

    /// Close the call at `index`.
    pub fn end(&mut self, index: u32) -> Result<Option<StreamEvent>> {
        self.calls.remove(&index).map(PendingCall::into_event).transpose()
    }

    /// Close every open call, in index order.
    pub fn finish(&mut self) -> Result<Vec<StreamEvent>> {
        std::mem::take(&mut self.calls)
            .into_values()
            .map(PendingCall::into_event)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
