use serde::{Deserialize, Serialize};

use crate::block::BlockPayload;

/// A completed tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn to_payload(&self) -> BlockPayload {
        BlockPayload::tool_use(&self.id, &self.name, self.input.clone())
    }
}

/// What a tool handler produced for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub output: serde_json::Value,
    pub duration_ms: u64,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn success(output: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            output,
            duration_ms,
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            output: serde_json::json!({ "error": message.into() }),
            duration_ms,
            is_error: true,
        }
    }

    pub fn into_payload(self, invocation: &ToolInvocation) -> BlockPayload {
        BlockPayload::ToolResult {
            tool_use_id: invocation.id.clone(),
            tool_name: invocation.name.clone(),
            result: self.output,
            is_error: self.is_error,
            duration_ms: self.duration_ms,
        }
    }
}
