use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::CoreError;
use crate::status::TurnStatus;
use crate::turn::TurnId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    Thinking,
    ToolUse,
    ToolResult,
    /// Terminal marker appended when a turn is cancelled.
    Marker,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Thinking => "thinking",
            BlockKind::ToolUse => "tool_use",
            BlockKind::ToolResult => "tool_result",
            BlockKind::Marker => "marker",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(BlockKind::Text),
            "thinking" => Ok(BlockKind::Thinking),
            "tool_use" => Ok(BlockKind::ToolUse),
            "tool_result" => Ok(BlockKind::ToolResult),
            "marker" => Ok(BlockKind::Marker),
            other => Err(CoreError::InvalidValue(format!("block kind '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockPayload {
    Text {
        text: String,
    },
    Thinking {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    ToolUse {
        tool_use_id: String,
        tool_name: String,
        input: JsonValue,
    },
    ToolResult {
        tool_use_id: String,
        tool_name: String,
        result: JsonValue,
        is_error: bool,
        #[serde(default)]
        duration_ms: u64,
    },
    Marker {
        status: TurnStatus,
        message: String,
    },
}

impl BlockPayload {
    pub fn text(text: impl Into<String>) -> Self {
        BlockPayload::Text { text: text.into() }
    }

    pub fn thinking(text: impl Into<String>, signature: Option<String>) -> Self {
        BlockPayload::Thinking {
            text: text.into(),
            signature,
        }
    }

    pub fn tool_use(
        tool_use_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: JsonValue,
    ) -> Self {
        BlockPayload::ToolUse {
            tool_use_id: tool_use_id.into(),
            tool_name: tool_name.into(),
            input,
        }
    }

    pub fn marker(status: TurnStatus, message: impl Into<String>) -> Self {
        BlockPayload::Marker {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            BlockPayload::Text { .. } => BlockKind::Text,
            BlockPayload::Thinking { .. } => BlockKind::Thinking,
            BlockPayload::ToolUse { .. } => BlockKind::ToolUse,
            BlockPayload::ToolResult { .. } => BlockKind::ToolResult,
            BlockPayload::Marker { .. } => BlockKind::Marker,
        }
    }

    /// Text carried by text-like blocks.
    pub fn text_content(&self) -> Option<&str> {
        match self {
            BlockPayload::Text { text } | BlockPayload::Thinking { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Call identifier for tool-use and tool-result blocks.
    pub fn tool_use_id(&self) -> Option<&str> {
        match self {
            BlockPayload::ToolUse { tool_use_id, .. }
            | BlockPayload::ToolResult { tool_use_id, .. } => Some(tool_use_id),
            _ => None,
        }
    }
}

/// One immutable, sequenced fragment of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub turn_id: TurnId,
    /// Gapless per turn, starting at 1.
    pub sequence: u64,
    #[serde(flatten)]
    pub payload: BlockPayload,
    pub created_at: DateTime<Utc>,
}

impl Block {
    pub fn new(turn_id: TurnId, sequence: u64, payload: BlockPayload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            turn_id,
            sequence,
            payload,
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> BlockKind {
        self.payload.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_kind_parse() {
        assert_eq!("tool_use".parse::<BlockKind>().unwrap(), BlockKind::ToolUse);
        assert!("image".parse::<BlockKind>().is_err());
    }

    #[test]
    fn test_text_block_serialization() {
        let block = Block::new(TurnId::from("t-1"), 1, BlockPayload::text("4"));
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains(r#""kind":"text""#));
        assert!(json.contains(r#""text":"4""#));
        assert!(json.contains(r#""sequence":1"#));
        assert!(json.contains(r#""turn_id":"t-1""#));
    }

    #[test]
    fn test_tool_use_block_round_trip() {
        let block = Block::new(
            TurnId::from("t-1"),
            2,
            BlockPayload::tool_use("call_1", "doc_search", json!({"query": "Aria"})),
        );
        let json = serde_json::to_string(&block).unwrap();
        let decoded: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.kind(), BlockKind::ToolUse);
        assert_eq!(decoded.payload.tool_use_id(), Some("call_1"));
    }

    #[test]
    fn test_thinking_signature_omitted_when_absent() {
        let payload = BlockPayload::thinking("hmm", None);
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("signature"));
        assert_eq!(payload.text_content(), Some("hmm"));
    }

    #[test]
    fn test_marker_block() {
        let payload = BlockPayload::marker(TurnStatus::Cancelled, "cancelled by user");
        assert_eq!(payload.kind(), BlockKind::Marker);
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains(r#""status":"cancelled""#));
        assert!(payload.text_content().is_none());
    }
}
