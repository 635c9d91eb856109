use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockKind};
use crate::status::{FailureReason, TurnStatus};
use crate::turn::{Turn, TurnId};

/// Everything a turn subscriber can observe, in commit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    TurnStart {
        turn_id: TurnId,
        provider: String,
        model: String,
    },

    Status {
        turn_id: TurnId,
        status: TurnStatus,
    },

    /// Live-only fragment of the block that will be committed at `sequence`.
    BlockDelta {
        sequence: u64,
        kind: BlockKind,
        delta: String,
    },

    Block { block: Block },

    TurnComplete {
        turn_id: TurnId,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_reason: Option<String>,
        input_tokens: u64,
        output_tokens: u64,
    },

    TurnError {
        turn_id: TurnId,
        status: TurnStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<FailureReason>,
        error: String,
        is_cancelled: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_sequence: Option<u64>,
    },
}

impl TurnEvent {
    pub fn turn_start(turn_id: TurnId, provider: impl Into<String>, model: impl Into<String>) -> Self {
        TurnEvent::TurnStart {
            turn_id,
            provider: provider.into(),
            model: model.into(),
        }
    }

    pub fn status(turn_id: TurnId, status: TurnStatus) -> Self {
        TurnEvent::Status { turn_id, status }
    }

    pub fn block_delta(sequence: u64, kind: BlockKind, delta: impl Into<String>) -> Self {
        TurnEvent::BlockDelta {
            sequence,
            kind,
            delta: delta.into(),
        }
    }

    pub fn block(block: Block) -> Self {
        TurnEvent::Block { block }
    }

    /// Terminal event describing `turn`, or `None` while it is still running.
    pub fn terminal_for(turn: &Turn, last_sequence: u64) -> Option<Self> {
        let last_sequence = (last_sequence > 0).then_some(last_sequence);
        match turn.status {
            TurnStatus::Complete => Some(TurnEvent::TurnComplete {
                turn_id: turn.id.clone(),
                stop_reason: turn.stop_reason.clone(),
                input_tokens: turn.usage.input_tokens,
                output_tokens: turn.usage.output_tokens,
            }),
            TurnStatus::Failed => Some(TurnEvent::TurnError {
                turn_id: turn.id.clone(),
                status: TurnStatus::Failed,
                reason: turn.failure.as_ref().map(|f| f.reason),
                error: turn
                    .failure
                    .as_ref()
                    .map(|f| f.message.clone())
                    .unwrap_or_else(|| "turn failed".to_string()),
                is_cancelled: false,
                last_sequence,
            }),
            TurnStatus::Cancelled => Some(TurnEvent::TurnError {
                turn_id: turn.id.clone(),
                status: TurnStatus::Cancelled,
                reason: None,
                error: "turn cancelled".to_string(),
                is_cancelled: true,
                last_sequence,
            }),
            _ => None,
        }
    }

    /// SSE `event:` name.
    pub fn event_name(&self) -> &'static str {
        match self {
            TurnEvent::TurnStart { .. } => "turn_start",
            TurnEvent::Status { .. } => "status",
            TurnEvent::BlockDelta { .. } => "block_delta",
            TurnEvent::Block { .. } => "block",
            TurnEvent::TurnComplete { .. } => "turn_complete",
            TurnEvent::TurnError { .. } => "turn_error",
        }
    }

    /// Resumable position of this event; only committed blocks have one.
    pub fn sequence(&self) -> Option<u64> {
        match self {
            TurnEvent::Block { block } => Some(block.sequence),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnEvent::TurnComplete { .. } | TurnEvent::TurnError { .. }
        )
    }
}
