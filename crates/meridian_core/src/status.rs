//! Turn lifecycle states and terminal failure reasons.
//!
//! ```text
//! pending -> composing -> awaiting_model -> (executing_tools -> awaiting_model)* -> completing -> complete
//!                 \______________ failed | cancelled (from any non-terminal state) ____________/
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Pending,
    Composing,
    AwaitingModel,
    ExecutingTools,
    Completing,
    Complete,
    Failed,
    Cancelled,
}

impl TurnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnStatus::Pending => "pending",
            TurnStatus::Composing => "composing",
            TurnStatus::AwaitingModel => "awaiting_model",
            TurnStatus::ExecutingTools => "executing_tools",
            TurnStatus::Completing => "completing",
            TurnStatus::Complete => "complete",
            TurnStatus::Failed => "failed",
            TurnStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnStatus::Complete | TurnStatus::Failed | TurnStatus::Cancelled
        )
    }

    /// Whether `self -> next` is an edge of the turn state machine.
    pub fn can_transition_to(&self, next: TurnStatus) -> bool {
        use TurnStatus::*;

        if self.is_terminal() {
            return false;
        }
        if matches!(next, Failed | Cancelled) {
            return true;
        }
        matches!(
            (self, next),
            (Pending, Composing)
                | (Composing, AwaitingModel)
                | (AwaitingModel, ExecutingTools)
                | (AwaitingModel, Completing)
                | (ExecutingTools, AwaitingModel)
                | (Completing, Complete)
        )
    }
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TurnStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TurnStatus::Pending),
            "composing" => Ok(TurnStatus::Composing),
            "awaiting_model" => Ok(TurnStatus::AwaitingModel),
            "executing_tools" => Ok(TurnStatus::ExecutingTools),
            "completing" => Ok(TurnStatus::Completing),
            "complete" => Ok(TurnStatus::Complete),
            "failed" => Ok(TurnStatus::Failed),
            "cancelled" => Ok(TurnStatus::Cancelled),
            other => Err(CoreError::InvalidValue(format!("turn status '{other}'"))),
        }
    }
}

/// Why a turn ended in `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Prompt inputs missing or unreadable; no provider call was made.
    Composition,
    /// Network failure before the first byte, after retries.
    Transport,
    /// Malformed provider output or unparseable tool-call arguments.
    Protocol,
    /// Provider rejected the request (auth, invalid request, rate limit after retries).
    Provider,
    /// The model kept requesting tools past the configured round limit.
    ToolLoopExhausted,
    /// Durable log write failed.
    Storage,
    Internal,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Composition => "composition",
            FailureReason::Transport => "transport",
            FailureReason::Protocol => "protocol",
            FailureReason::Provider => "provider",
            FailureReason::ToolLoopExhausted => "tool_loop_exhausted",
            FailureReason::Storage => "storage",
            FailureReason::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureReason {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "composition" => Ok(FailureReason::Composition),
            "transport" => Ok(FailureReason::Transport),
            "protocol" => Ok(FailureReason::Protocol),
            "provider" => Ok(FailureReason::Provider),
            "tool_loop_exhausted" => Ok(FailureReason::ToolLoopExhausted),
            "storage" => Ok(FailureReason::Storage),
            "internal" => Ok(FailureReason::Internal),
            other => Err(CoreError::InvalidValue(format!("failure reason '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            TurnStatus::Pending,
            TurnStatus::Composing,
            TurnStatus::AwaitingModel,
            TurnStatus::ExecutingTools,
            TurnStatus::AwaitingModel,
            TurnStatus::Completing,
            TurnStatus::Complete,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be allowed",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_failure_reachable_from_any_non_terminal() {
        for status in [
            TurnStatus::Pending,
            TurnStatus::Composing,
            TurnStatus::AwaitingModel,
            TurnStatus::ExecutingTools,
            TurnStatus::Completing,
        ] {
            assert!(status.can_transition_to(TurnStatus::Failed));
            assert!(status.can_transition_to(TurnStatus::Cancelled));
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        for status in [
            TurnStatus::Complete,
            TurnStatus::Failed,
            TurnStatus::Cancelled,
        ] {
            assert!(status.is_terminal());
            assert!(!status.can_transition_to(TurnStatus::Failed));
            assert!(!status.can_transition_to(TurnStatus::AwaitingModel));
        }
    }

    #[test]
    fn test_skipping_states_is_rejected() {
        assert!(!TurnStatus::Pending.can_transition_to(TurnStatus::AwaitingModel));
        assert!(!TurnStatus::Composing.can_transition_to(TurnStatus::Complete));
        assert!(!TurnStatus::ExecutingTools.can_transition_to(TurnStatus::Completing));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        let status: TurnStatus = "executing_tools".parse().unwrap();
        assert_eq!(status, TurnStatus::ExecutingTools);
        assert_eq!(status.to_string(), "executing_tools");
        assert!("running".parse::<TurnStatus>().is_err());
    }

    #[test]
    fn test_failure_reason_serializes_snake_case() {
        let json = serde_json::to_string(&FailureReason::ToolLoopExhausted).unwrap();
        assert_eq!(json, r#""tool_loop_exhausted""#);
    }
}
