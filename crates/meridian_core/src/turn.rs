use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::status::{FailureReason, TurnStatus};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub String);

impl TurnId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TurnId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Author of the message that originated a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(CoreError::InvalidValue(format!("role '{other}'"))),
        }
    }
}

/// Resolved parameters an assistant turn was executed with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestParams {
    pub provider: String,
    pub model: String,
    /// `low`, `medium` or `high`; absent means reasoning disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Caller-supplied system prompt override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl RequestParams {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_skills(mut self, skills: Vec<String>) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_reasoning(mut self, level: impl Into<String>) -> Self {
        self.reasoning = Some(level.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub reason: FailureReason,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub chat_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_turn_id: Option<TurnId>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<RequestParams>,
    /// Effective system prompt, recorded once composed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub status: TurnStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    /// Summed over every model round.
    pub usage: TokenUsage,
    /// Prompt plus completion tokens of the latest model round: how much of
    /// the context window the conversation occupies.
    #[serde(default)]
    pub context_tokens: u64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Turn {
    /// A user-authored turn. It records history and is never executed,
    /// so it is created already `complete`.
    pub fn user(chat_id: impl Into<String>, prev_turn_id: Option<TurnId>) -> Self {
        let now = Utc::now();
        Self {
            id: TurnId::new(),
            chat_id: chat_id.into(),
            prev_turn_id,
            role: Role::User,
            params: None,
            system_prompt: None,
            status: TurnStatus::Complete,
            failure: None,
            stop_reason: None,
            usage: TokenUsage::default(),
            context_tokens: 0,
            created_at: now,
            completed_at: Some(now),
        }
    }

    /// An assistant turn in `pending`, to be driven by the engine.
    pub fn assistant(chat_id: impl Into<String>, prev_turn_id: TurnId, params: RequestParams) -> Self {
        Self {
            id: TurnId::new(),
            chat_id: chat_id.into(),
            prev_turn_id: Some(prev_turn_id),
            role: Role::Assistant,
            params: Some(params),
            system_prompt: None,
            status: TurnStatus::Pending,
            failure: None,
            stop_reason: None,
            usage: TokenUsage::default(),
            context_tokens: 0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn with_id(mut self, id: TurnId) -> Self {
        self.id = id;
        self
    }

    /// Move to `next`, rejecting edges the state machine does not have.
    pub fn transition(&mut self, next: TurnStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn fail(&mut self, reason: FailureReason, message: impl Into<String>) -> Result<()> {
        self.transition(TurnStatus::Failed)?;
        self.failure = Some(Failure {
            reason,
            message: message.into(),
        });
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn model(&self) -> Option<&str> {
        self.params.as_ref().map(|p| p.model.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant_turn() -> Turn {
        Turn::assistant(
            "chat-1",
            TurnId::from("user-turn"),
            RequestParams::new("anthropic", "claude-haiku-4-5-20251001"),
        )
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::User).unwrap();
        assert_eq!(json, "\"user\"");
        assert_eq!("assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert!("tool".parse::<Role>().is_err());
    }

    #[test]
    fn test_user_turn_is_complete_on_creation() {
        let turn = Turn::user("chat-1", None);
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.status, TurnStatus::Complete);
        assert!(turn.completed_at.is_some());
        assert!(turn.params.is_none());
    }

    #[test]
    fn test_assistant_turn_starts_pending() {
        let turn = assistant_turn();
        assert_eq!(turn.status, TurnStatus::Pending);
        assert_eq!(turn.prev_turn_id, Some(TurnId::from("user-turn")));
        assert_eq!(turn.model(), Some("claude-haiku-4-5-20251001"));
    }

    #[test]
    fn test_transition_rejects_illegal_edge() {
        let mut turn = assistant_turn();
        let err = turn.transition(TurnStatus::Complete).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(turn.status, TurnStatus::Pending);
    }

    #[test]
    fn test_terminal_transition_sets_completed_at() {
        let mut turn = assistant_turn();
        turn.transition(TurnStatus::Composing).unwrap();
        assert!(turn.completed_at.is_none());
        turn.transition(TurnStatus::Cancelled).unwrap();
        assert!(turn.completed_at.is_some());
        assert!(turn.is_terminal());
    }

    #[test]
    fn test_fail_records_reason() {
        let mut turn = assistant_turn();
        turn.fail(FailureReason::ToolLoopExhausted, "tool loop exhausted after 5 rounds")
            .unwrap();
        assert_eq!(turn.status, TurnStatus::Failed);
        let failure = turn.failure.unwrap();
        assert_eq!(failure.reason, FailureReason::ToolLoopExhausted);
        assert!(failure.message.contains("5 rounds"));
    }

    #[test]
    fn test_token_usage_add() {
        let mut usage = TokenUsage::new(100, 50);
        usage.add(TokenUsage::new(20, 5));
        assert_eq!(usage.input_tokens, 120);
        assert_eq!(usage.output_tokens, 55);
        assert_eq!(usage.total(), 175);
    }

    #[test]
    fn test_request_params_skip_empty_fields() {
        let params = RequestParams::new("lorem", "lorem-fast");
        let json = serde_json::to_string(&params).unwrap();
        assert!(!json.contains("reasoning"));
        assert!(!json.contains("system_prompt"));
        assert!(json.contains(r#""tools":[]"#));
    }

    #[test]
    fn test_turn_serialization() {
        let turn = assistant_turn();
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains(r#""status":"pending""#));
        assert!(json.contains(r#""role":"assistant""#));
        assert!(!json.contains("failure"));

        let decoded: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, turn);
    }
}
