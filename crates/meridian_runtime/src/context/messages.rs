//! Turn history to provider messages.

use meridian_core::{Block, BlockPayload, Role as TurnRole, Turn};
use meridian_llms::{CapabilityRegistry, ContentPart, Message, Role};
use meridian_toolbus::FormatterRegistry;
use serde_json::json;

use crate::config::DEFAULT_PROVIDER;

/// Share of the context window above which the model is told to wrap up.
pub const CONTEXT_NOTICE_THRESHOLD: f64 = 0.75;

pub const INTERRUPTED_TOOL_ERROR: &str = "Tool execution was interrupted";

/// A prior turn with its committed blocks, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryTurn {
    pub turn: Turn,
    pub blocks: Vec<Block>,
}

/// Collects parts into messages, starting a new message whenever the role changes.
#[derive(Default)]
struct MessageAccumulator {
    messages: Vec<Message>,
    current: Option<(Role, Vec<ContentPart>)>,
}

impl MessageAccumulator {
    fn push(&mut self, role: Role, part: ContentPart) {
        match &mut self.current {
            Some((current_role, parts)) if *current_role == role => parts.push(part),
            _ => {
                self.flush();
                self.current = Some((role, vec![part]));
            }
        }
    }

    fn flush(&mut self) {
        if let Some((role, parts)) = self.current.take() {
            self.messages.push(Message::with_parts(role, parts));
        }
    }

    fn finish(mut self) -> Vec<Message> {
        self.flush();
        self.messages
    }
}

/// Gives every tool use without a later matching result a synthetic error
/// result placed directly after it.
pub fn repair_dangling_tool_uses(payloads: &[BlockPayload]) -> Vec<BlockPayload> {
    let mut repaired = Vec::with_capacity(payloads.len());
    for (i, payload) in payloads.iter().enumerate() {
        repaired.push(payload.clone());
        let BlockPayload::ToolUse {
            tool_use_id,
            tool_name,
            ..
        } = payload
        else {
            continue;
        };
        let answered = payloads[i + 1..].iter().any(|later| {
            matches!(later, BlockPayload::ToolResult { tool_use_id: id, .. } if id == tool_use_id)
        });
        if !answered {
            tracing::warn!(tool.name = %tool_name, tool_use_id = %tool_use_id, "repairing dangling tool use");
            repaired.push(BlockPayload::ToolResult {
                tool_use_id: tool_use_id.clone(),
                tool_name: tool_name.clone(),
                result: json!({ "error": INTERRUPTED_TOOL_ERROR }),
                is_error: true,
                duration_ms: 0,
            });
        }
    }
    repaired
}

/// Messages for one turn's blocks.
///
/// Assistant text and tool calls share a message; tool results follow as a
/// tool message. Successful results pass through the formatter registry.
/// Thinking is replayed only when `replay_thinking` is set, for the turn
/// currently being executed.
pub fn turn_messages(
    role: TurnRole,
    blocks: &[Block],
    formatters: &FormatterRegistry,
    replay_thinking: bool,
) -> Vec<Message> {
    let payloads: Vec<BlockPayload> = blocks.iter().map(|b| b.payload.clone()).collect();
    let payloads = repair_dangling_tool_uses(&payloads);

    let text_role = match role {
        TurnRole::User => Role::User,
        TurnRole::Assistant => Role::Assistant,
    };

    let mut acc = MessageAccumulator::default();
    for payload in payloads {
        match payload {
            BlockPayload::Text { text } => {
                if !text.is_empty() {
                    acc.push(text_role, ContentPart::text(text));
                }
            }
            BlockPayload::Thinking { text, signature } => {
                if replay_thinking {
                    acc.push(Role::Assistant, ContentPart::reasoning(text, signature));
                }
            }
            BlockPayload::ToolUse {
                tool_use_id,
                tool_name,
                input,
            } => acc.push(Role::Assistant, ContentPart::tool_call(tool_use_id, tool_name, input)),
            BlockPayload::ToolResult {
                tool_use_id,
                tool_name,
                result,
                is_error,
                ..
            } => {
                let content = if is_error {
                    result
                } else {
                    formatters.format(&tool_name, &result)
                };
                acc.push(Role::Tool, ContentPart::tool_result(tool_use_id, content, is_error));
            }
            BlockPayload::Marker { .. } => {}
        }
    }
    acc.finish()
}

/// Messages for a whole history path. Turns without replayable content are skipped.
pub fn history_messages(history: &[HistoryTurn], formatters: &FormatterRegistry) -> Vec<Message> {
    history
        .iter()
        .flat_map(|entry| {
            let messages = turn_messages(entry.turn.role, &entry.blocks, formatters, false);
            if messages.is_empty() {
                tracing::debug!(turn.id = %entry.turn.id, "skipping turn with no replayable blocks");
            }
            messages
        })
        .collect()
}

/// Notice for the model when the most recent assistant turn used more than
/// [`CONTEXT_NOTICE_THRESHOLD`] of its model's context window. Unknown models
/// get no notice.
pub fn context_notice(history: &[HistoryTurn], capabilities: &CapabilityRegistry) -> Option<String> {
    let last = history
        .iter()
        .rev()
        .map(|entry| &entry.turn)
        .find(|turn| turn.role == TurnRole::Assistant)?;
    let params = last.params.as_ref()?;
    if params.model.is_empty() {
        return None;
    }
    let provider = if params.provider.is_empty() {
        DEFAULT_PROVIDER
    } else {
        params.provider.as_str()
    };
    let model = capabilities.get_model(provider, &params.model).ok()?;
    if model.context_window == 0 {
        return None;
    }

    let total = last.context_tokens;
    let usage = model.context_usage(total);
    if usage <= CONTEXT_NOTICE_THRESHOLD {
        return None;
    }

    let percent = usage * 100.0;
    tracing::info!(
        usage_percent = percent,
        total_tokens = total,
        context_window = model.context_window,
        "injecting context limit notice"
    );
    Some(format!(
        "Note: You're approaching the context limit ({percent:.1}% used, {total}/{} tokens). Consider wrapping up.",
        model.context_window
    ))
}
