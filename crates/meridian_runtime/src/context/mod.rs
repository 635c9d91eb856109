//! Prompt composition for a turn.
//!
//! - **prompt**: system string from override, project, chat and skill sources
//! - **messages**: turn history to provider messages, tool-use repair, context notice

mod messages;
mod prompt;

pub use messages::{
    CONTEXT_NOTICE_THRESHOLD, HistoryTurn, INTERRUPTED_TOOL_ERROR, context_notice, history_messages,
    repair_dangling_tool_uses, turn_messages,
};
pub use prompt::{SKILLS_HEADER, SystemSources, build_system_prompt};

use std::sync::Arc;

use meridian_llms::{CapabilityRegistry, Message};
use meridian_toolbus::FormatterRegistry;

use crate::error::{Result, RuntimeError};
use crate::skills::SkillSource;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptInputs {
    pub system: SystemSources,
    /// Oldest first, ending with the user turn that triggered the request.
    pub history: Vec<HistoryTurn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPrompt {
    pub system: Option<String>,
    pub messages: Vec<Message>,
}

pub struct PromptComposer {
    skills: Arc<dyn SkillSource>,
    formatters: Arc<FormatterRegistry>,
    capabilities: Arc<CapabilityRegistry>,
}

impl PromptComposer {
    pub fn new(
        skills: Arc<dyn SkillSource>,
        formatters: Arc<FormatterRegistry>,
        capabilities: Arc<CapabilityRegistry>,
    ) -> Self {
        Self {
            skills,
            formatters,
            capabilities,
        }
    }

    pub fn formatters(&self) -> &FormatterRegistry {
        &self.formatters
    }

    pub async fn compose(&self, inputs: &PromptInputs) -> Result<ComposedPrompt> {
        let system = build_system_prompt(&inputs.system, self.skills.as_ref()).await?;

        let mut messages = history_messages(&inputs.history, &self.formatters);
        if messages.is_empty() {
            return Err(RuntimeError::Composition(
                "conversation history has no messages".to_string(),
            ));
        }
        if let Some(notice) = context_notice(&inputs.history, &self.capabilities) {
            messages.push(Message::user(notice));
        }

        tracing::debug!(
            system_length = system.as_ref().map(String::len).unwrap_or(0),
            message_count = messages.len(),
            "prompt composed"
        );
        Ok(ComposedPrompt { system, messages })
    }
}
