use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Project a chat belongs to; carries project-level instructions and the owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl ProjectRecord {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            name: name.into(),
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: String,
    pub project_id: String,
    /// Denormalized owner, checked against the project owner on access.
    pub user_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl ChatRecord {
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        user_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            user_id: user_id.into(),
            title: title.into(),
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Read-only view of chats and projects owned by the surrounding application.
pub trait ChatDirectory: Send + Sync {
    fn get_chat(&self, chat_id: &str) -> Result<Option<ChatRecord>>;

    fn get_project(&self, project_id: &str) -> Result<Option<ProjectRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_builder() {
        let chat = ChatRecord::new("c-1", "p-1", "u-1", "Draft")
            .with_system_prompt("Write in first person.");
        assert_eq!(chat.project_id, "p-1");
        assert_eq!(chat.system_prompt.as_deref(), Some("Write in first person."));
    }

    #[test]
    fn test_project_serialization_skips_empty_prompt() {
        let project = ProjectRecord::new("p-1", "u-1", "Novel");
        let json = serde_json::to_string(&project).unwrap();
        assert!(!json.contains("system_prompt"));
    }
}
