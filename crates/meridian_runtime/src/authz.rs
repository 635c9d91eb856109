//! Chat ownership checks run before any engine work.

use std::sync::Arc;

use async_trait::async_trait;
use meridian_core::ChatDirectory;
use thiserror::Error;

use crate::error::RuntimeError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("user {user_id} may not access chat {chat_id}")]
    Forbidden { user_id: String, chat_id: String },

    #[error("chat {0} not found")]
    NotFound(String),

    /// The ownership lookup itself failed.
    #[error("authorization lookup failed: {0}")]
    Lookup(String),
}

impl From<AuthzError> for RuntimeError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Forbidden { .. } => RuntimeError::Forbidden(err.to_string()),
            AuthzError::NotFound(_) => RuntimeError::NotFound(err.to_string()),
            AuthzError::Lookup(message) => RuntimeError::Storage(message),
        }
    }
}

#[async_trait]
pub trait ResourceAuthorizer: Send + Sync {
    async fn can_access_chat(&self, user_id: &str, chat_id: &str) -> Result<(), AuthzError>;
}

/// Grants access to the user owning the chat's project.
pub struct OwnerAuthorizer {
    directory: Arc<dyn ChatDirectory>,
}

impl OwnerAuthorizer {
    pub fn new(directory: Arc<dyn ChatDirectory>) -> Self {
        Self { directory }
    }

    fn check(directory: &dyn ChatDirectory, user_id: &str, chat_id: &str) -> Result<(), AuthzError> {
        let chat = directory
            .get_chat(chat_id)
            .map_err(|e| AuthzError::Lookup(e.to_string()))?
            .ok_or_else(|| AuthzError::NotFound(chat_id.to_string()))?;

        let owner = match directory
            .get_project(&chat.project_id)
            .map_err(|e| AuthzError::Lookup(e.to_string()))?
        {
            Some(project) => project.user_id,
            // Orphaned chat: fall back to its denormalized owner
            None => chat.user_id,
        };

        if owner == user_id {
            Ok(())
        } else {
            Err(AuthzError::Forbidden {
                user_id: user_id.to_string(),
                chat_id: chat_id.to_string(),
            })
        }
    }
}

#[async_trait]
impl ResourceAuthorizer for OwnerAuthorizer {
    async fn can_access_chat(&self, user_id: &str, chat_id: &str) -> Result<(), AuthzError> {
        let directory = Arc::clone(&self.directory);
        let user_id = user_id.to_string();
        let chat_id = chat_id.to_string();
        let result = tokio::task::spawn_blocking(move || {
            Self::check(directory.as_ref(), &user_id, &chat_id)
        })
        .await
        .map_err(|e| AuthzError::Lookup(e.to_string()))?;

        if let Err(e) = &result {
            tracing::info!(error = %e, "chat access denied");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{ChatRecord, ProjectRecord, SqliteStore};

    fn directory() -> Arc<SqliteStore> {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_project(&ProjectRecord::new("proj-1", "user-1", "Novel"))
            .unwrap();
        store
            .upsert_chat(&ChatRecord::new("chat-1", "proj-1", "user-1", "Draft help"))
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_owner_is_allowed() {
        let authz = OwnerAuthorizer::new(directory());
        assert_eq!(authz.can_access_chat("user-1", "chat-1").await, Ok(()));
    }

    #[tokio::test]
    async fn test_other_user_is_forbidden() {
        let authz = OwnerAuthorizer::new(directory());
        let err = authz.can_access_chat("user-2", "chat-1").await.unwrap_err();
        assert!(matches!(err, AuthzError::Forbidden { .. }));
        assert!(matches!(RuntimeError::from(err), RuntimeError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_unknown_chat_is_not_found() {
        let authz = OwnerAuthorizer::new(directory());
        let err = authz.can_access_chat("user-1", "chat-9").await.unwrap_err();
        assert_eq!(err, AuthzError::NotFound("chat-9".to_string()));
    }
}
