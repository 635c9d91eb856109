//! Per-user tool-round limits.

use async_trait::async_trait;

#[async_trait]
pub trait ToolLimitResolver: Send + Sync {
    /// Maximum number of model→tools→model rounds for one turn of `user_id`.
    async fn tool_round_limit(&self, user_id: &str) -> anyhow::Result<usize>;
}

/// Same limit for every user.
#[derive(Debug, Clone, Copy)]
pub struct StaticToolLimits(pub usize);

#[async_trait]
impl ToolLimitResolver for StaticToolLimits {
    async fn tool_round_limit(&self, _user_id: &str) -> anyhow::Result<usize> {
        Ok(self.0)
    }
}
