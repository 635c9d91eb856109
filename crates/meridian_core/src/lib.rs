pub mod block;
pub mod chat;
pub mod db;
pub mod error;
pub mod event;
pub mod status;
pub mod store;
pub mod tool_call;
pub mod turn;

pub use block::{Block, BlockKind, BlockPayload};
pub use chat::{ChatDirectory, ChatRecord, ProjectRecord};
pub use db::SqliteStore;
pub use error::{CoreError, Result};
pub use event::TurnEvent;
pub use status::{FailureReason, TurnStatus};
pub use store::TurnStore;
pub use tool_call::{ToolInvocation, ToolOutcome};
pub use turn::{Failure, RequestParams, Role, TokenUsage, Turn, TurnId};
