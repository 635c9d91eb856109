//! meridian_runtime: turn execution for chat conversations.
//!
//! ```text
//!  start_turn ──► authorize ──► resolve params ──► spawn executor
//!                                                     │
//!          compose prompt ◄───────────────────────────┘
//!                │
//!                ▼
//!   provider stream ──► BlockLog (durable, then buffered) ──► StreamHub ──► subscribers
//!                ▲                                                 ▲
//!                └── tool round (bounded) ◄────────────────────────┘ replay from log
//! ```

pub mod authz;
pub mod block_log;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod fanout;
pub mod skills;

#[cfg(test)]
mod tests;

pub use authz::{AuthzError, OwnerAuthorizer, ResourceAuthorizer};
pub use block_log::BlockLog;
pub use config::{AbandonPolicy, EngineConfig};
pub use context::{ComposedPrompt, PromptComposer, PromptInputs};
pub use engine::{Engine, EngineDeps, TurnHandle, TurnRequest, TurnView};
pub use error::{Result, RuntimeError};
pub use fanout::{StreamHub, Subscription};
pub use skills::{DocumentSkillSource, SkillSource};
