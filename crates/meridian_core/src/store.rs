//! Durable turn and block log contract.

use crate::block::Block;
use crate::error::Result;
use crate::turn::{Turn, TurnId};

/// Durable storage for turns and their block logs.
///
/// Implementations are synchronous; async callers move work onto a blocking
/// thread. Blocks are append-only: `append_block` must reject any sequence
/// other than `last_sequence + 1` and any tool result whose call id has no
/// earlier tool use in the same turn.
pub trait TurnStore: Send + Sync {
    fn insert_turn(&self, turn: &Turn) -> Result<()>;

    fn get_turn(&self, turn_id: &TurnId) -> Result<Option<Turn>>;

    /// Overwrites the mutable fields of an existing turn (status, failure,
    /// usage, stop reason, system prompt, completion time).
    fn update_turn(&self, turn: &Turn) -> Result<()>;

    fn append_block(&self, block: &Block) -> Result<()>;

    /// Blocks with `sequence > after`, ascending.
    fn blocks_after(&self, turn_id: &TurnId, after: u64) -> Result<Vec<Block>>;

    /// Highest committed sequence for the turn, 0 when it has no blocks.
    fn last_sequence(&self, turn_id: &TurnId) -> Result<u64>;

    /// The turn and its ancestors via `prev_turn_id`, oldest first.
    fn turn_path(&self, turn_id: &TurnId) -> Result<Vec<Turn>>;

    /// All turns in a chat ordered by creation time.
    fn chat_turns(&self, chat_id: &str) -> Result<Vec<Turn>>;
}
