use parking_lot::Mutex;
use std::path::Path;

use super::{blocks, chats, connection, turns};
use crate::block::Block;
use crate::chat::{ChatDirectory, ChatRecord, ProjectRecord};
use crate::error::Result;
use crate::store::TurnStore;
use crate::turn::{Turn, TurnId};

/// SQLite-backed `TurnStore` and `ChatDirectory`.
///
/// One connection behind a mutex; WAL keeps readers cheap and the mutex
/// serializes writers inside this process.
pub struct SqliteStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    /// Opens the DB file at `db_path`, creating parent dirs and schema as needed.
    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::from_connection(connection::open_db_file(db_path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(connection::open_in_memory()?))
    }

    /// Wraps a connection that already has the schema applied.
    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn upsert_project(&self, project: &ProjectRecord) -> Result<()> {
        chats::upsert_project(&self.conn.lock(), project)
    }

    pub fn upsert_chat(&self, chat: &ChatRecord) -> Result<()> {
        chats::upsert_chat(&self.conn.lock(), chat)
    }
}

impl TurnStore for SqliteStore {
    fn insert_turn(&self, turn: &Turn) -> Result<()> {
        turns::insert(&self.conn.lock(), turn)
    }

    fn get_turn(&self, turn_id: &TurnId) -> Result<Option<Turn>> {
        turns::get(&self.conn.lock(), turn_id)
    }

    fn update_turn(&self, turn: &Turn) -> Result<()> {
        turns::update(&self.conn.lock(), turn)
    }

    fn append_block(&self, block: &Block) -> Result<()> {
        blocks::append(&mut self.conn.lock(), block)
    }

    fn blocks_after(&self, turn_id: &TurnId, after: u64) -> Result<Vec<Block>> {
        blocks::after(&self.conn.lock(), turn_id, after)
    }

    fn last_sequence(&self, turn_id: &TurnId) -> Result<u64> {
        blocks::last_sequence(&self.conn.lock(), turn_id)
    }

    fn turn_path(&self, turn_id: &TurnId) -> Result<Vec<Turn>> {
        turns::path(&self.conn.lock(), turn_id)
    }

    fn chat_turns(&self, chat_id: &str) -> Result<Vec<Turn>> {
        turns::list_for_chat(&self.conn.lock(), chat_id)
    }
}

impl ChatDirectory for SqliteStore {
    fn get_chat(&self, chat_id: &str) -> Result<Option<ChatRecord>> {
        chats::get_chat(&self.conn.lock(), chat_id)
    }

    fn get_project(&self, project_id: &str) -> Result<Option<ProjectRecord>> {
        chats::get_project(&self.conn.lock(), project_id)
    }
}
