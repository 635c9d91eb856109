//! SQL schema. Applied on open.

/// Projects: owner and project-level instructions.
pub const PROJECTS: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    system_prompt TEXT
);
CREATE INDEX IF NOT EXISTS idx_projects_user ON projects(user_id);
";

/// Chats: one row per chat, owned by a project.
pub const CHATS: &str = "
CREATE TABLE IF NOT EXISTS chats (
    id TEXT PRIMARY KEY NOT NULL,
    project_id TEXT NOT NULL REFERENCES projects(id),
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    system_prompt TEXT
);
CREATE INDEX IF NOT EXISTS idx_chats_project ON chats(project_id);
";

/// Turns: never deleted, terminal status is final.
pub const TURNS: &str = "
CREATE TABLE IF NOT EXISTS turns (
    id TEXT PRIMARY KEY NOT NULL,
    chat_id TEXT NOT NULL,
    prev_turn_id TEXT REFERENCES turns(id),
    role TEXT NOT NULL,
    params TEXT,
    system_prompt TEXT,
    status TEXT NOT NULL,
    failure_reason TEXT,
    error TEXT,
    stop_reason TEXT,
    input_tokens INTEGER NOT NULL DEFAULT 0,
    output_tokens INTEGER NOT NULL DEFAULT 0,
    context_tokens INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    completed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_turns_chat ON turns(chat_id, created_at);
";

/// Block log: gapless per-turn sequences, immutable rows.
pub const TURN_BLOCKS: &str = "
CREATE TABLE IF NOT EXISTS turn_blocks (
    id TEXT PRIMARY KEY NOT NULL,
    turn_id TEXT NOT NULL REFERENCES turns(id),
    sequence INTEGER NOT NULL,
    kind TEXT NOT NULL,
    tool_use_id TEXT,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (turn_id, sequence)
);
CREATE INDEX IF NOT EXISTS idx_turn_blocks_tool_use ON turn_blocks(turn_id, tool_use_id);
";

/// Run all migrations on an open connection.
pub fn run_all(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(PROJECTS)?;
    conn.execute_batch(CHATS)?;
    conn.execute_batch(TURNS)?;
    conn.execute_batch(TURN_BLOCKS)?;
    Ok(())
}
