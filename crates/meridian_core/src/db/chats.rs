//! Chat and project rows.

use rusqlite::{params, OptionalExtension};

use crate::chat::{ChatRecord, ProjectRecord};
use crate::error::Result;

pub fn upsert_project(conn: &rusqlite::Connection, project: &ProjectRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO projects (id, user_id, name, system_prompt) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(id) DO UPDATE SET user_id = excluded.user_id, name = excluded.name, \
         system_prompt = excluded.system_prompt",
        params![project.id, project.user_id, project.name, project.system_prompt],
    )?;
    Ok(())
}

pub fn upsert_chat(conn: &rusqlite::Connection, chat: &ChatRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO chats (id, project_id, user_id, title, system_prompt) VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT(id) DO UPDATE SET project_id = excluded.project_id, user_id = excluded.user_id, \
         title = excluded.title, system_prompt = excluded.system_prompt",
        params![
            chat.id,
            chat.project_id,
            chat.user_id,
            chat.title,
            chat.system_prompt
        ],
    )?;
    Ok(())
}

pub fn get_chat(conn: &rusqlite::Connection, chat_id: &str) -> Result<Option<ChatRecord>> {
    let chat = conn
        .query_row(
            "SELECT id, project_id, user_id, title, system_prompt FROM chats WHERE id = ?1",
            params![chat_id],
            |row| {
                Ok(ChatRecord {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    user_id: row.get(2)?,
                    title: row.get(3)?,
                    system_prompt: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(chat)
}

pub fn get_project(conn: &rusqlite::Connection, project_id: &str) -> Result<Option<ProjectRecord>> {
    let project = conn
        .query_row(
            "SELECT id, user_id, name, system_prompt FROM projects WHERE id = ?1",
            params![project_id],
            |row| {
                Ok(ProjectRecord {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    system_prompt: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(project)
}
