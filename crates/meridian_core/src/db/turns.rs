//! Turn rows (turns table).

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::error::{CoreError, Result};
use crate::turn::{Failure, RequestParams, TokenUsage, Turn, TurnId};

const SELECT_TURN: &str = "SELECT id, chat_id, prev_turn_id, role, params, system_prompt, status, \
     failure_reason, error, stop_reason, input_tokens, output_tokens, context_tokens, created_at, completed_at \
     FROM turns";

/// Raw column values; parsed into a `Turn` outside the rusqlite row closure.
struct TurnRow {
    id: String,
    chat_id: String,
    prev_turn_id: Option<String>,
    role: String,
    params: Option<String>,
    system_prompt: Option<String>,
    status: String,
    failure_reason: Option<String>,
    error: Option<String>,
    stop_reason: Option<String>,
    input_tokens: i64,
    output_tokens: i64,
    context_tokens: i64,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TurnRow> {
    Ok(TurnRow {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        prev_turn_id: row.get(2)?,
        role: row.get(3)?,
        params: row.get(4)?,
        system_prompt: row.get(5)?,
        status: row.get(6)?,
        failure_reason: row.get(7)?,
        error: row.get(8)?,
        stop_reason: row.get(9)?,
        input_tokens: row.get(10)?,
        output_tokens: row.get(11)?,
        context_tokens: row.get(12)?,
        created_at: row.get(13)?,
        completed_at: row.get(14)?,
    })
}

impl TryFrom<TurnRow> for Turn {
    type Error = CoreError;

    fn try_from(row: TurnRow) -> Result<Self> {
        let params = row
            .params
            .as_deref()
            .map(serde_json::from_str::<RequestParams>)
            .transpose()?;
        let failure = match row.failure_reason {
            Some(reason) => Some(Failure {
                reason: reason.parse()?,
                message: row.error.unwrap_or_default(),
            }),
            None => None,
        };
        Ok(Turn {
            id: TurnId(row.id),
            chat_id: row.chat_id,
            prev_turn_id: row.prev_turn_id.map(TurnId),
            role: row.role.parse()?,
            params,
            system_prompt: row.system_prompt,
            status: row.status.parse()?,
            failure,
            stop_reason: row.stop_reason,
            usage: TokenUsage::new(row.input_tokens.max(0) as u64, row.output_tokens.max(0) as u64),
            context_tokens: row.context_tokens.max(0) as u64,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

fn params_json(turn: &Turn) -> Result<Option<String>> {
    Ok(turn.params.as_ref().map(serde_json::to_string).transpose()?)
}

pub fn insert(conn: &rusqlite::Connection, turn: &Turn) -> Result<()> {
    if let Some(prev) = &turn.prev_turn_id {
        let parent_chat: Option<String> = conn
            .query_row(
                "SELECT chat_id FROM turns WHERE id = ?1",
                params![prev.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match parent_chat {
            None => return Err(CoreError::NotFound(format!("parent turn {prev}"))),
            Some(chat) if chat != turn.chat_id => {
                return Err(CoreError::InvalidTurn(format!(
                    "parent turn {prev} belongs to chat {chat}, not {}",
                    turn.chat_id
                )));
            }
            Some(_) => {}
        }
    }

    conn.execute(
        "INSERT INTO turns (id, chat_id, prev_turn_id, role, params, system_prompt, status, \
         failure_reason, error, stop_reason, input_tokens, output_tokens, context_tokens, created_at, completed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            turn.id.as_str(),
            turn.chat_id,
            turn.prev_turn_id.as_ref().map(|p| p.as_str()),
            turn.role.as_str(),
            params_json(turn)?,
            turn.system_prompt,
            turn.status.as_str(),
            turn.failure.as_ref().map(|f| f.reason.as_str()),
            turn.failure.as_ref().map(|f| f.message.as_str()),
            turn.stop_reason,
            turn.usage.input_tokens as i64,
            turn.usage.output_tokens as i64,
            turn.context_tokens as i64,
            turn.created_at,
            turn.completed_at,
        ],
    )?;
    Ok(())
}

pub fn update(conn: &rusqlite::Connection, turn: &Turn) -> Result<()> {
    let n = conn.execute(
        "UPDATE turns SET system_prompt = ?1, status = ?2, failure_reason = ?3, error = ?4, \
         stop_reason = ?5, input_tokens = ?6, output_tokens = ?7, context_tokens = ?8, \
         completed_at = ?9 WHERE id = ?10",
        params![
            turn.system_prompt,
            turn.status.as_str(),
            turn.failure.as_ref().map(|f| f.reason.as_str()),
            turn.failure.as_ref().map(|f| f.message.as_str()),
            turn.stop_reason,
            turn.usage.input_tokens as i64,
            turn.usage.output_tokens as i64,
            turn.context_tokens as i64,
            turn.completed_at,
            turn.id.as_str(),
        ],
    )?;
    if n == 0 {
        return Err(CoreError::NotFound(format!("turn {}", turn.id)));
    }
    Ok(())
}

pub fn get(conn: &rusqlite::Connection, turn_id: &TurnId) -> Result<Option<Turn>> {
    let row = conn
        .query_row(
            &format!("{SELECT_TURN} WHERE id = ?1"),
            params![turn_id.as_str()],
            read_row,
        )
        .optional()?;
    row.map(Turn::try_from).transpose()
}

pub fn list_for_chat(conn: &rusqlite::Connection, chat_id: &str) -> Result<Vec<Turn>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_TURN} WHERE chat_id = ?1 ORDER BY created_at, rowid"
    ))?;
    let rows = stmt.query_map(params![chat_id], read_row)?;
    let rows: Vec<TurnRow> = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(Turn::try_from).collect()
}

/// Walks `prev_turn_id` links from `turn_id`; returns oldest first.
pub fn path(conn: &rusqlite::Connection, turn_id: &TurnId) -> Result<Vec<Turn>> {
    let mut out = Vec::new();
    let mut next = Some(turn_id.clone());
    while let Some(id) = next {
        let turn = get(conn, &id)?.ok_or_else(|| CoreError::NotFound(format!("turn {id}")))?;
        next = turn.prev_turn_id.clone();
        out.push(turn);
    }
    out.reverse();
    Ok(out)
}
