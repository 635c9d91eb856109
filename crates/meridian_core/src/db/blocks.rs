//! Block log rows (turn_blocks table).

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::block::{Block, BlockPayload};
use crate::error::{CoreError, Result};
use crate::turn::TurnId;

pub fn last_sequence(conn: &rusqlite::Connection, turn_id: &TurnId) -> Result<u64> {
    let last: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sequence), 0) FROM turn_blocks WHERE turn_id = ?1",
        params![turn_id.as_str()],
        |row| row.get(0),
    )?;
    Ok(last.max(0) as u64)
}

/// Appends one block inside a transaction, enforcing gapless sequences and
/// tool-result pairing.
pub fn append(conn: &mut rusqlite::Connection, block: &Block) -> Result<()> {
    let tx = conn.transaction()?;

    let turn_exists: Option<i64> = tx
        .query_row(
            "SELECT 1 FROM turns WHERE id = ?1",
            params![block.turn_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    if turn_exists.is_none() {
        return Err(CoreError::NotFound(format!("turn {}", block.turn_id)));
    }

    let expected = last_sequence(&tx, &block.turn_id)? + 1;
    if block.sequence != expected {
        return Err(CoreError::SequenceGap {
            turn_id: block.turn_id.to_string(),
            expected,
            actual: block.sequence,
        });
    }

    if let BlockPayload::ToolResult { tool_use_id, .. } = &block.payload {
        let paired: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM turn_blocks WHERE turn_id = ?1 AND kind = 'tool_use' AND tool_use_id = ?2",
                params![block.turn_id.as_str(), tool_use_id],
                |row| row.get(0),
            )
            .optional()?;
        if paired.is_none() {
            return Err(CoreError::InvalidTurn(format!(
                "tool result {tool_use_id} has no matching tool use"
            )));
        }
    }

    tx.execute(
        "INSERT INTO turn_blocks (id, turn_id, sequence, kind, tool_use_id, payload, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            block.id,
            block.turn_id.as_str(),
            block.sequence as i64,
            block.kind().as_str(),
            block.payload.tool_use_id(),
            serde_json::to_string(&block.payload)?,
            block.created_at,
        ],
    )?;
    tx.commit()?;
    Ok(())
}

pub fn after(conn: &rusqlite::Connection, turn_id: &TurnId, after: u64) -> Result<Vec<Block>> {
    let mut stmt = conn.prepare(
        "SELECT id, sequence, payload, created_at FROM turn_blocks \
         WHERE turn_id = ?1 AND sequence > ?2 ORDER BY sequence",
    )?;
    let rows = stmt.query_map(params![turn_id.as_str(), after as i64], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, DateTime<Utc>>(3)?,
        ))
    })?;

    let mut blocks = Vec::new();
    for row in rows {
        let (id, sequence, payload, created_at) = row?;
        blocks.push(Block {
            id,
            turn_id: turn_id.clone(),
            sequence: sequence.max(0) as u64,
            payload: serde_json::from_str(&payload)?,
            created_at,
        });
    }
    Ok(blocks)
}
