//! Durable block log with a bounded in-memory tail per running turn.
//!
//! Reads go to the buffer first and fall back to the durable store. Blocks
//! are immutable, so buffered copies never need invalidation, only eviction.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use meridian_core::{Block, BlockPayload, CoreError, TurnId, TurnStatus, TurnStore};
use meridian_observability::storage_span;
use parking_lot::Mutex;
use tracing::Instrument;

use crate::error::{Result, RuntimeError};

#[derive(Debug)]
struct TurnBuffer {
    /// Highest sequence written durably.
    last_sequence: u64,
    blocks: VecDeque<Block>,
    sealed: Option<TurnStatus>,
}

impl TurnBuffer {
    fn first_buffered(&self) -> Option<u64> {
        self.blocks.front().map(|b| b.sequence)
    }
}

pub struct BlockLog {
    store: Arc<dyn TurnStore>,
    capacity: usize,
    buffers: Mutex<HashMap<TurnId, Arc<Mutex<TurnBuffer>>>>,
}

impl BlockLog {
    pub fn new(store: Arc<dyn TurnStore>, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
            buffers: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn TurnStore> {
        &self.store
    }

    async fn buffer(&self, turn_id: &TurnId) -> Result<Arc<Mutex<TurnBuffer>>> {
        let existing = self.buffers.lock().get(turn_id).cloned();
        if let Some(buffer) = existing {
            return Ok(buffer);
        }

        let last_sequence = run_store(&self.store, turn_id, "last_sequence", |store, id| {
            store.last_sequence(id)
        })
        .await?;

        let mut buffers = self.buffers.lock();
        let buffer = buffers.entry(turn_id.clone()).or_insert_with(|| {
            Arc::new(Mutex::new(TurnBuffer {
                last_sequence,
                blocks: VecDeque::new(),
                sealed: None,
            }))
        });
        Ok(Arc::clone(buffer))
    }

    /// Append the next block for `turn_id`.
    ///
    /// The sequence is assigned here; the block is durable before it is
    /// buffered or returned. Callers must be the turn's single writer.
    pub async fn append(&self, turn_id: &TurnId, payload: BlockPayload) -> Result<Block> {
        let buffer = self.buffer(turn_id).await?;
        let sequence = {
            let state = buffer.lock();
            if let Some(status) = state.sealed {
                return Err(RuntimeError::Storage(format!(
                    "block log for turn {turn_id} is sealed ({status})"
                )));
            }
            state.last_sequence + 1
        };

        let block = Block::new(turn_id.clone(), sequence, payload);
        let durable = block.clone();
        run_store(&self.store, turn_id, "append_block", move |store, _| {
            store.append_block(&durable)
        })
        .await?;

        let mut state = buffer.lock();
        state.last_sequence = sequence;
        state.blocks.push_back(block.clone());
        while state.blocks.len() > self.capacity {
            state.blocks.pop_front();
        }
        Ok(block)
    }

    /// Refuse further appends. The buffer stays readable until `forget`.
    pub fn seal(&self, turn_id: &TurnId, outcome: TurnStatus) {
        if let Some(buffer) = self.buffers.lock().get(turn_id) {
            buffer.lock().sealed = Some(outcome);
        }
    }

    pub fn sealed_status(&self, turn_id: &TurnId) -> Option<TurnStatus> {
        self.buffers
            .lock()
            .get(turn_id)
            .and_then(|buffer| buffer.lock().sealed)
    }

    /// Highest committed sequence, from the buffer when present.
    pub async fn last_sequence(&self, turn_id: &TurnId) -> Result<u64> {
        let buffered = self
            .buffers
            .lock()
            .get(turn_id)
            .map(|buffer| buffer.lock().last_sequence);
        if let Some(last_sequence) = buffered {
            return Ok(last_sequence);
        }
        run_store(&self.store, turn_id, "last_sequence", |store, id| store.last_sequence(id)).await
    }

    /// Blocks with `sequence > after`, ascending.
    ///
    /// Served from memory when `after + 1` is still buffered, otherwise from
    /// the durable store.
    pub async fn replay(&self, turn_id: &TurnId, after: u64) -> Result<Vec<Block>> {
        let buffer = self.buffers.lock().get(turn_id).cloned();
        if let Some(buffer) = buffer {
            let state = buffer.lock();
            if after >= state.last_sequence {
                return Ok(Vec::new());
            }
            if state.first_buffered().is_some_and(|first| first <= after + 1) {
                return Ok(state
                    .blocks
                    .iter()
                    .filter(|block| block.sequence > after)
                    .cloned()
                    .collect());
            }
        }

        run_store(&self.store, turn_id, "blocks_after", move |store, id| {
            store.blocks_after(id, after)
        })
        .await
    }

    /// Drop the in-memory tail; later reads use the durable store.
    pub fn forget(&self, turn_id: &TurnId) {
        self.buffers.lock().remove(turn_id);
    }

    pub fn buffered_turns(&self) -> usize {
        self.buffers.lock().len()
    }
}

/// Run a synchronous store call on the blocking pool.
pub(crate) async fn run_store<T, F>(store: &Arc<dyn TurnStore>, turn_id: &TurnId, operation: &'static str, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn TurnStore, &TurnId) -> meridian_core::Result<T> + Send + 'static,
{
    let store = Arc::clone(store);
    let id = turn_id.clone();
    let span = storage_span!("turn_store", operation, turn_id);
    tokio::task::spawn_blocking(move || f(store.as_ref(), &id))
        .instrument(span)
        .await
        .map_err(|e| RuntimeError::Storage(format!("{operation} task failed: {e}")))?
        .map_err(|e| match e {
            CoreError::NotFound(what) => RuntimeError::NotFound(what),
            other => RuntimeError::Storage(other.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{RequestParams, SqliteStore, Turn};

    fn log_with_turn(capacity: usize) -> (BlockLog, TurnId) {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = Turn::user("chat-1", None);
        let assistant = Turn::assistant("chat-1", user.id.clone(), RequestParams::new("lorem", "lorem-fast"));
        store.insert_turn(&user).unwrap();
        store.insert_turn(&assistant).unwrap();
        let id = assistant.id.clone();
        (BlockLog::new(Arc::new(store), capacity), id)
    }

    #[tokio::test]
    async fn test_append_assigns_gapless_sequences() {
        let (log, id) = log_with_turn(8);
        for i in 1..=3 {
            let block = log.append(&id, BlockPayload::text(format!("part {i}"))).await.unwrap();
            assert_eq!(block.sequence, i);
        }
        assert_eq!(log.last_sequence(&id).await.unwrap(), 3);
        assert_eq!(log.store().last_sequence(&id).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_replay_from_buffer_and_durable_fallback() {
        let (log, id) = log_with_turn(2);
        for i in 1..=5 {
            log.append(&id, BlockPayload::text(format!("part {i}"))).await.unwrap();
        }

        // 4 and 5 are buffered
        let tail = log.replay(&id, 3).await.unwrap();
        assert_eq!(tail.iter().map(|b| b.sequence).collect::<Vec<_>>(), vec![4, 5]);

        // 2.. has been evicted, read durably
        let all = log.replay(&id, 1).await.unwrap();
        assert_eq!(all.iter().map(|b| b.sequence).collect::<Vec<_>>(), vec![2, 3, 4, 5]);

        assert!(log.replay(&id, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replay_after_forget_matches_live_log() {
        let (log, id) = log_with_turn(16);
        for i in 1..=4 {
            log.append(&id, BlockPayload::text(format!("part {i}"))).await.unwrap();
        }
        let live = log.replay(&id, 0).await.unwrap();
        log.forget(&id);
        assert_eq!(log.buffered_turns(), 0);
        let durable = log.replay(&id, 0).await.unwrap();
        assert_eq!(live, durable);
    }

    #[tokio::test]
    async fn test_sealed_log_rejects_appends() {
        let (log, id) = log_with_turn(4);
        log.append(&id, BlockPayload::text("done")).await.unwrap();
        log.seal(&id, TurnStatus::Complete);
        assert_eq!(log.sealed_status(&id), Some(TurnStatus::Complete));
        let err = log.append(&id, BlockPayload::text("late")).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Storage(_)));
    }

    #[tokio::test]
    async fn test_append_to_unknown_turn_is_not_found() {
        let (log, _id) = log_with_turn(4);
        let err = log
            .append(&TurnId::from("missing"), BlockPayload::text("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::NotFound(_)));
    }
}
