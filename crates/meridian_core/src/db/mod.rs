//! SQLite persistence under `.meridian/`.
//!
//! - `meridian.db` + WAL: turns, the per-turn block log, chats and projects.
//! - `logs/`: directory for log files.
//! - `env`: optional dotenv file read by the binary at startup.

mod blocks;
mod chats;
mod connection;
mod layout;
mod migrations;
mod sqlite_store;
mod turns;

pub use connection::{open_db_file, open_in_memory};
pub use layout::{ensure_meridian_dir, ensure_meridian_dir_at, ENV_FILE, LOGS_DIR, MERIDIAN_DB, MERIDIAN_DIR};
pub use migrations::run_all as run_migrations;
pub use sqlite_store::SqliteStore;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockPayload};
    use crate::chat::{ChatDirectory, ChatRecord, ProjectRecord};
    use crate::error::CoreError;
    use crate::status::{FailureReason, TurnStatus};
    use crate::store::TurnStore;
    use crate::turn::{RequestParams, Turn, TurnId};
    use serde_json::json;

    fn store_with_chat() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_project(&ProjectRecord::new("p-1", "u-1", "Novel").with_system_prompt("Project notes"))
            .unwrap();
        store
            .upsert_chat(&ChatRecord::new("c-1", "p-1", "u-1", "Chapter one"))
            .unwrap();
        store
    }

    fn seed_turns(store: &SqliteStore) -> (Turn, Turn) {
        let user = Turn::user("c-1", None);
        store.insert_turn(&user).unwrap();
        let assistant = Turn::assistant("c-1", user.id.clone(), RequestParams::new("lorem", "lorem-fast"));
        store.insert_turn(&assistant).unwrap();
        (user, assistant)
    }

    #[test]
    fn ensure_meridian_dir_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path();
        let db_path = ensure_meridian_dir(repo).unwrap();
        assert_eq!(db_path, repo.join(MERIDIAN_DIR).join(MERIDIAN_DB));
        assert!(repo.join(MERIDIAN_DIR).is_dir());
        assert!(repo.join(MERIDIAN_DIR).join(LOGS_DIR).is_dir());
    }

    #[test]
    fn test_open_db_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("meridian.db");
        let store = SqliteStore::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.get_chat("missing").unwrap().is_none());
    }

    #[test]
    fn test_turn_round_trip() {
        let store = store_with_chat();
        let (user, mut assistant) = seed_turns(&store);

        let loaded = store.get_turn(&assistant.id).unwrap().unwrap();
        assert_eq!(loaded.status, TurnStatus::Pending);
        assert_eq!(loaded.prev_turn_id, Some(user.id.clone()));
        assert_eq!(loaded.model(), Some("lorem-fast"));

        assistant.transition(TurnStatus::Composing).unwrap();
        assistant.system_prompt = Some("be brief".to_string());
        assistant.fail(FailureReason::Transport, "connection refused").unwrap();
        assistant.usage.input_tokens = 40;
        assistant.context_tokens = 25;
        store.update_turn(&assistant).unwrap();

        let loaded = store.get_turn(&assistant.id).unwrap().unwrap();
        assert_eq!(loaded.status, TurnStatus::Failed);
        assert_eq!(loaded.system_prompt.as_deref(), Some("be brief"));
        let failure = loaded.failure.unwrap();
        assert_eq!(failure.reason, FailureReason::Transport);
        assert_eq!(failure.message, "connection refused");
        assert_eq!(loaded.usage.input_tokens, 40);
        assert_eq!(loaded.context_tokens, 25);
        assert!(loaded.completed_at.is_some());
    }

    #[test]
    fn test_parent_must_be_in_same_chat() {
        let store = store_with_chat();
        let (user, _) = seed_turns(&store);
        let stray = Turn::assistant("c-2", user.id.clone(), RequestParams::new("lorem", "lorem-fast"));
        let err = store.insert_turn(&stray).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTurn(_)));

        let orphan = Turn::assistant("c-1", TurnId::from("nope"), RequestParams::new("lorem", "lorem-fast"));
        let err = store.insert_turn(&orphan).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn test_update_unknown_turn_is_not_found() {
        let store = store_with_chat();
        let turn = Turn::user("c-1", None);
        assert!(matches!(store.update_turn(&turn), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_append_enforces_gapless_sequence() {
        let store = store_with_chat();
        let (_, assistant) = seed_turns(&store);
        let id = assistant.id.clone();

        store
            .append_block(&Block::new(id.clone(), 1, BlockPayload::text("one")))
            .unwrap();
        let err = store
            .append_block(&Block::new(id.clone(), 3, BlockPayload::text("three")))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::SequenceGap {
                expected: 2,
                actual: 3,
                ..
            }
        ));
        let dup = store
            .append_block(&Block::new(id.clone(), 1, BlockPayload::text("again")))
            .unwrap_err();
        assert!(matches!(dup, CoreError::SequenceGap { .. }));
        assert_eq!(store.last_sequence(&id).unwrap(), 1);
    }

    #[test]
    fn test_append_to_unknown_turn_is_not_found() {
        let store = store_with_chat();
        let err = store
            .append_block(&Block::new(TurnId::from("ghost"), 1, BlockPayload::text("x")))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn test_tool_result_requires_prior_tool_use() {
        let store = store_with_chat();
        let (_, assistant) = seed_turns(&store);
        let id = assistant.id.clone();

        let orphan = BlockPayload::ToolResult {
            tool_use_id: "call_1".to_string(),
            tool_name: "doc_search".to_string(),
            result: json!({"results": []}),
            is_error: false,
            duration_ms: 3,
        };
        let err = store
            .append_block(&Block::new(id.clone(), 1, orphan.clone()))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTurn(_)));

        store
            .append_block(&Block::new(
                id.clone(),
                1,
                BlockPayload::tool_use("call_1", "doc_search", json!({"query": "Aria"})),
            ))
            .unwrap();
        store.append_block(&Block::new(id.clone(), 2, orphan)).unwrap();
        assert_eq!(store.last_sequence(&id).unwrap(), 2);
    }

    #[test]
    fn test_blocks_after_is_ordered() {
        let store = store_with_chat();
        let (_, assistant) = seed_turns(&store);
        let id = assistant.id.clone();
        for (seq, text) in ["a", "b", "c", "d"].iter().enumerate() {
            store
                .append_block(&Block::new(id.clone(), seq as u64 + 1, BlockPayload::text(*text)))
                .unwrap();
        }

        let all = store.blocks_after(&id, 0).unwrap();
        assert_eq!(all.iter().map(|b| b.sequence).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        let tail = store.blocks_after(&id, 2).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].payload.text_content(), Some("c"));
        assert!(store.blocks_after(&id, 4).unwrap().is_empty());
    }

    #[test]
    fn test_turn_path_and_chat_turns() {
        let store = store_with_chat();
        let (user, assistant) = seed_turns(&store);
        let follow_up = Turn::user("c-1", Some(assistant.id.clone()));
        store.insert_turn(&follow_up).unwrap();

        let path = store.turn_path(&follow_up.id).unwrap();
        let ids: Vec<_> = path.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![user.id.clone(), assistant.id.clone(), follow_up.id.clone()]);

        // A sibling branch shares the ancestry but not the other branch.
        let sibling = Turn::user("c-1", Some(assistant.id.clone()));
        store.insert_turn(&sibling).unwrap();
        let path = store.turn_path(&sibling.id).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[2].id, sibling.id);

        assert_eq!(store.chat_turns("c-1").unwrap().len(), 4);
        assert!(store.chat_turns("c-2").unwrap().is_empty());
    }

    #[test]
    fn test_chat_directory_lookup() {
        let store = store_with_chat();
        let chat = store.get_chat("c-1").unwrap().unwrap();
        assert_eq!(chat.project_id, "p-1");
        let project = store.get_project(&chat.project_id).unwrap().unwrap();
        assert_eq!(project.user_id, "u-1");
        assert_eq!(project.system_prompt.as_deref(), Some("Project notes"));
        assert!(store.get_project("p-9").unwrap().is_none());
    }
}
