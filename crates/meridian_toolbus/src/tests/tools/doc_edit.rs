use crate::tests::fixtures::{runtime, workspace};
use crate::tools::{DocEdit, DocEditArgs, EditCommand, Tool};
use serde_json::json;

#[test]
fn test_doc_edit_args_parsing() {
    let args: DocEditArgs = serde_json::from_value(json!({
        "command": "str_replace",
        "path": "/outline",
        "old_str": "Three",
        "new_str": "Four"
    }))
    .unwrap();
    assert_eq!(args.command, EditCommand::StrReplace);
    assert_eq!(args.old_str.as_deref(), Some("Three"));
    assert!(args.insert_line.is_none());

    let bad = serde_json::from_value::<DocEditArgs>(json!({"command": "delete", "path": "/a"}));
    assert!(bad.is_err());
}

#[test]
fn test_doc_edit_str_replace() {
    let rt = runtime();
    rt.block_on(async {
        let (dir, store) = workspace();
        let tool = DocEdit::new(store);
        let result = tool
            .execute(json!({
                "command": "str_replace",
                "path": "/outline",
                "old_str": "Three acts.",
                "new_str": "Four acts."
            }))
            .await
            .unwrap();

        assert_eq!(result["success"], true);
        assert_eq!(result["path"], "/outline");
        let content = std::fs::read_to_string(dir.path().join("outline")).unwrap();
        assert_eq!(content, "Four acts. Aria leaves the harbor.");
    });
}

#[test]
fn test_doc_edit_str_replace_ambiguous() {
    let rt = runtime();
    rt.block_on(async {
        let (dir, store) = workspace();
        let tool = DocEdit::new(store);
        let result = tool
            .execute(json!({
                "command": "str_replace",
                "path": "/drafts/chapter-2",
                "old_str": "Aria",
                "new_str": "Mira"
            }))
            .await
            .unwrap();

        assert_eq!(result["success"], false);
        assert_eq!(result["error_code"], "AMBIGUOUS_MATCH");
        let content = std::fs::read_to_string(dir.path().join("drafts/chapter-2")).unwrap();
        assert!(content.contains("Aria waited"));
    });
}

#[test]
fn test_doc_edit_str_replace_no_match() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocEdit::new(store);
        let result = tool
            .execute(json!({
                "command": "str_replace",
                "path": "/outline",
                "old_str": "Five acts",
                "new_str": "Six acts"
            }))
            .await
            .unwrap();
        assert_eq!(result["error_code"], "NO_MATCH");
    });
}

#[test]
fn test_doc_edit_missing_document() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocEdit::new(store);
        let result = tool
            .execute(json!({"command": "append", "path": "/ghost", "new_str": "boo"}))
            .await
            .unwrap();
        assert_eq!(result["success"], false);
        assert_eq!(result["error_code"], "DOC_NOT_FOUND");
        assert!(result["message"].as_str().unwrap().contains("/ghost"));
    });
}

#[test]
fn test_doc_edit_insert_line() {
    let rt = runtime();
    rt.block_on(async {
        let (dir, store) = workspace();
        let tool = DocEdit::new(store);
        let result = tool
            .execute(json!({
                "command": "insert",
                "path": "/drafts/chapter-1",
                "insert_line": 1,
                "new_str": "Gulls circled."
            }))
            .await
            .unwrap();
        assert_eq!(result["success"], true);

        let content = std::fs::read_to_string(dir.path().join("drafts/chapter-1")).unwrap();
        assert_eq!(
            content,
            "The harbor was quiet.\nGulls circled.\nAria counted the boats.\nNobody came.\n"
        );

        let result = tool
            .execute(json!({
                "command": "insert",
                "path": "/drafts/chapter-1",
                "insert_line": 40,
                "new_str": "x"
            }))
            .await
            .unwrap();
        assert_eq!(result["error_code"], "INVALID_LINE");
    });
}

#[test]
fn test_doc_edit_append() {
    let rt = runtime();
    rt.block_on(async {
        let (dir, store) = workspace();
        let tool = DocEdit::new(store);
        tool.execute(json!({
            "command": "append",
            "path": "/drafts/act-2/chapter-3",
            "new_str": "Then silence."
        }))
        .await
        .unwrap();

        let content = std::fs::read_to_string(dir.path().join("drafts/act-2/chapter-3")).unwrap();
        assert_eq!(content, "The storm arrived.\nThen silence.");
    });
}

#[test]
fn test_doc_edit_create() {
    let rt = runtime();
    rt.block_on(async {
        let (dir, store) = workspace();
        let tool = DocEdit::new(store);
        let result = tool
            .execute(json!({
                "command": "create",
                "path": "/drafts/act-3/chapter-4",
                "file_text": "Morning."
            }))
            .await
            .unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("drafts/act-3/chapter-4")).unwrap(),
            "Morning."
        );

        let result = tool
            .execute(json!({"command": "create", "path": "/outline", "file_text": "x"}))
            .await
            .unwrap();
        assert_eq!(result["error_code"], "ALREADY_EXISTS");
    });
}

#[test]
fn test_doc_edit_missing_argument() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocEdit::new(store);
        let result = tool
            .execute(json!({"command": "str_replace", "path": "/outline"}))
            .await
            .unwrap();
        assert_eq!(result["error_code"], "MISSING_ARGUMENT");
    });
}
