use crate::tests::fixtures::{runtime, workspace};
use crate::tools::{DocView, DocViewArgs, Tool};
use serde_json::json;

#[test]
fn test_doc_view_tool_name() {
    let (_dir, store) = workspace();
    let tool = DocView::new(store);
    assert_eq!(tool.name(), "doc_view");
    assert!(tool.description().contains("folder"));
}

#[test]
fn test_doc_view_args_parsing() {
    let args: DocViewArgs = serde_json::from_value(json!({"path": "/drafts"})).unwrap();
    assert_eq!(args.path, "/drafts");
}

#[test]
fn test_doc_view_document() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocView::new(store);
        let result = tool
            .execute(json!({"path": "drafts/chapter-1"}))
            .await
            .unwrap();

        assert_eq!(result["type"], "document");
        assert_eq!(result["name"], "chapter-1");
        assert_eq!(result["path"], "/drafts/chapter-1");
        assert_eq!(result["word_count"], 10);
        assert_eq!(result["was_truncated"], false);
        assert!(result["content"].as_str().unwrap().starts_with("The harbor"));
    });
}

#[test]
fn test_doc_view_folder_listing() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocView::new(store);
        let result = tool.execute(json!({"path": "/drafts/"})).await.unwrap();

        assert_eq!(result["type"], "folder");
        assert_eq!(result["path"], "/drafts");
        assert_eq!(result["folders"], json!([{"name": "act-2", "path": "/drafts/act-2"}]));
        let docs: Vec<&str> = result["documents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(docs, vec!["chapter-1", "chapter-2"]);
    });
}

#[test]
fn test_doc_view_root() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocView::new(store);
        let result = tool.execute(json!({"path": "/"})).await.unwrap();

        assert_eq!(result["type"], "folder");
        assert_eq!(result["folders"].as_array().unwrap().len(), 2);
        assert_eq!(result["documents"][0]["name"], "outline");
    });
}

#[test]
fn test_doc_view_missing_path() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocView::new(store);
        let err = tool
            .execute(json!({"path": "/drafts/chapter-9"}))
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("path not found: /drafts/chapter-9 (tried as both document and folder)"));
    });
}

#[test]
fn test_doc_view_truncates_large_document() {
    let rt = runtime();
    rt.block_on(async {
        let (dir, store) = workspace();
        std::fs::write(dir.path().join("big"), "word ".repeat(5_000)).unwrap();
        let tool = DocView::new(store);
        let result = tool.execute(json!({"path": "/big"})).await.unwrap();

        assert_eq!(result["was_truncated"], true);
        assert_eq!(result["word_count"], 5_000);
        assert!(result["content"]
            .as_str()
            .unwrap()
            .ends_with("[Content truncated - too large to display fully]"));
    });
}

#[test]
fn test_doc_view_rejects_escape() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocView::new(store);
        let err = tool
            .execute(json!({"path": "/../../etc/passwd"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("escapes the document root"));
    });
}
