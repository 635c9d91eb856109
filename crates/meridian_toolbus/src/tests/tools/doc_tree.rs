use crate::format::{FormatterRegistry, ResultFormatter, DocTreeFormatter};
use crate::tests::fixtures::{runtime, workspace};
use crate::tools::{DocTree, DocTreeArgs, Tool};
use serde_json::json;

#[test]
fn test_doc_tree_args_defaults_and_clamp() {
    let args: DocTreeArgs = serde_json::from_value(json!({})).unwrap();
    assert_eq!(args.folder, "/");
    assert_eq!(args.effective_depth(), 2);

    let args: DocTreeArgs = serde_json::from_value(json!({"depth": 12})).unwrap();
    assert_eq!(args.effective_depth(), 5);

    let args: DocTreeArgs = serde_json::from_value(json!({"depth": 0})).unwrap();
    assert_eq!(args.effective_depth(), 1);
}

#[test]
fn test_doc_tree_nested_structure() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocTree::new(store);
        let result = tool.execute(json!({})).await.unwrap();

        assert_eq!(result["type"], "tree");
        assert_eq!(result["path"], "/");
        assert_eq!(result["depth"], 2);
        assert_eq!(result["documents"], json!([{"name": "outline", "word_count": 6}]));

        let drafts = &result["folders"][0];
        assert_eq!(drafts["name"], "drafts");
        assert_eq!(drafts["documents"].as_array().unwrap().len(), 2);
        // depth 2 reaches act-2 but not its contents
        assert_eq!(drafts["folders"][0]["name"], "act-2");
        assert_eq!(drafts["folders"][0]["documents"], json!([]));
    });
}

#[test]
fn test_doc_tree_depth_limit() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocTree::new(store);
        let result = tool.execute(json!({"folder": "/drafts", "depth": 1})).await.unwrap();

        assert_eq!(result["path"], "/drafts");
        assert_eq!(result["folders"][0]["folders"], json!([]));
        assert_eq!(result["folders"][0]["documents"], json!([]));
    });
}

#[test]
fn test_doc_tree_missing_folder() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocTree::new(store);
        let err = tool.execute(json!({"folder": "/nope"})).await.unwrap_err();
        assert!(err.to_string().contains("folder not found: /nope"));
    });
}

#[test]
fn test_doc_tree_formatted_output() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocTree::new(store);
        let raw = tool.execute(json!({"depth": 3})).await.unwrap();

        let rendered = DocTreeFormatter::default().format(&raw);
        let expected = [
            "/ (root)",
            "├── drafts/",
            "│   ├── act-2/",
            "│   │   └── chapter-3 (3 words)",
            "│   ├── chapter-1 (10 words)",
            "│   └── chapter-2 (6 words)",
            "├── notes/",
            "│   └── characters (4 words)",
            "└── outline (6 words)",
        ]
        .join("\n");
        assert_eq!(rendered, json!(expected));

        let registry = FormatterRegistry::with_document_formatters();
        assert_eq!(registry.format("doc_tree", &raw), rendered);
    });
}
