use crate::tests::fixtures::{runtime, workspace};
use crate::tools::{DocSearch, DocSearchArgs, Tool};
use serde_json::json;

#[test]
fn test_doc_search_args_defaults() {
    let args: DocSearchArgs = serde_json::from_value(json!({"query": "aria"})).unwrap();
    assert_eq!(args.limit, 20);
    assert!(args.folder.is_none());
}

#[test]
fn test_doc_search_ranks_by_occurrences() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocSearch::new(store);
        let result = tool.execute(json!({"query": "ARIA"})).await.unwrap();

        assert_eq!(result["total_count"], 4);
        assert_eq!(result["has_more"], false);
        assert_eq!(result["limit"], 20);
        // chapter-2 mentions Aria twice; the rest tie and sort by path
        let paths: Vec<&str> = result["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["path"].as_str().unwrap())
            .collect();
        assert_eq!(
            paths,
            vec!["/drafts/chapter-2", "/drafts/chapter-1", "/notes/characters", "/outline"]
        );
        assert_eq!(result["results"][0]["score"], 2.0);
    });
}

#[test]
fn test_doc_search_name_match_scores_higher() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocSearch::new(store);
        let result = tool.execute(json!({"query": "outline"})).await.unwrap();

        assert_eq!(result["total_count"], 1);
        assert_eq!(result["results"][0]["name"], "outline");
        assert_eq!(result["results"][0]["score"], 2.0);
    });
}

#[test]
fn test_doc_search_folder_scope_and_limit() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocSearch::new(store);
        let result = tool
            .execute(json!({"query": "aria", "folder": "/drafts", "limit": 1}))
            .await
            .unwrap();

        assert_eq!(result["total_count"], 2);
        assert_eq!(result["has_more"], true);
        assert_eq!(result["results"].as_array().unwrap().len(), 1);
        assert_eq!(result["results"][0]["path"], "/drafts/chapter-2");
    });
}

#[test]
fn test_doc_search_preview_contains_match() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocSearch::new(store);
        let result = tool.execute(json!({"query": "storm"})).await.unwrap();

        assert_eq!(result["results"][0]["preview"], "The storm arrived.");
    });
}

#[test]
fn test_doc_search_empty_query() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocSearch::new(store);
        let err = tool.execute(json!({"query": "   "})).await.unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    });
}

#[test]
fn test_doc_search_no_results() {
    let rt = runtime();
    rt.block_on(async {
        let (_dir, store) = workspace();
        let tool = DocSearch::new(store);
        let result = tool.execute(json!({"query": "zeppelin"})).await.unwrap();
        assert_eq!(result["results"], json!([]));
        assert_eq!(result["total_count"], 0);
    });
}
