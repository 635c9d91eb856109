use crate::tools::{SearchTopic, TavilyClient, Tool, WebSearch, WebSearchArgs};
use serde_json::json;

#[test]
fn test_web_search_args_defaults() {
    let args: WebSearchArgs = serde_json::from_value(json!({"query": "lighthouses"})).unwrap();
    assert_eq!(args.max_results, 5);
    assert!(args.topic.is_none());

    let args: WebSearchArgs =
        serde_json::from_value(json!({"query": "q", "max_results": 99, "topic": "news"})).unwrap();
    assert_eq!(args.effective_max_results(), 20);
    assert_eq!(args.topic, Some(SearchTopic::News));
}

#[tokio::test]
async fn test_web_search_maps_results() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/search")
        .match_body(mockito::Matcher::PartialJson(json!({
            "api_key": "tvly-test",
            "query": "lighthouse keepers",
            "max_results": 2,
            "topic": "general"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "query": "lighthouse keepers",
                "results": [
                    {
                        "title": "Keepers of the light",
                        "url": "https://example.org/keepers",
                        "content": "A history of lighthouse keepers.",
                        "score": 0.91,
                        "published_date": "2024-03-01"
                    },
                    {
                        "title": "Lighthouses",
                        "url": "https://example.org/lighthouses",
                        "content": "Towers with lamps."
                    }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = TavilyClient::new("tvly-test").with_base_url(format!("{}/search", server.url()));
    let tool = WebSearch::new(client);
    let result = tool
        .execute(json!({"query": "lighthouse keepers", "max_results": 2}))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result["result_count"], 2);
    assert_eq!(result["query"], "lighthouse keepers");
    assert_eq!(result["results"][0]["snippet"], "A history of lighthouse keepers.");
    assert_eq!(result["results"][0]["published_at"], "2024-03-01");
    assert!(result["results"][1].get("score").is_none());
}

#[tokio::test]
async fn test_web_search_api_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/search")
        .with_status(401)
        .with_body(r#"{"detail":{"error":"Unauthorized"}}"#)
        .create_async()
        .await;

    let client = TavilyClient::new("bad").with_base_url(format!("{}/search", server.url()));
    let err = WebSearch::new(client)
        .execute(json!({"query": "anything"}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Search API error (401)"));
}
