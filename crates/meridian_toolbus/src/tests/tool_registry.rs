use crate::tests::fixtures::{runtime, workspace};
use crate::{Tool, ToolRegistry};
use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct EchoTool {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Echo the input back"
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "input": {"type": "string"}
            },
            "required": ["input"]
        })
    }

    async fn execute(&self, args: JsonValue) -> crate::ToolResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"echo": args["input"]}))
    }
}

fn echo_registry() -> (ToolRegistry, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    registry.register(EchoTool {
        calls: Arc::clone(&calls),
    });
    (registry, calls)
}

#[test]
fn test_registry_call_registered_tool() {
    let rt = runtime();
    rt.block_on(async {
        let (registry, calls) = echo_registry();
        let (result, duration_ms) = registry
            .call("echo", json!({"input": "hello"}))
            .await
            .unwrap();

        assert_eq!(result["echo"], "hello");
        assert!(duration_ms < 10_000);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn test_registry_call_unknown_tool() {
    let rt = runtime();
    rt.block_on(async {
        let (registry, _) = echo_registry();
        let err = registry.call("nonexistent", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("Tool not found: nonexistent"));
    });
}

#[test]
fn test_registry_rejects_invalid_arguments_before_dispatch() {
    let rt = runtime();
    rt.block_on(async {
        let (registry, calls) = echo_registry();

        let err = registry.call("echo", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("Invalid arguments for tool 'echo'"));

        let err = registry
            .call("echo", json!({"input": 42}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid arguments for tool 'echo'"));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    });
}

#[test]
fn test_registry_list_tools_sorted() {
    let (_dir, store) = workspace();
    let registry = ToolRegistry::builder().with_document_tools(store).build();
    let names: Vec<String> = registry.list_tools().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["doc_edit", "doc_search", "doc_tree", "doc_view"]);

    for tool in registry.list_tools() {
        assert!(!tool.description.is_empty());
        assert_eq!(tool.parameters["type"], "object");
    }
}

#[test]
fn test_registry_definitions_filters_and_dedups() {
    let (_dir, store) = workspace();
    let registry = ToolRegistry::builder().with_document_tools(store).build();

    let requested = vec![
        "doc_view".to_string(),
        "missing".to_string(),
        "doc_search".to_string(),
        "doc_view".to_string(),
    ];
    let names: Vec<String> = registry
        .definitions(Some(&requested))
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["doc_view", "doc_search"]);

    assert_eq!(registry.definitions(None).len(), 4);
    assert!(registry.definitions(Some(&[])).is_empty());
}

#[test]
fn test_registry_register_overwrites_existing() {
    struct Replacement;

    #[async_trait]
    impl Tool for Replacement {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Replacement"
        }

        fn parameters_schema(&self) -> JsonValue {
            json!({"type": "object"})
        }

        async fn execute(&self, _args: JsonValue) -> crate::ToolResult {
            Ok(json!({"replaced": true}))
        }
    }

    let rt = runtime();
    rt.block_on(async {
        let (mut registry, _) = echo_registry();
        registry.register(Replacement);

        assert_eq!(registry.list_tools().len(), 1);
        let (result, _) = registry.call("echo", json!({})).await.unwrap();
        assert_eq!(result["replaced"], true);
    });
}

#[test]
fn test_registry_contains() {
    let (registry, _) = echo_registry();
    assert!(registry.contains("echo"));
    assert!(!registry.contains("doc_view"));
}
