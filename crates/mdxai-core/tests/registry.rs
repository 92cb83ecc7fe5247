use mdxai_core::{Registry, Specification};
use mdxai_schema::OutputShape;
use mdxai_test_utils::{functions_dir, test_config, write_spec, MockBackend};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[tokio::test]
async fn first_call_creates_default_specification() {
    let dir = functions_dir();
    let backend = Arc::new(MockBackend::new());
    let registry = Registry::new(backend.clone(), test_config(dir.path()));

    let result = registry.invoke("summarize", args(json!({"text": "long"}))).await;

    assert_eq!(result.into_value(), json!({"content": "generated"}));
    let text = std::fs::read_to_string(dir.path().join("summarize.md")).unwrap();
    let spec = Specification::parse("summarize", &text).unwrap();
    assert_eq!(spec.model, "test-model");
    assert_eq!(spec.system_prompt, "You are a helpful AI assistant.");
    assert_eq!(spec.compile().shape(), OutputShape::Object);
    assert_eq!(backend.structured_calls(), 1);
}

#[tokio::test]
async fn existing_specification_is_never_overwritten() {
    let dir = functions_dir();
    let custom = "---\nmodel: custom-model\nsystem: Custom.\n---\n";
    write_spec(dir.path(), "summarize", custom);
    let backend = Arc::new(MockBackend::new());
    let registry = Registry::new(backend.clone(), test_config(dir.path()));

    let _ = registry.invoke("summarize", Map::new()).await;
    let _ = registry.invoke("summarize", Map::new()).await;

    assert_eq!(std::fs::read_to_string(dir.path().join("summarize.md")).unwrap(), custom);
    let requests = backend.structured_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].model, "custom-model");
}

#[tokio::test]
async fn specification_is_reread_every_call() {
    let dir = functions_dir();
    write_spec(dir.path(), "f", "---\nmodel: first\n---\n");
    let backend = Arc::new(MockBackend::new());
    let registry = Registry::new(backend.clone(), test_config(dir.path()));

    let _ = registry.invoke("f", Map::new()).await;
    write_spec(dir.path(), "f", "---\nmodel: second\n---\n");
    let _ = registry.invoke("f", Map::new()).await;

    let models: Vec<_> = backend.structured_requests().into_iter().map(|r| r.model).collect();
    assert_eq!(models, vec!["first".to_string(), "second".to_string()]);
}

#[tokio::test]
async fn array_schema_returns_items() {
    let dir = functions_dir();
    write_spec(
        dir.path(),
        "list_ideas",
        "---\nmodel: m\nschema:\n  type: array\n  items:\n    type: string\n---\n",
    );
    let backend = Arc::new(MockBackend::new().with_structured(json!(["a", "b", "c"])));
    let registry = Registry::new(backend.clone(), test_config(dir.path()));

    let result = registry.invoke("list_ideas", args(json!({"topic": "rust"}))).await;

    assert_eq!(result.into_value(), json!({"items": ["a", "b", "c"]}));
    assert_eq!(backend.structured_requests()[0].schema.shape(), OutputShape::Array);
}

#[tokio::test]
async fn no_schema_returns_content() {
    let dir = functions_dir();
    write_spec(dir.path(), "poem", "---\nmodel: m\n---\n");
    let backend = Arc::new(MockBackend::new().with_structured(json!("roses are red")));
    let registry = Registry::new(backend, test_config(dir.path()));

    let result = registry.invoke("poem", Map::new()).await;
    assert_eq!(result.into_value(), json!({"content": "roses are red"}));
}

#[tokio::test]
async fn args_override_static_fields() {
    let dir = functions_dir();
    write_spec(dir.path(), "f", "---\nmodel: m\ntone: dry\nlength: short\n---\n");
    let backend = Arc::new(MockBackend::new());
    let registry = Registry::new(backend.clone(), test_config(dir.path()));

    let _ = registry.invoke("f", args(json!({"tone": "playful"}))).await;

    let prompt: Value = serde_json::from_str(&backend.structured_requests()[0].prompt).unwrap();
    assert_eq!(prompt, json!({"tone": "playful", "length": "short"}));
}

#[tokio::test]
async fn body_template_extends_system_prompt() {
    let dir = functions_dir();
    write_spec(dir.path(), "f", "---\nmodel: m\nsystem: Be terse.\n---\n\nAlways answer in French.\n");
    let backend = Arc::new(MockBackend::new());
    let registry = Registry::new(backend.clone(), test_config(dir.path()));

    let _ = registry.invoke("f", Map::new()).await;
    assert_eq!(
        backend.structured_requests()[0].system,
        "Be terse.\n\nAlways answer in French."
    );
}

#[tokio::test]
async fn malformed_files_never_fail_the_call() {
    let dir = functions_dir();
    write_spec(dir.path(), "no_frontmatter", "just text");
    write_spec(dir.path(), "bad_yaml", "---\nmodel: [unclosed\n---\n");
    write_spec(dir.path(), "no_model", "---\nsystem: hi\n---\n");
    let backend = Arc::new(MockBackend::new());
    let registry = Registry::new(backend.clone(), test_config(dir.path()));

    let cases = [
        ("no_frontmatter", "GenerationError: "),
        ("bad_yaml", "GenerationError: "),
        ("no_model", "ConfigurationError: "),
        ("../escape", "ConfigurationError: "),
        ("", "ConfigurationError: "),
    ];
    for (name, prefix) in cases {
        let result = registry.invoke(name, Map::new()).await;
        let error = result.error().unwrap_or_default();
        assert!(error.starts_with(prefix), "{name}: {error}");
        assert_eq!(result.fields().len(), 1);
    }
    assert_eq!(backend.structured_calls(), 0);
}

#[tokio::test]
async fn schema_violation_becomes_error_result() {
    let dir = functions_dir();
    let backend = Arc::new(MockBackend::new().with_structured(json!({"summary": "wrong key"})));
    let registry = Registry::new(backend, test_config(dir.path()));

    let result = registry.invoke("summarize", Map::new()).await;
    assert!(result.error().unwrap().starts_with("GenerationError: output failed schema validation"));
}

#[tokio::test(start_paused = true)]
async fn slow_backend_becomes_timeout_result() {
    let dir = functions_dir();
    let backend = Arc::new(MockBackend::new().with_delay(Duration::from_secs(60)));
    let registry = Registry::new(backend, test_config(dir.path()));

    let result = registry.invoke("summarize", Map::new()).await;
    assert!(result.error().unwrap().starts_with("TimeoutError: "));
}

#[tokio::test]
async fn handles_are_cached_per_name() {
    let dir = functions_dir();
    let registry = Registry::new(Arc::new(MockBackend::new()), test_config(dir.path()));

    let first = registry.function("summarize").unwrap();
    let second = registry.function("summarize").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.path(), dir.path().join("summarize.md"));
    assert!(registry.function("a/b").is_err());
}

#[tokio::test]
async fn concurrent_first_calls_create_one_file() {
    let dir = functions_dir();
    let backend = Arc::new(MockBackend::new());
    let registry = Arc::new(Registry::new(backend.clone(), test_config(dir.path())));

    let calls = (0..8).map(|_| {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move { registry.invoke("shared", Map::new()).await })
    });
    for result in futures::future::join_all(calls).await {
        assert!(!result.unwrap().is_error());
    }
    assert_eq!(backend.structured_calls(), 8);
    assert_eq!(registry.list().await.unwrap(), vec!["shared".to_string()]);
}

#[tokio::test]
async fn list_enumerates_specifications() {
    let dir = functions_dir();
    let registry = Registry::new(Arc::new(MockBackend::new()), test_config(&dir.path().join("missing")));
    assert!(registry.list().await.unwrap().is_empty());

    write_spec(dir.path(), "b", "---\nmodel: m\n---\n");
    write_spec(dir.path(), "a", "---\nmodel: m\n---\n");
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    let registry = Registry::new(Arc::new(MockBackend::new()), test_config(dir.path()));
    assert_eq!(registry.list().await.unwrap(), vec!["a".to_string(), "b".to_string()]);
}
