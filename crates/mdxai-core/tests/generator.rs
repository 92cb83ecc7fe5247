use mdxai_core::{GenerationRequest, Generator, MdxaiConfig, MdxaiError};
use mdxai_document::{parse, BodyNode, ParseOptions};
use mdxai_test_utils::{test_config, MockBackend, ARTICLE_MDX, OUTLINE_JSON};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn generator(backend: &Arc<MockBackend>) -> Generator {
    Generator::new(backend.clone(), test_config(std::path::Path::new("functions")))
}

#[tokio::test]
async fn article_about_testing() {
    let backend = Arc::new(MockBackend::new().with_text(ARTICLE_MDX));
    let result = generator(&backend)
        .generate(&GenerationRequest::new("testing").with_type("Article"))
        .await
        .unwrap();

    assert!(result.content.contains("$type: Article"));
    assert!(result.content.contains("'@type': Article"));
    assert!(result.content.contains("'@context': https://schema.org"));

    let document = &result.document;
    assert_eq!(document.type_name(), Some("Article"));
    assert_eq!(document.title(), Some("Testing"));
    assert!(document.description().is_some());
    let headings: Vec<_> = document.headings().collect();
    assert_eq!(headings, vec![(1, "Testing")]);
    assert_eq!(
        document.get_path("metadata.properties.generator").and_then(|v| v.as_str()),
        Some("mdxai/test-model")
    );
    assert!(result.outline.is_none());
    assert_eq!(backend.text_calls(), 1);
}

#[tokio::test]
async fn content_round_trips_to_document() {
    let backend = Arc::new(MockBackend::new());
    let result = generator(&backend)
        .generate(&GenerationRequest::new("testing"))
        .await
        .unwrap();
    let reparsed = parse(&result.content, &ParseOptions::default()).unwrap();
    assert_eq!(reparsed, result.document);
}

#[tokio::test]
async fn unstructured_output_is_still_a_document() {
    let backend = Arc::new(MockBackend::new().with_text("Just a sentence, no frontmatter."));
    let result = generator(&backend)
        .generate(&GenerationRequest::new("notes").with_type("Note"))
        .await
        .unwrap();
    assert_eq!(result.document.type_name(), Some("Note"));
    assert_eq!(result.document.description(), Some("Just a sentence, no frontmatter."));
}

#[tokio::test]
async fn fenced_output_is_unwrapped() {
    let fenced = format!("```mdx\n{ARTICLE_MDX}```");
    let backend = Arc::new(MockBackend::new().with_text(fenced));
    let result = generator(&backend)
        .generate(&GenerationRequest::new("testing"))
        .await
        .unwrap();
    assert_eq!(result.document.title(), Some("Testing"));
}

#[tokio::test]
async fn body_framed_by_code_blocks_is_not_unwrapped() {
    let text = "```rust\nfn a() {}\n```\n\nMiddle text\n\n```rust\nfn b() {}\n```";
    let backend = Arc::new(MockBackend::new().with_text(text));
    let result = generator(&backend)
        .generate(&GenerationRequest::new("snippets"))
        .await
        .unwrap();
    assert_eq!(
        result.document.body,
        vec![
            BodyNode::code(Some("rust"), "fn a() {}"),
            BodyNode::text("Middle text"),
            BodyNode::code(Some("rust"), "fn b() {}"),
        ]
    );
}

#[tokio::test]
async fn defaults_come_from_config() {
    let backend = Arc::new(MockBackend::new());
    generator(&backend)
        .generate(&GenerationRequest::new("testing"))
        .await
        .unwrap();
    let request = &backend.text_requests()[0];
    assert_eq!(request.model, "test-model");
    assert!(request.prompt.starts_with("Write a Article about: testing"));
}

#[tokio::test]
async fn components_reach_system_prompt() {
    let backend = Arc::new(MockBackend::new());
    generator(&backend)
        .generate(&GenerationRequest::new("charts").with_components(["Chart", "Callout"]))
        .await
        .unwrap();
    assert!(backend.text_requests()[0]
        .system
        .contains("Available components: Chart, Callout."));
}

#[tokio::test]
async fn recursive_makes_one_outline_and_one_expansion_call() {
    let backend = Arc::new(MockBackend::new().with_text(OUTLINE_JSON).with_text(ARTICLE_MDX));
    let result = generator(&backend)
        .generate(&GenerationRequest::new("testing").recursive(3))
        .await
        .unwrap();

    assert_eq!(backend.text_calls(), 2);
    let outline = result.outline.unwrap();
    assert_eq!(outline.len(), 2);
    assert_eq!(outline[0].title, "Why test");

    let requests = backend.text_requests();
    assert!(requests[0].prompt.contains("Create an outline for a Article about: testing"));
    assert!(requests[1].prompt.contains("- Why test: Motivation"));
    assert!(requests[1].prompt.contains("- How to test: Techniques"));
}

#[tokio::test]
async fn zero_depth_skips_outline() {
    let backend = Arc::new(MockBackend::new());
    let result = generator(&backend)
        .generate(&GenerationRequest::new("testing").recursive(0))
        .await
        .unwrap();
    assert!(result.outline.is_none());
    assert_eq!(backend.text_calls(), 1);
}

#[tokio::test]
async fn malformed_outline_is_parsing_error_without_expansion() {
    let backend = Arc::new(MockBackend::new().with_text("Here is your outline: 1. Intro"));
    let err = generator(&backend)
        .generate(&GenerationRequest::new("testing").recursive(1))
        .await
        .unwrap_err();
    assert!(matches!(err, MdxaiError::Parsing(_)));
    assert_eq!(backend.text_calls(), 1);
}

#[tokio::test]
async fn empty_outline_is_generation_error() {
    let backend = Arc::new(MockBackend::new().with_text("   "));
    let err = generator(&backend)
        .generate(&GenerationRequest::new("testing").recursive(1))
        .await
        .unwrap_err();
    assert!(matches!(err, MdxaiError::Generation(_)));
    assert_eq!(backend.text_calls(), 1);
}

#[tokio::test]
async fn backend_failure_propagates() {
    let backend = Arc::new(MockBackend::new().with_text_error("rate limited"));
    let err = generator(&backend)
        .generate(&GenerationRequest::new("testing"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("rate limited"));
}

#[tokio::test]
async fn empty_model_is_configuration_error() {
    let backend = Arc::new(MockBackend::new());
    let generator = Generator::new(backend.clone(), MdxaiConfig::new().with_model(""));
    let err = generator
        .generate(&GenerationRequest::new("testing"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "ConfigurationError");
    assert_eq!(backend.text_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_backend_times_out() {
    let backend = Arc::new(MockBackend::new().with_delay(Duration::from_secs(60)));
    let err = generator(&backend)
        .generate(&GenerationRequest::new("testing"))
        .await
        .unwrap_err();
    assert!(matches!(err, MdxaiError::Timeout { ref operation, .. } if operation == "generate"));
}

#[tokio::test]
async fn streaming_reports_chunks() {
    let backend = Arc::new(MockBackend::new());
    let mut chunks = Vec::new();
    let result = generator(&backend)
        .generate_streaming(&GenerationRequest::new("testing"), |c| chunks.push(c.to_string()))
        .await
        .unwrap();
    assert_eq!(chunks.concat(), ARTICLE_MDX);
    assert_eq!(result.document.title(), Some("Testing"));
    assert_eq!(backend.stream_calls(), 1);
    assert_eq!(backend.text_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn streaming_timeout_returns_partial_text() {
    let backend = Arc::new(MockBackend::new().with_chunk_delay(Duration::from_secs(2)));
    let err = generator(&backend)
        .generate_streaming(&GenerationRequest::new("testing"), |_| {})
        .await
        .unwrap_err();
    assert_eq!(err.partial_output(), Some("---\ntitle: Testing\n"));
}

#[tokio::test]
async fn batch_preserves_input_order() {
    let backend = Arc::new(
        MockBackend::new()
            .with_text(ARTICLE_MDX)
            .with_text_error("boom")
            .with_text(ARTICLE_MDX),
    );
    let requests = vec![
        GenerationRequest::new("a").with_type("Article"),
        GenerationRequest::new("b").with_type("Recipe"),
        GenerationRequest::new("c").with_type("Event"),
    ];
    let results = generator(&backend).generate_batch(&requests).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().document.type_name(), Some("Article"));
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap().document.type_name(), Some("Event"));
}

#[tokio::test(start_paused = true)]
async fn batch_runs_concurrently_within_limit() {
    let backend = Arc::new(MockBackend::new().with_delay(Duration::from_secs(1)));
    let requests: Vec<_> = (0..4).map(|i| GenerationRequest::new(format!("topic {i}"))).collect();
    let started = tokio::time::Instant::now();
    let results = generator(&backend).generate_batch(&requests).await;

    assert!(results.iter().all(Result::is_ok));
    // four one-second calls, two at a time
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3), "{elapsed:?}");
}
