use common::{CurriculumConfig, LlmConfig};
use std::sync::Arc;
use tshelf::classifier::{ClassificationOutcome, Classifier};
use tshelf::extraction::Article;
use tshelf::llm::remote::RemoteLlmProvider;
use tshelf::llm::{LlmProvider, LlmRequest};

fn chat_body(content: &str) -> String {
    serde_json::json!({
        "model": "llama-3.3-70b-versatile",
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 120, "completion_tokens": 40, "total_tokens": 160}
    })
    .to_string()
}

fn article() -> Article {
    Article {
        title: "Measuring reasoning".to_string(),
        url: "https://example.com/reasoning".to_string(),
        published: String::new(),
        source: "Example".to_string(),
        content: "A long explanation of reasoning benchmarks.".to_string(),
    }
}

#[tokio::test]
async fn test_remote_provider_with_mock() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .match_header("authorization", "Bearer fake-api-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_body("  This is a test response \n"))
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "fake-api-key", "llama-3.3-70b-versatile");

    let request = LlmRequest {
        prompt: "Test prompt".to_string(),
        max_tokens: Some(100),
        temperature: Some(0.3),
        timeout_seconds: Some(10),
    };

    let response = provider.generate(request).await.expect("generate");
    assert_eq!(response.content, "This is a test response");
    assert_eq!(response.usage.prompt_tokens, 120);
    assert_eq!(response.usage.total_tokens, 160);
    assert_eq!(response.model, "llama-3.3-70b-versatile");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_response_without_usage() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "ok"}}]}"#)
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "fake-api-key", "fallback-model");
    let response = provider
        .generate(LlmRequest {
            prompt: "Test".to_string(),
            max_tokens: None,
            temperature: None,
            timeout_seconds: None,
        })
        .await
        .expect("generate");

    assert_eq!(response.content, "ok");
    assert_eq!(response.usage.total_tokens, 0);
    assert_eq!(response.model, "fallback-model");
}

#[tokio::test]
async fn test_empty_choices_is_error() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices": []}"#)
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "fake-api-key", "m");
    let result = provider
        .generate(LlmRequest {
            prompt: "Test".to_string(),
            max_tokens: None,
            temperature: None,
            timeout_seconds: None,
        })
        .await;

    assert!(result.unwrap_err().to_string().contains("no choices"));
}

#[tokio::test]
async fn test_remote_provider_error_handling() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": {"message": "Rate limit exceeded"}}"#)
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "fake-api-key", "llama-3.3-70b-versatile");

    let request = LlmRequest {
        prompt: "Test".to_string(),
        max_tokens: None,
        temperature: None,
        timeout_seconds: None,
    };

    let result = provider.generate(request).await;

    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(err.to_string().contains("429"));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_remote_provider_timeout() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(std::time::Duration::from_secs(3));
            w.write_all(b"too late")
        })
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "fake-api-key", "llama-3.3-70b-versatile");

    let request = LlmRequest {
        prompt: "Test".to_string(),
        max_tokens: None,
        temperature: None,
        timeout_seconds: Some(1),
    };

    let result = provider.generate(request).await;

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("timed out"));
}

#[tokio::test]
async fn test_classifier_over_http_with_fenced_json() {
    let mut server = mockito::Server::new_async().await;

    let content = "```json\n{\"skip\": false, \"topic\": \"AI Evaluations & Benchmarking\", \
                   \"concepts_taught\": [{\"name\": \"held-out test sets\", \"confidence\": 0.9}], \
                   \"prerequisites\": [], \
                   \"difficulty\": {\"level\": \"Intermediate\", \"technical_depth\": 6, \"reading_time_minutes\": 7}, \
                   \"learning_outcomes\": [\"why contamination matters\", \"how to read a leaderboard\"], \
                   \"strategic_questions\": [\"what is being measured?\", \"who benefits?\"]}\n```";

    let mock = server
        .mock("POST", "/")
        .match_body(mockito::Matcher::Regex("Title: Measuring reasoning".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_body(content))
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "fake-api-key", "llama-3.3-70b-versatile");
    let classifier = Classifier::new(
        Arc::new(provider),
        CurriculumConfig::default(),
        &LlmConfig::default(),
    );

    match classifier.classify(&article()).await {
        ClassificationOutcome::Classified(c) => {
            assert_eq!(c.topic, "AI Evaluations & Benchmarking");
            assert_eq!(c.difficulty.level, "intermediate");
            assert_eq!(c.difficulty.technical_depth, Some(6));
            assert_eq!(c.concepts_taught[0].name, "held-out test sets");
            assert_eq!(c.strategic_questions.len(), 2);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_classifier_turns_http_error_into_failed() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/")
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let provider = RemoteLlmProvider::new(server.url(), "fake-api-key", "m");
    let classifier = Classifier::new(
        Arc::new(provider),
        CurriculumConfig::default(),
        &LlmConfig::default(),
    );

    match classifier.classify(&article()).await {
        ClassificationOutcome::Failed { error } => assert!(error.contains("500")),
        other => panic!("unexpected outcome: {:?}", other),
    }
}
