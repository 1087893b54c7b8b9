//! Integration tests for the HTTP generation backends using wiremock.

use std::sync::Arc;
use std::time::Duration;

use promptlab_core::config::AppConfig;
use promptlab_core::retry::RetryPolicy;
use promptlab_core::{
    FailureKind, GenerationError, GenerationMode, GenerationParams, GenerationRequest,
    GenerationService, Message, RetryingClient,
};
use promptlab_infrastructure::SecretServiceImpl;
use promptlab_interaction::{LocalModelAgent, OpenAIApiAgent, build_backend};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(text: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": text }, "finish_reason": "stop" }
        ]
    })
}

fn no_wait() -> RetryPolicy {
    RetryPolicy {
        rate_limit_backoff: Duration::ZERO,
        timeout_backoff: Duration::ZERO,
    }
}

fn params() -> GenerationParams {
    GenerationParams::new("gpt-4o-mini", 150)
}

mod openai {
    use super::*;

    #[tokio::test]
    async fn test_success_returns_first_choice() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 150,
                "messages": [{ "role": "user", "content": "hello" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hi there!")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let agent = OpenAIApiAgent::new("test-key").with_base_url(mock_server.uri());
        let text = agent
            .generate(&GenerationRequest::new("hello", params()))
            .await
            .unwrap();

        assert_eq!(text, "Hi there!");
    }

    #[tokio::test]
    async fn test_conversation_is_sent_in_order() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "messages": [
                    { "role": "system", "content": "You are a helpful, concise assistant." },
                    { "role": "user", "content": "What is Rust?" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("A language.")))
            .mount(&mock_server)
            .await;

        let agent = OpenAIApiAgent::new("test-key").with_base_url(mock_server.uri());
        let history = vec![
            Message::system("You are a helpful, concise assistant."),
            Message::user("What is Rust?"),
        ];
        let text = agent
            .generate(&GenerationRequest::new(history, params()))
            .await
            .unwrap();

        assert_eq!(text, "A language.");
    }

    #[tokio::test]
    async fn test_status_codes_map_to_failure_kinds() {
        let cases = [
            (429, FailureKind::RateLimited),
            (504, FailureKind::Timeout),
            (401, FailureKind::ServiceError),
            (500, FailureKind::ServiceError),
        ];

        for (status, expected) in cases {
            let mock_server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat/completions"))
                .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                    "error": { "message": "nope", "type": "test" }
                })))
                .mount(&mock_server)
                .await;

            let agent = OpenAIApiAgent::new("test-key").with_base_url(mock_server.uri());
            let failure = agent
                .generate(&GenerationRequest::new("hello", params()))
                .await
                .unwrap_err();

            assert_eq!(failure.kind, expected, "status {status}");
            assert!(failure.message.contains("nope"));
        }
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("late"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let agent = OpenAIApiAgent::new("test-key")
            .with_base_url(mock_server.uri())
            .with_request_timeout(Duration::from_millis(50));
        let failure = agent
            .generate(&GenerationRequest::new("hello", params()))
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::Timeout);
    }

    #[tokio::test]
    async fn test_malformed_body_is_service_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let agent = OpenAIApiAgent::new("test-key").with_base_url(mock_server.uri());
        let failure = agent
            .generate(&GenerationRequest::new("hello", params()))
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::ServiceError);
    }
}

mod retrying {
    use super::*;

    #[tokio::test]
    async fn test_rate_limit_is_retried_up_to_ceiling() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&mock_server)
            .await;

        let agent = OpenAIApiAgent::new("test-key").with_base_url(mock_server.uri());
        let client = RetryingClient::new(Arc::new(agent)).with_policy(no_wait());

        let err = client.send("hello", params(), 3).await.unwrap_err();

        assert!(matches!(
            err,
            GenerationError::RetriesExhausted { attempts: 3, .. }
        ));
        assert_eq!(err.last_kind(), FailureKind::RateLimited);
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Incorrect API key provided" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let agent = OpenAIApiAgent::new("bad-key").with_base_url(mock_server.uri());
        let client = RetryingClient::new(Arc::new(agent)).with_policy(no_wait());

        let err = client.send("hello", params(), 3).await.unwrap_err();

        assert!(matches!(err, GenerationError::Service(_)));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(504))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("recovered")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let agent = OpenAIApiAgent::new("test-key").with_base_url(mock_server.uri());
        let client = RetryingClient::new(Arc::new(agent)).with_policy(no_wait());

        assert_eq!(client.send("hello", params(), 3).await.unwrap(), "recovered");
    }
}

mod local {
    use super::*;

    #[tokio::test]
    async fn test_generate_sends_prompt_and_parameters() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(body_partial_json(json!({
                "inputs": "summarize: hello",
                "parameters": { "max_new_tokens": 150, "do_sample": true }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "generated_text": "hi" }])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let agent = LocalModelAgent::new(mock_server.uri());
        let text = agent
            .generate(&GenerationRequest::new(
                "summarize: hello",
                GenerationParams::new("google/flan-t5-small", 150),
            ))
            .await
            .unwrap();

        assert_eq!(text, "hi");
        assert_eq!(agent.mode(), GenerationMode::Local);
    }

    #[tokio::test]
    async fn test_conversation_uses_latest_user_turn() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(body_partial_json(json!({ "inputs": "second" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "generated_text": "ok" })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let agent = LocalModelAgent::new(mock_server.uri());
        let history = vec![
            Message::system("seed"),
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("second"),
        ];
        let text = agent
            .generate(&GenerationRequest::new(history, params()))
            .await
            .unwrap();

        assert_eq!(text, "ok");
    }
}

mod backend {
    use super::*;

    #[tokio::test]
    async fn test_local_backend_needs_no_credentials() {
        let temp_dir = TempDir::new().unwrap();
        let secrets = SecretServiceImpl::with_path(temp_dir.path().join("secret.json"));
        let config = AppConfig {
            backend: GenerationMode::Local,
            ..AppConfig::default()
        };

        let backend = build_backend(&config, &secrets).await.unwrap();

        assert_eq!(backend.service.mode(), GenerationMode::Local);
        assert_eq!(backend.model, "google/flan-t5-small");
    }

    #[tokio::test]
    async fn test_remote_backend_reads_secret_file() {
        let temp_dir = TempDir::new().unwrap();
        let secret_path = temp_dir.path().join("secret.json");
        std::fs::write(
            &secret_path,
            r#"{"openai":{"api_key":"sk-test","model_name":"gpt-4o"}}"#,
        )
        .unwrap();
        let secrets = SecretServiceImpl::with_path(secret_path);

        let backend = build_backend(&AppConfig::default(), &secrets).await.unwrap();

        assert_eq!(backend.service.mode(), GenerationMode::Remote);
        assert_eq!(backend.model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_malformed_secret_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let secret_path = temp_dir.path().join("secret.json");
        std::fs::write(&secret_path, r#"{ "openai": { "api_key": "sk-real" "#).unwrap();
        let secrets = SecretServiceImpl::with_path(secret_path);

        let Err(err) = build_backend(&AppConfig::default(), &secrets).await else {
            panic!("a malformed secret.json must not fall back to the environment");
        };

        assert!(err.is_config());
        let message = err.to_string();
        assert!(message.contains("not valid secret JSON"), "{message}");
        assert!(!message.contains("sk-real"));
    }

    #[tokio::test]
    async fn test_configured_model_beats_secret_model() {
        let temp_dir = TempDir::new().unwrap();
        let secret_path = temp_dir.path().join("secret.json");
        std::fs::write(
            &secret_path,
            r#"{"openai":{"api_key":"sk-test","model_name":"gpt-4o"}}"#,
        )
        .unwrap();
        let secrets = SecretServiceImpl::with_path(secret_path);
        let config = AppConfig {
            model: Some("gpt-4.1-mini".to_string()),
            ..AppConfig::default()
        };

        let backend = build_backend(&config, &secrets).await.unwrap();

        assert_eq!(backend.model, "gpt-4.1-mini");
    }
}
