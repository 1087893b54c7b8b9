use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use promptlab_application::PromptLabSession;
use promptlab_core::conversation::DEFAULT_SYSTEM_PROMPT;
use promptlab_core::{
    GenerationError, GenerationFailure, GenerationInput, GenerationMode, GenerationRequest,
    GenerationService, PromptLabError, PromptOptions, RetryingClient, Role, TaskKind,
};

// Mock generation service that records requests and replays canned outcomes
struct MockService {
    mode: GenerationMode,
    replies: Mutex<VecDeque<Result<String, GenerationFailure>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    calls: AtomicU32,
}

impl MockService {
    fn new(mode: GenerationMode, replies: Vec<Result<String, GenerationFailure>>) -> Arc<Self> {
        Arc::new(Self {
            mode,
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> GenerationRequest {
        self.requests.lock().unwrap().last().cloned().expect("no request recorded")
    }
}

#[async_trait]
impl GenerationService for MockService {
    fn name(&self) -> &str {
        "mock"
    }

    fn mode(&self) -> GenerationMode {
        self.mode
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("default reply".to_string()))
    }
}

fn session_with(service: Arc<MockService>) -> PromptLabSession {
    PromptLabSession::new(
        RetryingClient::new(service),
        "gpt-4o-mini",
        3,
        DEFAULT_SYSTEM_PROMPT,
    )
}

#[tokio::test]
async fn test_summarize_end_to_end() {
    let service = MockService::new(GenerationMode::Remote, vec![Ok("- fox\n- jumps\n- quick".into())]);
    let session = session_with(service.clone());
    let options = PromptOptions::new().with("style", "3 bullet points");

    let summary = session
        .run_task(TaskKind::Summarize, "  The quick brown fox jumps.  ", &options)
        .await
        .unwrap();

    assert_eq!(summary, "- fox\n- jumps\n- quick");
    let request = service.last_request();
    assert_eq!(request.params.model, "gpt-4o-mini");
    assert_eq!(request.params.max_output_tokens, 150);
    let GenerationInput::Conversation(messages) = &request.input else {
        panic!("remote backends receive a message list");
    };
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role(), Role::User);
    assert!(messages[0].content().contains("Return exactly 3 concise bullet points."));
    assert!(messages[0].content().contains("The quick brown fox jumps."));
    assert_eq!(session.history().len(), 1, "tasks don't touch the chat history");
}

#[tokio::test]
async fn test_local_mode_sends_plain_prompt() {
    let service = MockService::new(GenerationMode::Local, vec![Ok("Dear team,".into())]);
    let session = session_with(service.clone());

    session
        .run_task(TaskKind::Expand, "meeting moved", &PromptOptions::new())
        .await
        .unwrap();

    let request = service.last_request();
    assert_eq!(request.params.max_output_tokens, 250);
    match request.input {
        GenerationInput::Prompt(prompt) => assert!(prompt.contains("meeting moved")),
        other => panic!("expected prompt input, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_input_is_rejected_before_dispatch() {
    let service = MockService::new(GenerationMode::Remote, vec![]);
    let mut session = session_with(service.clone());

    let err = session
        .run_task(TaskKind::Infer, "   ", &PromptOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err, PromptLabError::EmptyInput);

    assert_eq!(session.chat("\n").await.unwrap_err(), PromptLabError::EmptyInput);
    assert_eq!(service.calls(), 0);
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn test_invalid_option_is_rejected_before_dispatch() {
    let service = MockService::new(GenerationMode::Remote, vec![]);
    let session = session_with(service.clone());
    let options = PromptOptions::new().with("style", "haiku");

    let err = session
        .run_task(TaskKind::Summarize, "some text", &options)
        .await
        .unwrap_err();

    assert!(err.is_invalid_option());
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn test_chat_appends_user_then_assistant() {
    let service = MockService::new(
        GenerationMode::Remote,
        vec![Ok("Hello!".into()), Ok("Rust is a language.".into())],
    );
    let mut session = session_with(service.clone());

    session.chat("hi").await.unwrap();
    let reply = session.chat("what is rust?").await.unwrap();

    assert_eq!(reply, "Rust is a language.");
    let roles: Vec<Role> = session.history().iter().map(|m| m.role()).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant]
    );

    // The second call carries the whole dialogue up to the new user turn
    let GenerationInput::Conversation(sent) = service.last_request().input else {
        panic!("remote chat sends the conversation");
    };
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[3].content(), "what is rust?");
}

#[tokio::test]
async fn test_failed_chat_keeps_user_message_only() {
    let service = MockService::new(
        GenerationMode::Remote,
        vec![Err(GenerationFailure::service_error("invalid api key"))],
    );
    let mut session = session_with(service.clone());

    let err = session.chat("hello?").await.unwrap_err();

    assert!(matches!(
        err,
        PromptLabError::Generation(GenerationError::Service(_))
    ));
    assert_eq!(service.calls(), 1);
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[1].role(), Role::User);
}

#[tokio::test(start_paused = true)]
async fn test_chat_retries_transient_failures() {
    let service = MockService::new(
        GenerationMode::Remote,
        vec![
            Err(GenerationFailure::rate_limited("slow down")),
            Err(GenerationFailure::timeout("took too long")),
            Ok("finally".into()),
        ],
    );
    let mut session = session_with(service.clone());

    assert_eq!(session.chat("hi").await.unwrap(), "finally");
    assert_eq!(service.calls(), 3);
    assert_eq!(session.history().len(), 3);
}

#[tokio::test]
async fn test_clear_history_reseeds() {
    let service = MockService::new(GenerationMode::Remote, vec![]);
    let mut session = session_with(service);
    session.chat("one").await.unwrap();
    session.chat("two").await.unwrap();

    session.clear_history();

    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].role(), Role::System);
    assert_eq!(session.history()[0].content(), DEFAULT_SYSTEM_PROMPT);
}

#[tokio::test]
async fn test_sessions_sharing_a_service_keep_separate_histories() {
    let service = MockService::new(GenerationMode::Remote, vec![]);
    let mut alice = session_with(service.clone());
    let mut bob = session_with(service.clone());

    alice.chat("from alice").await.unwrap();
    bob.chat("from bob").await.unwrap();
    bob.chat("bob again").await.unwrap();

    assert_ne!(alice.id(), bob.id());
    assert_eq!(alice.history().len(), 3);
    assert_eq!(bob.history().len(), 5);
    assert_eq!(service.calls(), 3);
}
