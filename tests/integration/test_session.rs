//! End-to-end tests for the conversation state machine.
//!
//! A `Session` drives an `HttpTutorClient` against a locally spawned
//! endpoint, the same way the terminal client does.

use std::sync::Arc;

use async_trait::async_trait;
use tamarini_tutor::{
    create_router, run_turn, strings, AppState, Config, GenerativeModel, HttpTutorClient,
    ImagePayload, Language, ModelErrorKind, Mode, PromptPart, Role, Session, SessionStatus,
    Settings, Tutor, TutorError,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Echoes back the last transcript line it was shown, or fails.
struct EchoModel {
    fail_with: Option<ModelErrorKind>,
}

#[async_trait]
impl GenerativeModel for EchoModel {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, parts: &[PromptPart]) -> tamarini_tutor::Result<String> {
        if let Some(kind) = self.fail_with {
            return Err(TutorError::generation_failed(kind, "backend exploded"));
        }
        let text = parts.first().and_then(PromptPart::as_text).unwrap_or("");
        let last_student = text
            .lines()
            .filter_map(|line| line.strip_prefix("Student: "))
            .last()
            .unwrap_or("");
        let image_note = if parts.len() > 1 { " (with image)" } else { "" };
        Ok(format!("You said: {last_student}{image_note}"))
    }
}

async fn spawn_test_server(fail_with: Option<ModelErrorKind>) -> (String, JoinHandle<()>) {
    let config = Config::default();
    let path = config.endpoint_path.clone();
    let tutor = Tutor::new(Arc::new(EchoModel { fail_with }));
    let router = create_router(AppState::new(config, Arc::new(tutor)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    (format!("http://{addr}{path}"), handle)
}

fn french_session() -> Arc<Mutex<Session>> {
    Arc::new(Mutex::new(Session::new(Settings::default())))
}

#[tokio::test]
async fn test_turn_round_trips_through_endpoint() {
    let (url, server) = spawn_test_server(None).await;
    let client = HttpTutorClient::new(url).expect("client builds");
    let session = french_session();

    session
        .lock()
        .await
        .set_draft("2+2=4, is that the final step?");
    let reply = run_turn(&session, &client, Mode::Normal)
        .await
        .expect("turn accepted");

    assert_eq!(reply.role, Role::Tutor);
    assert_eq!(reply.text, "You said: 2+2=4, is that the final step?");

    let s = session.lock().await;
    assert_eq!(s.status(), SessionStatus::Idle);
    assert_eq!(s.messages().len(), 3);
    assert_eq!(s.draft(), "");

    server.abort();
}

#[tokio::test]
async fn test_similar_exercise_sends_placeholder() {
    let (url, server) = spawn_test_server(None).await;
    let client = HttpTutorClient::new(url).expect("client builds");
    let session = french_session();

    let reply = run_turn(&session, &client, Mode::SimilarExercise)
        .await
        .expect("turn accepted");

    let placeholder = strings(Language::Fr).similar_request;
    assert_eq!(reply.text, format!("You said: {placeholder}"));
    assert_eq!(session.lock().await.messages()[1].text, placeholder);

    server.abort();
}

#[tokio::test]
async fn test_image_only_turn_sends_image() {
    let (url, server) = spawn_test_server(None).await;
    let client = HttpTutorClient::new(url).expect("client builds");
    let session = french_session();

    session
        .lock()
        .await
        .attach_image(ImagePayload::new("iVBORw0KGgo=", "image/png"));
    let reply = run_turn(&session, &client, Mode::Normal)
        .await
        .expect("turn accepted");

    let default_text = strings(Language::Fr).image_only_request;
    assert_eq!(reply.text, format!("You said: {default_text} (with image)"));
    assert!(session.lock().await.pending_image().is_none());

    server.abort();
}

#[tokio::test]
async fn test_server_failure_becomes_apology() {
    let (url, server) = spawn_test_server(Some(ModelErrorKind::Server)).await;
    let client = HttpTutorClient::new(url).expect("client builds");
    let session = french_session();

    session.lock().await.set_draft("Step: 2x = 6 so x = 2");
    let reply = run_turn(&session, &client, Mode::CheckStep)
        .await
        .expect("turn accepted");

    assert_eq!(reply.text, strings(Language::Fr).apology);
    assert!(!reply.text.contains("exploded"));

    let s = session.lock().await;
    assert_eq!(s.status(), SessionStatus::Idle);
    assert_eq!(s.messages().len(), 3);

    server.abort();
}

#[tokio::test]
async fn test_arabic_session_round_trip() {
    let (url, server) = spawn_test_server(Some(ModelErrorKind::Network)).await;
    let client = HttpTutorClient::new(url).expect("client builds");
    let session = french_session();

    session.lock().await.set_language(Language::Ar);
    session.lock().await.set_draft("س + 2 = 5");
    let reply = run_turn(&session, &client, Mode::Normal)
        .await
        .expect("turn accepted");

    assert_eq!(reply.text, strings(Language::Ar).apology);
    assert_eq!(
        session.lock().await.messages()[0].text,
        strings(Language::Ar).greeting
    );

    server.abort();
}
