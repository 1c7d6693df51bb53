//! Integration tests for the tutor HTTP endpoint.
//!
//! These tests run the real router on a local port with a scripted model in
//! place of the remote generative service, and talk to it over HTTP.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tamarini_tutor::{
    create_router, AppState, Config, GenerativeModel, ModelErrorKind, PromptPart, Tutor,
    TutorError,
};
use tokio::task::JoinHandle;

/// Stands in for the generative model: answers with a fixed outcome and
/// remembers every prompt it was given.
struct ScriptedModel {
    reply: Result<String, ModelErrorKind>,
    prompts: Mutex<Vec<Vec<PromptPart>>>,
}

impl ScriptedModel {
    fn answering(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(kind: ModelErrorKind) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(kind),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<Vec<PromptPart>> {
        self.prompts.lock().expect("prompt lock poisoned").clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, parts: &[PromptPart]) -> tamarini_tutor::Result<String> {
        self.prompts
            .lock()
            .expect("prompt lock poisoned")
            .push(parts.to_vec());
        self.reply
            .clone()
            .map_err(|kind| TutorError::generation_failed(kind, "quota exceeded for project"))
    }
}

/// Spawns the server on an ephemeral port and returns the endpoint URL.
async fn spawn_test_server(model: Arc<ScriptedModel>) -> (String, JoinHandle<()>) {
    let config = Config::default();
    let path = config.endpoint_path.clone();
    let state = AppState::new(config, Arc::new(Tutor::new(model)));
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    (format!("http://{addr}{path}"), handle)
}

fn conversation() -> Value {
    json!([
        {"sender": "assistant", "text": "Salut, je suis TAMARINI."},
        {"sender": "user", "text": "2+2=4, is that the final step?"}
    ])
}

// ============================================================================
// Success
// ============================================================================

#[tokio::test]
async fn test_post_returns_model_reply() {
    let model = ScriptedModel::answering("Yes, well done!");
    let (url, server) = spawn_test_server(model.clone()).await;

    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({"messages": conversation(), "language": "fr", "mode": "normal"}))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("body is JSON");
    assert_eq!(body, json!({"reply": "Yes, well done!"}));

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    let text = prompts[0][0].as_text().expect("first part is text");
    assert!(text.contains("Mode: normal"));
    assert!(text.contains("Tutor: Salut, je suis TAMARINI.\nStudent: 2+2=4, is that the final step?\n"));
    assert!(text.ends_with("Tutor:"));

    server.abort();
}

#[tokio::test]
async fn test_image_is_forwarded_without_data_uri_prefix() {
    let model = ScriptedModel::answering("Je vois ton exercice.");
    let (url, server) = spawn_test_server(model.clone()).await;

    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({
            "messages": conversation(),
            "image": {"base64": "data:image/png;base64,iVBORw0KGgo=", "mimeType": "image/png"},
            "mode": "check-step"
        }))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 200);

    let prompts = model.prompts();
    assert_eq!(prompts[0].len(), 2);
    let image = prompts[0][1].as_inline_image().expect("second part is image");
    assert_eq!(image.data, "iVBORw0KGgo=");
    assert_eq!(image.mime_type, "image/png");
    assert!(prompts[0][0]
        .as_text()
        .expect("first part is text")
        .contains("Mode: check-step"));

    server.abort();
}

#[tokio::test]
async fn test_arabic_request_selects_arabic_directive() {
    let model = ScriptedModel::answering("أحسنت");
    let (url, server) = spawn_test_server(model.clone()).await;

    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({"messages": conversation(), "language": "ar", "mode": "similar-exercise"}))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 200);
    let text = model.prompts()[0][0]
        .as_text()
        .expect("first part is text")
        .to_string();
    assert!(text.contains("Modern Standard Arabic"));
    assert!(text.contains("Mode: similar-exercise"));

    server.abort();
}

#[tokio::test]
async fn test_non_string_codes_fall_back() {
    let model = ScriptedModel::answering("D'accord.");
    let (url, server) = spawn_test_server(model.clone()).await;

    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({
            "messages": [{"sender": 7, "text": "x = 3 ?"}],
            "language": 1,
            "mode": false
        }))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 200);
    let prompts = model.prompts();
    let text = prompts[0][0].as_text().expect("first part is text");
    assert!(text.contains("Mode: normal"));
    assert!(text.contains("Student: x = 3 ?\n"));

    server.abort();
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_missing_messages_returns_400() {
    let model = ScriptedModel::answering("unused");
    let (url, server) = spawn_test_server(model.clone()).await;

    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({"language": "fr"}))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("body is JSON");
    assert_eq!(body, json!({"error": "Missing messages"}));
    assert!(model.prompts().is_empty());

    server.abort();
}

#[tokio::test]
async fn test_get_returns_405_with_allow_header() {
    let (url, server) = spawn_test_server(ScriptedModel::answering("unused")).await;

    let response = reqwest::get(&url).await.expect("request failed");

    assert_eq!(response.status(), 405);
    assert_eq!(
        response
            .headers()
            .get("allow")
            .and_then(|v| v.to_str().ok()),
        Some("POST")
    );
    let body: Value = response.json().await.expect("body is JSON");
    assert_eq!(body, json!({"error": "Method Not Allowed"}));

    server.abort();
}

#[tokio::test]
async fn test_model_failure_returns_generic_500() {
    let model = ScriptedModel::failing(ModelErrorKind::RateLimit);
    let (url, server) = spawn_test_server(model).await;

    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({"messages": conversation()}))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 500);
    let body = response.text().await.expect("body is text");
    assert!(!body.contains("quota"));
    let body: Value = serde_json::from_str(&body).expect("body is JSON");
    assert_eq!(body, json!({"error": "AI error (see server logs)"}));

    server.abort();
}

#[tokio::test]
async fn test_blank_model_reply_returns_500() {
    let (url, server) = spawn_test_server(ScriptedModel::answering("  \n ")).await;

    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({"messages": conversation()}))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), 500);

    server.abort();
}
