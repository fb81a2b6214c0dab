//! Shared test utilities
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Query, State},
    http::{HeaderMap, Request, StatusCode},
    routing::{get, post},
};
use easel::api::ApiState;
use easel::dispatch::{Dispatcher, ForwardedCommand};
use easel::model::{GeneratedImage, GenerationRequest, ImageGenerator};
use easel::slack::SlackClient;
use easel::{Error, Result, Worker};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub const BOT_TOKEN: &str = "xoxb-test";
pub const SIGNING_SECRET: &str = "test-signing-secret";
pub const FILE_ID: &str = "F0TESTFILE";

/// Bytes returned by the stub model
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake image";

/// A call received by the mock Slack API
#[derive(Debug, Clone, PartialEq)]
pub enum SlackCall {
    PostMessage(Value),
    GetUploadUrl { filename: String, length: String },
    Upload(Vec<u8>),
    CompleteUpload(Value),
}

/// Which mock Slack endpoints should fail
#[derive(Debug, Default, Clone, Copy)]
pub struct SlackFailures {
    pub post_message: bool,
    pub upload_url: bool,
    pub upload: bool,
    pub complete: bool,
}

struct MockState {
    base_url: String,
    calls: Arc<Mutex<Vec<SlackCall>>>,
    failures: SlackFailures,
}

/// Local stand-in for the Slack Web API
pub struct MockSlack {
    pub api_url: String,
    calls: Arc<Mutex<Vec<SlackCall>>>,
}

impl MockSlack {
    pub async fn start() -> Self {
        Self::with_failures(SlackFailures::default()).await
    }

    pub async fn with_failures(failures: SlackFailures) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let calls = Arc::new(Mutex::new(Vec::new()));

        let state = Arc::new(MockState {
            base_url: base_url.clone(),
            calls: Arc::clone(&calls),
            failures,
        });

        let app = Router::new()
            .route("/api/chat.postMessage", post(post_message))
            .route("/api/files.getUploadURLExternal", get(get_upload_url))
            .route("/upload/{file_id}", post(upload))
            .route("/api/files.completeUploadExternal", post(complete_upload))
            .with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            api_url: format!("{base_url}/api"),
            calls,
        }
    }

    /// Client authenticated with the token the mock expects
    pub fn client(&self) -> SlackClient {
        SlackClient::new(SecretString::from(BOT_TOKEN.to_string())).with_api_url(&self.api_url)
    }

    pub async fn calls(&self) -> Vec<SlackCall> {
        self.calls.lock().await.clone()
    }

    /// Wait until at least `count` calls were recorded
    pub async fn wait_for_calls(&self, count: usize) -> Vec<SlackCall> {
        for _ in 0..100 {
            let calls = self.calls().await;
            if calls.len() >= count {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.calls().await
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {BOT_TOKEN}"))
}

fn slack_error(error: &str) -> Json<Value> {
    Json(json!({"ok": false, "error": error}))
}

async fn post_message(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    if !authorized(&headers) {
        return slack_error("invalid_auth");
    }
    state.calls.lock().await.push(SlackCall::PostMessage(body));
    if state.failures.post_message {
        return slack_error("channel_not_found");
    }
    Json(json!({"ok": true, "channel": "C1", "ts": "1712345678.000100"}))
}

async fn get_upload_url(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    if !authorized(&headers) {
        return slack_error("invalid_auth");
    }
    state.calls.lock().await.push(SlackCall::GetUploadUrl {
        filename: query.get("filename").cloned().unwrap_or_default(),
        length: query.get("length").cloned().unwrap_or_default(),
    });
    if state.failures.upload_url {
        return slack_error("invalid_arguments");
    }
    Json(json!({
        "ok": true,
        "upload_url": format!("{}/upload/{FILE_ID}", state.base_url),
        "file_id": FILE_ID
    }))
}

async fn upload(State(state): State<Arc<MockState>>, body: Bytes) -> StatusCode {
    state.calls.lock().await.push(SlackCall::Upload(body.to_vec()));
    if state.failures.upload {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn complete_upload(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    if !authorized(&headers) {
        return slack_error("invalid_auth");
    }
    state.calls.lock().await.push(SlackCall::CompleteUpload(body));
    if state.failures.complete {
        return slack_error("file_not_found");
    }
    Json(json!({"ok": true, "files": [{"id": FILE_ID}]}))
}

/// Image generator returning canned bytes or a canned failure
pub struct StubGenerator {
    fail: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl StubGenerator {
    pub fn ok() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ImageGenerator for StubGenerator {
    fn model_id(&self) -> &str {
        "amazon.titan-image-generator-v1"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());
        if self.fail {
            return Err(Error::Model {
                code: "ThrottlingException".to_string(),
                message: "Too many requests".to_string(),
            });
        }
        Ok(GeneratedImage {
            data: PNG.to_vec(),
        })
    }
}

/// Dispatcher that records commands instead of running them
#[derive(Default)]
pub struct RecordingDispatcher {
    commands: std::sync::Mutex<Vec<ForwardedCommand>>,
}

impl RecordingDispatcher {
    pub fn commands(&self) -> Vec<ForwardedCommand> {
        self.commands.lock().unwrap().clone()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&self, command: ForwardedCommand) -> Result<()> {
        self.commands.lock().unwrap().push(command);
        Ok(())
    }
}

/// Dispatcher that always refuses
pub struct FailingDispatcher;

impl Dispatcher for FailingDispatcher {
    fn dispatch(&self, _command: ForwardedCommand) -> Result<()> {
        Err(Error::Dispatch("queue unavailable".to_string()))
    }
}

/// API state with a fixed signing secret and a five minute replay window
pub fn api_state(dispatcher: Arc<dyn Dispatcher>) -> ApiState {
    ApiState {
        signing_secret: SecretString::from(SIGNING_SECRET.to_string()),
        max_request_age: Some(Duration::from_secs(300)),
        dispatcher,
        worker: None,
        worker_token: None,
    }
}

/// Worker wired to a mock Slack and a stub generator
pub fn worker(slack: &MockSlack, generator: Arc<StubGenerator>) -> Worker {
    Worker::new(slack.client(), generator)
}

pub fn now() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Events API request signed with [`SIGNING_SECRET`]
pub fn signed_event(body: &str) -> Request<Body> {
    signed_event_at(body, &now())
}

pub fn signed_event_at(body: &str, timestamp: &str) -> Request<Body> {
    let signature =
        easel::slack::signature::sign(SIGNING_SECRET, timestamp, body.as_bytes()).unwrap();
    Request::builder()
        .method("POST")
        .uri("/slack/events")
        .header("content-type", "application/json")
        .header("x-slack-request-timestamp", timestamp)
        .header("x-slack-signature", signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// `event_callback` envelope around a message event
pub fn message_event(event: &Value) -> String {
    json!({
        "token": "legacy",
        "team_id": "T1",
        "type": "event_callback",
        "event": event,
    })
    .to_string()
}

pub fn forwarded(message: &str) -> ForwardedCommand {
    ForwardedCommand {
        channel_id: "C06R6PYR62X".to_string(),
        user_id: "U06RVLX3D24".to_string(),
        message: message.to_string(),
    }
}
