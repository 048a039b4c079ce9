#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use threadline_api::{
    auth::{JwtVerifier, DEV_USER_HEADER},
    config::Config,
    router,
    storage::MemoryObjectStore,
    AppState,
};
use threadline_llm::{
    ChatClient, ChatRequest, ChatResponse, ClientFactory, EventStream, GeneratedImage, ImageClient,
    ImageRequest, ProviderError, Route, StreamEvent,
};
use threadline_persist::MemoryPersistenceClient;

pub const TEST_CONFIG: &str = r#"
    [server]
    host = "127.0.0.1"
    port = 0
    request_timeout_secs = 30

    [cors]
    enabled = true
    origins = ["http://localhost:3000"]

    [database]
    backend = "memory"
    database = "threadline_test"

    [llm]
    groq_models = ["llama-3.3-70b-versatile", "llama-3.1-8b-instant"]
    openai_image_model = "gpt-image-1"
    gemini_image_model = "gemini-2.0-flash-preview-image-generation"
    title_model = "llama-3.1-8b-instant"

    [upload]
    max_files = 5
    max_file_size_bytes = 1024
    allowed_types = ["image/jpeg", "image/png", "image/gif", "image/webp"]

    [storage]
    backend = "memory"
    bucket = "threadline-test"
    region = "us-east-1"

    [auth]
    enabled = false
    authorized_parties = ["http://localhost:3000"]

    [logging]
    level = "debug"
    format = "pretty"
"#;

pub const USER: &str = "user_1";

pub fn test_config() -> Config {
    let mut config = Config::from_toml_str(TEST_CONFIG).unwrap();
    config.groq_api_key = Some("gsk-server".to_string());
    config
}

/// What the fake provider does with the next chat call
#[derive(Clone)]
pub enum Reply {
    /// Stream these events, then close
    Stream(Vec<StreamEvent>),
    /// Stream these events, then fail with the given HTTP status
    StreamThenFail(Vec<StreamEvent>, u16),
    /// Fail before the first byte with the given HTTP status
    Reject(u16),
}

/// Scripted stand-in for every provider
pub struct FakeProvider {
    pub reply: Mutex<Reply>,
    /// Content of non-streaming completions (titles)
    pub completion: Mutex<String>,
    pub image: Mutex<Result<Vec<u8>, u16>>,
    pub routes: Mutex<Vec<Route>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            reply: Mutex::new(Reply::Stream(vec![
                StreamEvent::Message {
                    content: "Hi".to_string(),
                },
                StreamEvent::Done {
                    finish_reason: Some("stop".to_string()),
                },
            ])),
            completion: Mutex::new("Test Title".to_string()),
            image: Mutex::new(Ok(b"\x89PNG fake".to_vec())),
            routes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl FakeProvider {
    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn last_route(&self) -> Option<Route> {
        self.routes.lock().unwrap().last().cloned()
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

struct FakeClient(Arc<FakeProvider>);

#[async_trait]
impl ChatClient for FakeClient {
    async fn chat(&self, request: ChatRequest) -> threadline_llm::Result<ChatResponse> {
        self.0.requests.lock().unwrap().push(request);
        Ok(ChatResponse {
            content: Some(self.0.completion.lock().unwrap().clone()),
            reasoning: None,
            usage: None,
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> threadline_llm::Result<EventStream> {
        self.0.requests.lock().unwrap().push(request);
        let reply = self.0.reply.lock().unwrap().clone();

        let items: Vec<threadline_llm::Result<StreamEvent>> = match reply {
            Reply::Reject(status) => {
                return Err(ProviderError::from_status(status, "rejected".to_string()))
            }
            Reply::Stream(events) => events.into_iter().map(Ok).collect(),
            Reply::StreamThenFail(events, status) => events
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(ProviderError::from_status(
                    status,
                    "upstream broke".to_string(),
                ))))
                .collect(),
        };
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

#[async_trait]
impl ImageClient for FakeClient {
    async fn generate_image(&self, _request: ImageRequest) -> threadline_llm::Result<GeneratedImage> {
        match self.0.image.lock().unwrap().clone() {
            Ok(bytes) => Ok(GeneratedImage {
                bytes,
                mime_type: "image/png".to_string(),
            }),
            Err(status) => Err(ProviderError::from_status(status, "image failed".to_string())),
        }
    }
}

pub struct FakeFactory(pub Arc<FakeProvider>);

impl ClientFactory for FakeFactory {
    fn chat_client(&self, route: &Route) -> threadline_llm::Result<Arc<dyn ChatClient>> {
        self.0.routes.lock().unwrap().push(route.clone());
        Ok(Arc::new(FakeClient(Arc::clone(&self.0))))
    }

    fn image_client(&self, route: &Route) -> threadline_llm::Result<Arc<dyn ImageClient>> {
        self.0.routes.lock().unwrap().push(route.clone());
        Ok(Arc::new(FakeClient(Arc::clone(&self.0))))
    }
}

pub struct TestApp {
    pub router: Router,
    pub persist: Arc<MemoryPersistenceClient>,
    pub storage: Arc<MemoryObjectStore>,
    pub provider: Arc<FakeProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config(), None)
    }

    pub fn with_config(config: Config, verifier: Option<JwtVerifier>) -> Self {
        let persist = Arc::new(MemoryPersistenceClient::new());
        let storage = Arc::new(MemoryObjectStore::new());
        let provider = Arc::new(FakeProvider::default());

        let state = Arc::new(AppState::new(
            config,
            persist.clone(),
            storage.clone(),
            Arc::new(FakeFactory(Arc::clone(&provider))),
            verifier,
        ));

        Self {
            router: router(state),
            persist,
            storage,
            provider,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn json_request(method: Method, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header(DEV_USER_HEADER, user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(DEV_USER_HEADER, user);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// `(event name, data)` pairs of an SSE body; keep-alive comments are skipped
pub fn sse_events(body: &str) -> Vec<(String, Value)> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut name = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    name = Some(value.trim().to_string());
                } else if let Some(value) = line.strip_prefix("data:") {
                    data = serde_json::from_str(value.trim()).ok();
                }
            }
            Some((name?, data?))
        })
        .collect()
}

/// Minimal chat body for `model` asking `question`
pub fn chat_body(model: &str, question: &str) -> Value {
    serde_json::json!({
        "userId": USER,
        "threadId": "thread-1",
        "model": model,
        "messages": [{"role": "user", "content": question}],
        "userMessageId": "msg-user-1",
        "assistantMessageId": "msg-assistant-1"
    })
}
