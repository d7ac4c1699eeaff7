//! Exercises the assistant knowledge engine against a mock assistants API.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use parlor_voice::{AssistantKnowledgeEngine, KnowledgeEngine, OpenAiConfig, VoiceError};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone)]
struct MockApi {
    assistants_created: Arc<AtomicUsize>,
    /// assistant_id of every run creation request.
    run_assistants: Arc<Mutex<Vec<String>>>,
    /// Status returned by run creation.
    initial_run_status: &'static str,
    /// Status returned when the run is fetched again.
    polled_run_status: &'static str,
    run_error_message: Option<&'static str>,
}

impl MockApi {
    fn completing() -> Self {
        Self {
            assistants_created: Arc::new(AtomicUsize::new(0)),
            run_assistants: Arc::new(Mutex::new(Vec::new())),
            initial_run_status: "completed",
            polled_run_status: "completed",
            run_error_message: None,
        }
    }
}

async fn create_assistant(State(api): State<MockApi>) -> Json<Value> {
    // Simulate upstream latency so racing initializers overlap.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let n = api.assistants_created.fetch_add(1, Ordering::SeqCst);
    Json(json!({"id": format!("asst_{}", n)}))
}

async fn create_thread() -> Json<Value> {
    Json(json!({"id": "thread_1"}))
}

async fn create_message(Path(_thread): Path<String>) -> Json<Value> {
    Json(json!({"id": "msg_1"}))
}

async fn create_run(
    State(api): State<MockApi>,
    Path(_thread): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    api.run_assistants
        .lock()
        .unwrap()
        .push(body["assistant_id"].as_str().unwrap_or("").to_string());
    Json(run_payload(api.initial_run_status, api.run_error_message))
}

async fn fetch_run(
    State(api): State<MockApi>,
    Path((_thread, _run)): Path<(String, String)>,
) -> Json<Value> {
    Json(run_payload(api.polled_run_status, api.run_error_message))
}

fn run_payload(status: &str, error: Option<&str>) -> Value {
    let mut payload = json!({"id": "run_1", "status": status});
    if let Some(message) = error {
        payload["last_error"] = json!({"code": "server_error", "message": message});
    }
    payload
}

async fn list_messages(Path(_thread): Path<String>) -> Json<Value> {
    Json(json!({
        "data": [
            {
                "role": "assistant",
                "content": [{
                    "type": "text",
                    "text": {
                        "value": "grounded answer",
                        "annotations": [{"file_citation": {"file_id": "file_1"}}]
                    }
                }]
            },
            {
                "role": "user",
                "content": [{"type": "text", "text": {"value": "question", "annotations": []}}]
            }
        ]
    }))
}

async fn spawn_api(api: MockApi) -> SocketAddr {
    let app = Router::new()
        .route("/assistants", post(create_assistant))
        .route("/threads", post(create_thread))
        .route("/threads/{thread}/messages", post(create_message).get(list_messages))
        .route("/threads/{thread}/runs", post(create_run))
        .route("/threads/{thread}/runs/{run}", get(fetch_run))
        .with_state(api);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn engine_for(addr: SocketAddr, assistant_id: Option<&str>) -> AssistantKnowledgeEngine {
    let config = OpenAiConfig {
        api_key: "sk-test".to_string(),
        api_base: format!("http://{}", addr),
        vector_store_id: "vs_test".to_string(),
        assistant_id: assistant_id.map(str::to_string),
        ..OpenAiConfig::default()
    };
    AssistantKnowledgeEngine::new(reqwest::Client::new(), &config)
        .with_poll_timing(Duration::from_secs(5), Duration::from_millis(20))
}

#[tokio::test]
async fn answers_with_text_and_citations() {
    let addr = spawn_api(MockApi::completing()).await;
    let engine = engine_for(addr, None);

    let kb = engine.ask("what is a bribe?", None).await.unwrap();
    assert_eq!(kb.answer, "grounded answer");
    assert_eq!(kb.citations.len(), 1);
    assert_eq!(kb.citations[0]["file_citation"]["file_id"], "file_1");
}

#[tokio::test]
async fn concurrent_cold_asks_create_exactly_one_assistant() {
    let api = MockApi::completing();
    let counter = api.assistants_created.clone();
    let addr = spawn_api(api).await;
    let engine = Arc::new(engine_for(addr, None));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        tasks.push(tokio::spawn(async move {
            engine.ask("question", None).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn configured_assistant_id_skips_creation() {
    let api = MockApi::completing();
    let counter = api.assistants_created.clone();
    let runs = api.run_assistants.clone();
    let addr = spawn_api(api).await;
    let engine = engine_for(addr, Some("asst_preset"));

    engine.ask("question", None).await.unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(*runs.lock().unwrap(), vec!["asst_preset".to_string()]);
}

#[tokio::test]
async fn pending_run_is_polled_to_completion() {
    let api = MockApi {
        initial_run_status: "queued",
        ..MockApi::completing()
    };
    let addr = spawn_api(api).await;
    let engine = engine_for(addr, None);

    let kb = engine.ask("question", None).await.unwrap();
    assert_eq!(kb.answer, "grounded answer");
}

#[tokio::test]
async fn failed_run_surfaces_the_upstream_error_message() {
    let api = MockApi {
        initial_run_status: "failed",
        polled_run_status: "failed",
        run_error_message: Some("vector store missing"),
        ..MockApi::completing()
    };
    let addr = spawn_api(api).await;
    let engine = engine_for(addr, None);

    let result = engine.ask("question", None).await;
    match result {
        Err(VoiceError::Kb(detail)) => assert!(detail.contains("vector store missing")),
        other => panic!("expected kb error, got {:?}", other),
    }
}

#[tokio::test]
async fn expired_run_reports_its_status() {
    let api = MockApi {
        initial_run_status: "expired",
        polled_run_status: "expired",
        ..MockApi::completing()
    };
    let addr = spawn_api(api).await;
    let engine = engine_for(addr, None);

    let result = engine.ask("question", None).await;
    match result {
        Err(VoiceError::Kb(detail)) => assert!(detail.contains("expired")),
        other => panic!("expected kb error, got {:?}", other),
    }
}
