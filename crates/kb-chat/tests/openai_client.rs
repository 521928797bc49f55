//! OpenAI-compatible client against a local stub API

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

use kb_chat::providers::{ChatMessage, ChatProvider, EmbeddingProvider, OpenAiClient};
use kb_chat::{ChatConfig, Error};

type Recorded = Arc<Mutex<Vec<Value>>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer test-key")
}

/// Returns embeddings in reverse order, each tagged with its input index
async fn embeddings(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
    }
    recorded.lock().push(body.clone());

    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(i, text)| {
            let len = text.as_str().map(|s| s.len()).unwrap_or(0);
            json!({"object": "embedding", "index": i, "embedding": [i as f32, len as f32]})
        })
        .collect();

    (StatusCode::OK, Json(json!({"object": "list", "data": data})))
}

async fn completions(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
    }
    recorded.lock().push(body);
    (
        StatusCode::OK,
        Json(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "stub answer"}}]
        })),
    )
}

async fn stub_api() -> (String, Recorded) {
    let recorded: Recorded = Arc::default();
    let router = Router::new()
        .route("/v1/embeddings", post(embeddings))
        .route("/v1/chat/completions", post(completions))
        .with_state(recorded.clone());
    (common::spawn(router).await, recorded)
}

/// Embeddings endpoint that fails its first call with a 500
async fn flaky_api() -> (String, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/v1/embeddings",
            post(|State(calls): State<Arc<AtomicUsize>>| async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "overloaded"})));
                }
                (
                    StatusCode::OK,
                    Json(json!({"data": [{"index": 0, "embedding": [0.5, 0.5]}]})),
                )
            }),
        )
        .with_state(calls.clone());
    (common::spawn(router).await, calls)
}

fn client_with_retries(base_url: &str, api_key: &str, max_retries: u32) -> OpenAiClient {
    let mut config = ChatConfig::default();
    config.llm.base_url = base_url.to_string();
    config.llm.api_key = api_key.to_string();
    config.llm.timeout_secs = 5;
    config.llm.max_retries = max_retries;
    OpenAiClient::new(&config).unwrap()
}

fn client(base_url: &str, api_key: &str) -> OpenAiClient {
    client_with_retries(base_url, api_key, 0)
}

#[tokio::test]
async fn test_embed_batch_orders_by_index() {
    let (base_url, recorded) = stub_api().await;
    let client = client(&base_url, "test-key");

    let texts = vec!["a".to_string(), "bbb".to_string(), "cc".to_string()];
    let vectors = client.embed_batch(&texts).await.unwrap();

    assert_eq!(vectors, vec![vec![0.0, 1.0], vec![1.0, 3.0], vec![2.0, 2.0]]);

    let requests = recorded.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["model"], "text-embedding-ada-002");
    assert_eq!(requests[0]["input"], json!(["a", "bbb", "cc"]));
}

#[tokio::test]
async fn test_chat_request_shape() {
    let (base_url, recorded) = stub_api().await;
    let client = client(&base_url, "test-key");

    let messages = vec![
        ChatMessage::system("context"),
        ChatMessage::user("q1"),
        ChatMessage::assistant("a1"),
        ChatMessage::user("q2"),
    ];
    let reply = client.generate(&messages).await.unwrap();
    assert_eq!(reply, "stub answer");

    let requests = recorded.lock();
    let body = &requests[0];
    assert_eq!(body["model"], "gpt-3.5-turbo");
    assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    assert_eq!(body["messages"][0], json!({"role": "system", "content": "context"}));
    assert_eq!(body["messages"][3], json!({"role": "user", "content": "q2"}));
}

#[tokio::test]
async fn test_rejected_key_surfaces_errors() {
    let (base_url, recorded) = stub_api().await;
    let client = client(&base_url, "wrong-key");

    let embed = client.embed("hello").await;
    assert!(matches!(embed, Err(Error::Embedding(ref m)) if m.contains("401")));

    let chat = client.generate(&[ChatMessage::user("hi")]).await;
    assert!(matches!(chat, Err(Error::Llm(_))));

    assert!(recorded.lock().is_empty());
}

#[tokio::test]
async fn test_unreachable_host() {
    // Nothing listens on port 9 locally
    let client = client("http://127.0.0.1:9", "test-key");
    assert!(matches!(client.embed("hello").await, Err(Error::Embedding(_))));
    assert!(!EmbeddingProvider::health_check(&client).await.unwrap());
}

#[tokio::test]
async fn test_failed_request_is_retried() {
    let (base_url, calls) = flaky_api().await;
    let client = client_with_retries(&base_url, "test-key", 1);

    let vector = client.embed("hello").await.unwrap();
    assert_eq!(vector, vec![0.5, 0.5]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_no_retry_by_default() {
    let (base_url, calls) = flaky_api().await;
    let client = client(&base_url, "test-key");

    assert!(matches!(client.embed("hello").await, Err(Error::Embedding(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
