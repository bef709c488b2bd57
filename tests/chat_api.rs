use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use wiremock::matchers::{body_partial_json, header as header_eq, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatbot_backend::core::config::AppConfig;
use chatbot_backend::server::router::router;
use chatbot_backend::state::AppState;

const CHAT_PATH: &str = "/openai/deployments/gpt-35-turbo/chat/completions";

fn config(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.azure_openai.endpoint = server.uri();
    config.azure_openai.api_key = "integration-key".to_string();
    config.azure_openai.max_tokens = 64;
    config.azure_openai.max_context_length = Some(4096);
    config.prompt.system_prompt_path = "prompts/missing-template.txt".to_string();
    config.retry.initial_delay_ms = 10;
    config.retry.max_delay_ms = 50;
    config
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn completion_recovers_from_a_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(query_param("api-version", "2024-02-01"))
        .and(header_eq("api-key", "integration-key"))
        .and(body_partial_json(json!({"stream": false, "max_tokens": 64})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "The core of an OS."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = AppState::initialize(config(&server)).unwrap();
    let response = router(state)
        .oneshot(post_json(
            "/chat/completion",
            json!([{"role": "user", "content": "What is a kernel?"}]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "The core of an OS.");
}

#[tokio::test]
async fn persistent_rate_limit_is_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let state = AppState::initialize(config(&server)).unwrap();
    let response = router(state)
        .oneshot(post_json(
            "/chat/completion",
            json!([{"role": "user", "content": "hi"}]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn stream_relays_upstream_deltas_as_events() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Ker\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"nel\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .expect(1)
        .mount(&server)
        .await;

    let state = AppState::initialize(config(&server)).unwrap();
    let response = router(state)
        .oneshot(post_json(
            "/chat/completion/stream",
            json!([
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"},
                {"role": "user", "content": "name the core of an OS"}
            ]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    let data: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();
    assert_eq!(data, vec!["Ker", "nel"]);
}

#[tokio::test]
async fn upstream_auth_failure_is_not_leaked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid subscription key"))
        .expect(1)
        .mount(&server)
        .await;

    let state = AppState::initialize(config(&server)).unwrap();
    let response = router(state)
        .oneshot(post_json(
            "/chat/completion",
            json!([{"role": "user", "content": "hi"}]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "An internal server error occurred.");
}
