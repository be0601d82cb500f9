#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use textq_api::app::build_app;
use textq_api::auth::jwt::{generate_access_token, JwtConfig};
use textq_api::config::ServerConfig;
use textq_api::state::AppState;
use textq_queue::{AmqpConfig, MemoryTaskQueue};
use textq_store::redis::RedisConfig;
use textq_store::MemoryStore;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin and a 30-second request
/// timeout. The Redis and AMQP settings are never dialled: tests run
/// against in-memory backends.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret-long-enough".to_string(),
            access_token_expiry_mins: 5,
        },
        redis: RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            key_prefix: String::new(),
        },
        amqp: AmqpConfig::default(),
    }
}

/// Build the full application router over the given backends, with the
/// same middleware stack production uses.
pub fn build_test_app(store: Arc<MemoryStore>, queue: Arc<MemoryTaskQueue>) -> Router {
    build_app(AppState::new(test_config(), store, queue))
}

/// A valid bearer token for the test secret.
pub fn token() -> String {
    generate_access_token("tester", &test_config().jwt).expect("token generation")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("response body is JSON")
}
