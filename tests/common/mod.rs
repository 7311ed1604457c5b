#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use hisab_ledger::{config::AppConfig, db, AppState};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;

/// Helper harness for spinning up an application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Like [`TestApp::new`] but lets the caller adjust configuration first.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection keeps every query on the same in-memory database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg).expect("failed to build app state");
        let router = hisab_ledger::build_router(state.clone(), CorsLayer::permissive());

        Self { router, state }
    }

    /// Send a request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Request and decode the JSON body (Null for empty bodies).
    pub async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn create_party(&self, name: &str) -> i32 {
        let (status, body) = self
            .json(Method::POST, "/api/v1/parties", Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create party failed: {body}");
        body["id"].as_i64().expect("party id") as i32
    }

    pub async fn create_factory(&self, name: &str) -> i32 {
        let (status, body) = self
            .json(Method::POST, "/api/v1/factories", Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create factory failed: {body}");
        body["id"].as_i64().expect("factory id") as i32
    }

    pub async fn post_transaction(&self, payload: Value) -> Value {
        let (status, body) = self
            .json(Method::POST, "/api/v1/transactions", Some(payload))
            .await;
        assert_eq!(status, StatusCode::CREATED, "transaction failed: {body}");
        body
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is not json")
    }
}

/// Reads a decimal that was serialized as a JSON string or number.
pub fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected a decimal, got {other}"),
    }
}
