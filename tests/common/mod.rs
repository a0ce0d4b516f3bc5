//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Document shape used across the integration tests.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Svc {
    pub port: u16,
    pub name: String,
}

#[derive(Default)]
struct GatewayState {
    entries: Mutex<HashMap<String, Vec<(Vec<u8>, i64)>>>,
    revision: AtomicI64,
    unhealthy: AtomicBool,
    failure: Mutex<Option<(StatusCode, Value)>>,
    range_calls: AtomicU64,
}

/// A minimal stand-in for the etcd v3 JSON gateway.
#[derive(Clone)]
pub struct MockGateway {
    pub addr: SocketAddr,
    state: Arc<GatewayState>,
}

impl MockGateway {
    /// Start a gateway on an ephemeral local port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(GatewayState::default());

        let app = Router::new()
            .route("/v3/maintenance/status", post(status))
            .route("/v3/kv/range", post(range))
            .with_state(state.clone());

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// Endpoint string in the `host:port` form users put in settings.
    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    /// Replace every entry under `key` with `value`.
    pub fn put(&self, key: &str, value: &str) -> i64 {
        let revision = self.state.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.state
            .entries
            .lock()
            .unwrap()
            .insert(key.to_string(), vec![(value.as_bytes().to_vec(), revision)]);
        revision
    }

    /// Add another match under `key`, as a prefix query would return.
    pub fn push(&self, key: &str, value: &str) {
        let revision = self.state.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.state
            .entries
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push((value.as_bytes().to_vec(), revision));
    }

    pub fn delete(&self, key: &str) {
        self.state.entries.lock().unwrap().remove(key);
    }

    /// Make the status probe fail.
    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.state.unhealthy.store(unhealthy, Ordering::SeqCst);
    }

    /// Answer every range request with a gateway error.
    pub fn fail_with(&self, status: StatusCode, code: i32, message: &str) {
        *self.state.failure.lock().unwrap() = Some((
            status,
            json!({ "error": message, "code": code, "message": message }),
        ));
    }

    pub fn clear_failure(&self) {
        *self.state.failure.lock().unwrap() = None;
    }

    pub fn range_calls(&self) -> u64 {
        self.state.range_calls.load(Ordering::SeqCst)
    }
}

async fn status(State(state): State<Arc<GatewayState>>) -> (StatusCode, Json<Value>) {
    if state.unhealthy.load(Ordering::SeqCst) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "code": 14, "message": "etcdserver: no leader" })),
        );
    }
    (StatusCode::OK, Json(json!({ "version": "3.5.17" })))
}

async fn range(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.range_calls.fetch_add(1, Ordering::SeqCst);

    if let Some((status, payload)) = state.failure.lock().unwrap().clone() {
        return (status, Json(payload));
    }

    let key = body["key"]
        .as_str()
        .and_then(|k| STANDARD.decode(k).ok())
        .map(|k| String::from_utf8_lossy(&k).into_owned())
        .unwrap_or_default();

    let revision = state.revision.load(Ordering::SeqCst).to_string();
    let entries = state.entries.lock().unwrap();

    match entries.get(&key) {
        Some(values) if !values.is_empty() => {
            let kvs: Vec<Value> = values
                .iter()
                .map(|(value, mod_revision)| {
                    json!({
                        "key": STANDARD.encode(&key),
                        "value": STANDARD.encode(value),
                        "create_revision": "1",
                        "mod_revision": mod_revision.to_string(),
                        "version": "1",
                    })
                })
                .collect();
            (
                StatusCode::OK,
                Json(json!({
                    "header": { "revision": revision },
                    "kvs": kvs,
                    "count": values.len().to_string(),
                })),
            )
        }
        _ => (StatusCode::OK, Json(json!({ "header": { "revision": revision } }))),
    }
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// An address that accepts connections and never answers on them.
pub async fn silent_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}
