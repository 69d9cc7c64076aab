use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// What `/echo` saw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

/// Request counts keyed by path. `/hits` itself is not counted.
pub type Hits = Arc<RwLock<HashMap<String, u64>>>;

#[derive(Clone, Default)]
pub struct AppState {
    hits: Hits,
    flaky: Arc<RwLock<HashMap<u32, u32>>>,
}

pub fn app() -> Router {
    let state = AppState::default();
    Router::new()
        .route("/items", get(items))
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/flaky/{failures}", any(flaky))
        .route("/slow/{millis}", get(slow))
        .route("/text", get(text))
        .route("/redirect", any(redirect))
        .route("/big/{bytes}", get(big))
        .route("/hits", get(hits))
        .layer(middleware::from_fn_with_state(state.clone(), count_hits))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn count_hits(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if path != "/hits" {
        *state.hits.write().await.entry(path).or_insert(0) += 1;
    }
    next.run(request).await
}

async fn items() -> Json<Value> {
    Json(json!({"id": 1}))
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    Json(Echo {
        method: method.to_string(),
        headers,
        body,
    })
}

async fn status(Path(code): Path<u16>) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"status": status.as_u16()})))
}

/// Answers 503 for the first `failures` calls, then 200.
async fn flaky(State(state): State<AppState>, Path(failures): Path<u32>) -> (StatusCode, Json<Value>) {
    let attempt = {
        let mut counts = state.flaky.write().await;
        let count = counts.entry(failures).or_insert(0);
        *count += 1;
        *count
    };
    let status = if attempt <= failures {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(json!({"attempt": attempt})))
}

async fn slow(Path(millis): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Json(json!({"slept_ms": millis}))
}

async fn text() -> &'static str {
    "not json"
}

/// Permanent redirect to `/items`.
async fn redirect() -> (StatusCode, [(header::HeaderName, &'static str); 1], Json<Value>) {
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, "/items")],
        Json(json!({"moved": "/items"})),
    )
}

/// A JSON object whose `pad` string is `bytes` long.
async fn big(Path(bytes): Path<usize>) -> Json<Value> {
    Json(json!({"pad": "x".repeat(bytes)}))
}

async fn hits(State(state): State<AppState>) -> Json<HashMap<String, u64>> {
    Json(state.hits.read().await.clone())
}
