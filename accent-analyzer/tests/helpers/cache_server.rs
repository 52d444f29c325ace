//! Local REST cache endpoint
//!
//! Understands the GET / SET ... EX / PING commands the shared cache client
//! sends, checks the bearer token and records TTLs so tests can assert them.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const CACHE_TOKEN: &str = "cache-token-0123456789abcdef";

#[derive(Default)]
struct Stored {
    values: HashMap<String, String>,
    ttls: HashMap<String, u64>,
}

/// Running fake cache; stops when the test runtime shuts down
pub struct CacheServer {
    addr: SocketAddr,
    stored: Arc<Mutex<Stored>>,
}

impl CacheServer {
    pub async fn start() -> Self {
        let stored = Arc::new(Mutex::new(Stored::default()));

        let app = Router::new()
            .route("/", post(run_command))
            .with_state(stored.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, stored }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.stored.lock().unwrap().values.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn ttl(&self, key: &str) -> Option<u64> {
        self.stored.lock().unwrap().ttls.get(key).copied()
    }
}

/// URL of a port nothing listens on
pub async fn closed_cache_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn run_command(
    State(stored): State<Arc<Mutex<Stored>>>,
    headers: HeaderMap,
    Json(args): Json<Vec<Value>>,
) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", CACHE_TOKEN));
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "WRONGPASS invalid or missing auth token"})),
        )
            .into_response();
    }

    let args: Vec<String> = args
        .iter()
        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
        .collect();
    let mut stored = stored.lock().unwrap();

    let result = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["PING"] => json!("PONG"),
        ["GET", key] => stored
            .values
            .get(*key)
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
        ["SET", key, value, "EX", seconds] => {
            let Ok(seconds) = seconds.parse::<u64>() else {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "ERR value is not an integer"})),
                )
                    .into_response();
            };
            stored.values.insert(key.to_string(), value.to_string());
            stored.ttls.insert(key.to_string(), seconds);
            json!("OK")
        }
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "ERR unknown command"})),
            )
                .into_response()
        }
    };

    Json(json!({ "result": result })).into_response()
}
