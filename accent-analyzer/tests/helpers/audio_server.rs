//! Local HTTP server hosting audio fixtures
//!
//! Serves registered files by path and counts every request, so tests can
//! assert that an audio URL was (or was not) fetched.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One hosted file
#[derive(Debug, Clone)]
pub struct ServedFile {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl ServedFile {
    pub fn wav(body: Vec<u8>) -> Self {
        Self {
            content_type: "audio/wav".to_string(),
            body,
        }
    }

    pub fn html(body: &str) -> Self {
        Self {
            content_type: "text/html; charset=utf-8".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }
}

struct ServerState {
    files: HashMap<String, ServedFile>,
    hits: AtomicUsize,
}

/// Running fixture server; stops when the test runtime shuts down
pub struct AudioServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

impl AudioServer {
    /// Start serving `files`, keyed by path without the leading slash
    pub async fn start(files: Vec<(&str, ServedFile)>) -> Self {
        let state = Arc::new(ServerState {
            files: files
                .into_iter()
                .map(|(path, file)| (path.trim_start_matches('/').to_string(), file))
                .collect(),
            hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/*path", get(serve_file))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// Absolute URL for a hosted path
    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    /// Requests received so far, including 404s
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

async fn serve_file(State(state): State<Arc<ServerState>>, Path(path): Path<String>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    match state.files.get(&path) {
        Some(file) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, file.content_type.clone())],
            file.body.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
