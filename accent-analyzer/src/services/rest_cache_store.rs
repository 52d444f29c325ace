//! Networked cache store over a Redis REST endpoint
//!
//! **Outbound:** `POST {cache_url}` with a bearer token and the command as a
//! JSON array, e.g. `["SET", "accent:ab12..", "{..}", "EX", "3600"]`. The
//! endpoint answers `{"result": ...}` on success and `{"error": "..."}` when
//! the command is rejected.
//!
//! Shared across service instances, which is why cache keys are stable digests.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::cache_store::{CacheError, CacheStore};

const USER_AGENT: &str = concat!("accent-analyzer/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT_SECS: u64 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Cache engine reached over HTTP
pub struct RestCacheStore {
    http_client: reqwest::Client,
    url: String,
    token: String,
}

impl RestCacheStore {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Result<Self, CacheError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Run one command and return its `result` value
    async fn command(&self, args: Value) -> Result<Value, CacheError> {
        let response = self
            .http_client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let reply: Option<CommandReply> = serde_json::from_str(&body).ok();
        if let Some(message) = reply.as_ref().and_then(|r| r.error.clone()) {
            return Err(CacheError::Connection(format!("{} ({})", message, status.as_u16())));
        }
        if !status.is_success() {
            return Err(CacheError::Connection(format!(
                "cache endpoint answered {}",
                status.as_u16()
            )));
        }

        let reply = reply.ok_or_else(|| {
            CacheError::Serialization(format!("unreadable cache reply: {}", truncate(&body)))
        })?;
        Ok(reply.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl CacheStore for RestCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self.command(json!(["GET", key])).await? {
            Value::Null => Ok(None),
            Value::String(value) => Ok(Some(value)),
            other => Err(CacheError::Serialization(format!(
                "GET {} returned non-string {}",
                key, other
            ))),
        }
    }

    async fn set_ex(&self, key: &str, ttl: Duration, value: String) -> Result<(), CacheError> {
        // Sub-second TTLs still expire
        let seconds = ttl.as_secs().max(1);
        self.command(json!(["SET", key, value, "EX", seconds.to_string()]))
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        match self.command(json!(["PING"])).await? {
            Value::String(pong) if pong.eq_ignore_ascii_case("PONG") => Ok(()),
            other => Err(CacheError::Connection(format!("unexpected PING reply {}", other))),
        }
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(120) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
