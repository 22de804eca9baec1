//! REST client for the timer resource
//!
//! [`TimerBackend`] is the seam the session talks through; [`HttpTimerBackend`]
//! is the reqwest implementation against `/api/timer`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{TimerError, TimerResult},
    state::timer::{NewTimer, Timer},
};

use super::credentials::CredentialProvider;

/// Operations offered by the timer resource. Every call is one round-trip
/// and nothing is retried.
#[async_trait]
pub trait TimerBackend: Send + Sync {
    async fn create(&self, new_timer: &NewTimer) -> TimerResult<Timer>;
    async fn list_active(&self) -> TimerResult<Vec<Timer>>;
    async fn list_breaks(&self) -> TimerResult<Vec<Timer>>;
    async fn get(&self, id: i64) -> TimerResult<Timer>;
    async fn list_all(&self) -> TimerResult<Vec<Timer>>;
    async fn list_for_task(&self, task_id: i64) -> TimerResult<Vec<Timer>>;
    async fn pause(&self, id: i64) -> TimerResult<Timer>;
    async fn resume(&self, id: i64) -> TimerResult<Timer>;
    async fn stop(&self, id: i64) -> TimerResult<Timer>;
    async fn delete(&self, id: i64) -> TimerResult<()>;
}

/// Error body shape used by the backend.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct HttpTimerBackend {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpTimerBackend {
    /// * `base_url` - timer resource root, e.g. `http://localhost:8080/api/timer`.
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, credentials)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            credentials,
        }
    }

    fn request(&self, method: Method, path: &str) -> TimerResult<RequestBuilder> {
        let token = self
            .credentials
            .bearer_token()
            .ok_or(TimerError::MissingCredentials)?;
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn fetch_one(&self, builder: RequestBuilder, fallback: &str) -> TimerResult<Timer> {
        let response = ensure_success(builder.send().await?, fallback).await?;
        Timer::from_json(&response.bytes().await?)
    }

    async fn fetch_many(&self, builder: RequestBuilder, fallback: &str) -> TimerResult<Vec<Timer>> {
        let response = ensure_success(builder.send().await?, fallback).await?;
        Timer::list_from_json(&response.bytes().await?)
    }
}

/// Turn a non-2xx response into [`TimerError::Rejected`], preferring the
/// server's `message` field over `fallback`.
async fn ensure_success(response: Response, fallback: &str) -> TimerResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());

    Err(TimerError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl TimerBackend for HttpTimerBackend {
    async fn create(&self, new_timer: &NewTimer) -> TimerResult<Timer> {
        let builder = self.request(Method::POST, "")?.json(new_timer);
        self.fetch_one(builder, "Failed to create timer").await
    }

    async fn list_active(&self) -> TimerResult<Vec<Timer>> {
        let builder = self.request(Method::GET, "/active")?;
        self.fetch_many(builder, "Failed to get active timers").await
    }

    async fn list_breaks(&self) -> TimerResult<Vec<Timer>> {
        let builder = self.request(Method::GET, "/breaks")?;
        self.fetch_many(builder, "Failed to get break timers").await
    }

    async fn get(&self, id: i64) -> TimerResult<Timer> {
        let builder = self.request(Method::GET, &format!("/{id}"))?;
        self.fetch_one(builder, "Failed to get timer").await
    }

    async fn list_all(&self) -> TimerResult<Vec<Timer>> {
        let builder = self.request(Method::GET, "")?;
        self.fetch_many(builder, "Failed to get all timers").await
    }

    async fn list_for_task(&self, task_id: i64) -> TimerResult<Vec<Timer>> {
        let builder = self.request(Method::GET, &format!("/task/{task_id}"))?;
        self.fetch_many(builder, "Failed to get timers for task").await
    }

    async fn pause(&self, id: i64) -> TimerResult<Timer> {
        let builder = self.request(Method::PUT, &format!("/{id}/pause"))?;
        self.fetch_one(builder, "Failed to pause timer").await
    }

    async fn resume(&self, id: i64) -> TimerResult<Timer> {
        let builder = self.request(Method::PUT, &format!("/{id}/resume"))?;
        self.fetch_one(builder, "Failed to resume timer").await
    }

    async fn stop(&self, id: i64) -> TimerResult<Timer> {
        let builder = self.request(Method::PUT, &format!("/{id}/stop"))?;
        self.fetch_one(builder, "Failed to stop timer").await
    }

    async fn delete(&self, id: i64) -> TimerResult<()> {
        let builder = self.request(Method::DELETE, &format!("/{id}"))?;
        ensure_success(builder.send().await?, "Failed to delete timer").await?;
        Ok(())
    }
}
