//! Fire-and-forget domain events sent to the orchestrator.

use axum::http::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use axum::http::Method;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::observability::metrics;
use crate::upstream::{Upstream, UpstreamCall, UpstreamClient};

const SOURCE: &str = "api-gateway";

#[derive(Debug, Serialize)]
pub struct Event<T> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: T,
    pub meta: EventMeta,
}

#[derive(Debug, Serialize)]
pub struct EventMeta {
    pub timestamp: String,
    pub source: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UserDeleted {
    pub username: String,
}

impl Event<UserDeleted> {
    pub fn user_deleted(username: &str) -> Self {
        Self {
            kind: "user.deleted",
            data: UserDeleted {
                username: username.to_string(),
            },
            meta: EventMeta {
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                source: SOURCE,
            },
        }
    }
}

/// Publishes events on detached tasks; outcomes only reach logs and metrics.
#[derive(Clone)]
pub struct EventPublisher {
    client: UpstreamClient,
    orchestrator_url: String,
}

impl EventPublisher {
    pub fn new(client: UpstreamClient, orchestrator_url: impl Into<String>) -> Self {
        Self {
            client,
            orchestrator_url: orchestrator_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Announce a deleted account. The caller's credential is forwarded.
    ///
    /// Handlers drop the returned handle; it exists so callers can observe completion.
    pub fn publish_user_deleted(&self, username: &str, credential: HeaderValue) -> JoinHandle<()> {
        let event = Event::user_deleted(username);
        let url = format!("{}/orchestrator/user-deleted", self.orchestrator_url);
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, credential);

            let call = match UpstreamCall::new(Upstream::Orchestrator, Method::POST, url, headers)
                .with_json(&event)
            {
                Ok(call) => call,
                Err(e) => {
                    tracing::error!(error = %e, event = event.kind, "Failed to encode event");
                    metrics::record_event_published(event.kind, "encode_error");
                    return;
                }
            };

            let result = client.call(call).await;
            match result.status() {
                Some(status) if status.is_success() => {
                    tracing::info!(event = event.kind, username = %event.data.username, status = status.as_u16(), "Event published");
                    metrics::record_event_published(event.kind, "ok");
                }
                Some(status) => {
                    tracing::warn!(event = event.kind, username = %event.data.username, status = status.as_u16(), "Orchestrator rejected event");
                    metrics::record_event_published(event.kind, "rejected");
                }
                None => {
                    tracing::warn!(event = event.kind, username = %event.data.username, "Event not delivered");
                    metrics::record_event_published(event.kind, "transport_error");
                }
            }
        })
    }
}
