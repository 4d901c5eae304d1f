// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Hosted UI server routes
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /health` | Liveness and uptime |
//! | `GET /presence?ttl=` | Full liveness report |
//! | `GET /leader?ttl=` | Current leader derived from the active set |
//! | `POST /submit/text` | Form: `agent_id?`, `text` |
//! | `POST /submit/link` | Form: `agent_id?`, `url`, `comment?` |
//! | `POST /submit/file` | Multipart: `agent_id?`, `file`, `comment?` |
//!
//! Store failures answer 502; the server never turns one into an empty
//! success.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use crate::application::inbox::{InboxError, InboxService};
use crate::application::presence::{PresenceError, PresenceService};
use crate::domain::inbox::{FileUpload, Submission};

/// Upload bodies above this are refused before reaching the handler.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub struct AppState {
    pub presence: Arc<PresenceService>,
    pub inbox: Arc<InboxService>,
    /// Agent id used when a submission does not name one
    pub agent_id: String,
    pub default_ttl_seconds: u64,
    pub start_time: Instant,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/presence", get(presence_handler))
        .route("/leader", get(leader_handler))
        .route("/submit/text", post(submit_text_handler))
        .route("/submit/link", post(submit_link_handler))
        .route("/submit/file", post(submit_file_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(Arc::new(state))
}

#[derive(Debug, Deserialize)]
pub struct TtlQuery {
    pub ttl: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TextForm {
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkForm {
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub comment: String,
}

/// Error body shared by every route
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<PresenceError> for ApiError {
    fn from(err: PresenceError) -> Self {
        warn!(error = %err, "Presence request failed");
        Self { status: StatusCode::BAD_GATEWAY, message: err.to_string() }
    }
}

impl From<InboxError> for ApiError {
    fn from(err: InboxError) -> Self {
        match err {
            InboxError::InvalidSubmission(msg) => Self::bad_request(msg),
            other => {
                warn!(error = %other, "Submission failed");
                Self { status: StatusCode::BAD_GATEWAY, message: other.to_string() }
            }
        }
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

async fn presence_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TtlQuery>,
) -> Result<Response, ApiError> {
    let ttl = query.ttl.unwrap_or(state.default_ttl_seconds);
    let report = state.presence.list_active(ttl).await?;
    Ok(Json(report).into_response())
}

async fn leader_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TtlQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ttl = query.ttl.unwrap_or(state.default_ttl_seconds);
    let report = state.presence.list_active(ttl).await?;
    Ok(Json(json!({
        "leader": report.leader(),
        "active_count": report.active_count,
        "ttl_seconds": report.ttl_seconds,
    })))
}

async fn submit_text_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TextForm>,
) -> Result<Response, ApiError> {
    let agent_id = resolve_agent(&state, form.agent_id);
    submit(&state, &agent_id, Submission::Text { text: form.text }).await
}

async fn submit_link_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LinkForm>,
) -> Result<Response, ApiError> {
    let agent_id = resolve_agent(&state, form.agent_id);
    submit(&state, &agent_id, Submission::Link { url: form.url, comment: form.comment }).await
}

async fn submit_file_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut agent_id = None;
    let mut comment = String::new();
    let mut upload: Option<FileUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "agent_id" => {
                agent_id = Some(field.text().await.map_err(|e| ApiError::bad_request(e.to_string()))?);
            }
            "comment" => {
                comment = field.text().await.map_err(|e| ApiError::bad_request(e.to_string()))?;
            }
            "file" => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| ApiError::bad_request(e.to_string()))?;
                upload = Some(FileUpload {
                    filename,
                    content_type,
                    data: data.to_vec(),
                    comment: String::new(),
                });
            }
            _ => {}
        }
    }

    let mut upload = upload.ok_or_else(|| ApiError::bad_request("missing file field"))?;
    upload.comment = comment;
    let agent_id = resolve_agent(&state, agent_id);
    submit(&state, &agent_id, Submission::File(upload)).await
}

fn resolve_agent(state: &AppState, requested: Option<String>) -> String {
    requested
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| state.agent_id.clone())
}

async fn submit(state: &AppState, agent_id: &str, submission: Submission) -> Result<Response, ApiError> {
    let receipt = state.inbox.submit(agent_id, submission).await?;
    Ok((StatusCode::CREATED, Json(receipt)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::domain::inbox::InboxLimits;
    use crate::infrastructure::codec::EnvelopeCodec;
    use crate::infrastructure::storage::memory::InMemoryObjectStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use chrono::{TimeZone, Utc};
    use tower::ServiceExt;

    fn test_app(store: Arc<InMemoryObjectStore>) -> Router {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()));
        let codec = Arc::new(EnvelopeCodec::disabled());
        app(AppState {
            presence: Arc::new(PresenceService::new(store.clone(), codec.clone(), clock.clone())),
            inbox: Arc::new(InboxService::new(store, codec, clock, InboxLimits::default())),
            agent_id: "host".to_string(),
            default_ttl_seconds: 900,
            start_time: Instant::now(),
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app(Arc::new(InMemoryObjectStore::new()));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_leader_route() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.insert(
            "logs/presence/agent-b.json",
            br#"{"ts":"2026-03-01T11:59:00Z","agent_id":"b","client":"c","note":""}"#,
        );
        store.insert(
            "logs/presence/agent-a.json",
            br#"{"ts":"2026-03-01T11:58:00Z","agent_id":"a","client":"c","note":""}"#,
        );
        let app = test_app(store);

        let response = app
            .oneshot(Request::builder().uri("/leader?ttl=900").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["leader"], "a");
        assert_eq!(json["active_count"], 2);
    }

    #[tokio::test]
    async fn test_presence_store_failure_is_502() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.fail_reads(true);
        let app = test_app(store);
        let response = app
            .oneshot(Request::builder().uri("/presence").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_submit_text_created() {
        let store = Arc::new(InMemoryObjectStore::new());
        let app = test_app(store.clone());
        let response = app.oneshot(form("/submit/text", "agent_id=main&text=hello+hive")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["path"], "inbox/2026-03-01T12-00-00Z__raw__agent-main__text.md");
        assert_eq!(json["encrypted"], false);
        assert_eq!(store.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_link_defaults_agent_and_rejects_empty_url() {
        let store = Arc::new(InMemoryObjectStore::new());
        let app = test_app(store.clone());

        let response = app
            .clone()
            .oneshot(form("/submit/link", "url=https%3A%2F%2Fexample.org"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(body_json(response).await["path"].as_str().unwrap().contains("agent-host__link"));

        let response = app.oneshot(form("/submit/link", "comment=no+url")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_file_multipart() {
        let store = Arc::new(InMemoryObjectStore::new());
        let app = test_app(store.clone());

        let boundary = "XBOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"agent_id\"\r\n\r\nmain\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"comment\"\r\n\r\nsee attached\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
             Content-Type: text/plain\r\n\r\nabc\r\n--{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method("POST")
            .uri("/submit/file")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let path = body_json(response).await["path"].as_str().unwrap().to_string();
        let stored = String::from_utf8(store.get_bytes(&path).unwrap()).unwrap();
        assert!(stored.contains("\"filename\": \"a.txt\""));
        assert!(stored.contains("\"comment\": \"see attached\""));
        assert!(stored.contains("\"inline_b64\": \"YWJj\""));
    }

    #[tokio::test]
    async fn test_submit_store_failure_is_502() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.fail_writes(true);
        let app = test_app(store);
        let response = app.oneshot(form("/submit/text", "text=x")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
