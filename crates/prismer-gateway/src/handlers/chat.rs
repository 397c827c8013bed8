//! Chat endpoint.
//!
//! `POST /api/v1/chat` runs one agent invocation. With `stream: true` (the
//! default) the response is an SSE stream of [`StreamEvent`]s ending in
//! `data: [DONE]`; otherwise it is a single JSON [`BufferedReply`].
//!
//! [`BufferedReply`]: prismer_agent::BufferedReply

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self, Stream};
use serde::Deserialize;
use tokio::sync::mpsc;

use prismer_agent::{AgentRequest, AgentRunner, Credentials};
use prismer_core::{SessionId, StreamEvent};
use prismer_store::{session, SessionStore};

use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request Types
// =============================================================================

/// Request body for a chat message.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    #[serde(default)]
    pub content: String,
    /// Conversation to continue.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Stream the response as SSE.
    #[serde(default = "ChatRequest::default_stream")]
    pub stream: bool,
    /// Provider settings.
    #[serde(default)]
    pub config: Option<ProviderSettings>,
}

impl ChatRequest {
    const fn default_stream() -> bool {
        true
    }
}

/// Provider settings sent with a chat message.
#[derive(Debug, Default, Deserialize)]
pub struct ProviderSettings {
    /// API key for the provider.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Provider name.
    #[serde(default)]
    pub provider: Option<String>,
    /// Model name.
    #[serde(default)]
    pub model: Option<String>,
}

impl ProviderSettings {
    /// Credentials to forward, if an API key was given.
    fn into_credentials(self) -> Option<Credentials> {
        let api_key = self.api_key.filter(|key| !key.trim().is_empty())?;
        Some(Credentials {
            api_key,
            provider: self
                .provider
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| "google".to_string()),
            model: self.model,
        })
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Send a message to the agent.
///
/// # Errors
///
/// Returns `bad_request` for an empty message or malformed session id. In
/// buffered mode agent failures are returned as `agent_error` or
/// `spawn_error`; in streaming mode they arrive as `error` events instead.
pub async fn chat<R, S>(
    State(state): State<Arc<GatewayState<R, S>>>,
    Json(body): Json<ChatRequest>,
) -> Result<Response, ApiError>
where
    R: AgentRunner + 'static,
    S: SessionStore + 'static,
{
    if body.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Content is required".to_string()));
    }

    let session_id = body
        .session_id
        .filter(|id| !id.is_empty())
        .map(|id| id.parse::<SessionId>())
        .transpose()?;

    if let Some(id) = &session_id {
        if let Err(e) = session::record_activity(state.sessions.as_ref(), id) {
            tracing::warn!(session_id = %id, error = %e, "Failed to record session activity");
        }
    }

    tracing::info!(
        session_id = ?session_id.as_ref().map(SessionId::as_str),
        stream = body.stream,
        "Chat request"
    );

    let mut request = AgentRequest::new(body.content);
    request.session_id = session_id;
    request.credentials = body.config.and_then(ProviderSettings::into_credentials);

    if !body.stream {
        let reply = state.agent.complete(request).await?;
        return Ok(Json(reply).into_response());
    }

    let events = state.agent.stream(request);
    Ok(sse_response(events, state.config.keep_alive()))
}

// =============================================================================
// Helpers
// =============================================================================

/// Wrap an event receiver as an SSE response.
///
/// The stream ends when the sender is dropped, which happens right after
/// `done`. Dropping the response body drops the receiver and stops the agent.
fn sse_response(events: mpsc::Receiver<StreamEvent>, keep_alive: Duration) -> Response {
    let sse = Sse::new(event_stream(events)).keep_alive(KeepAlive::new().interval(keep_alive));
    ([("x-accel-buffering", "no")], sse).into_response()
}

fn event_stream(
    events: mpsc::Receiver<StreamEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(events, |mut events| async move {
        let event = events.recv().await?;
        Some((Ok(to_sse_event(&event)), events))
    })
}

fn to_sse_event(event: &StreamEvent) -> Event {
    match event.to_sse_data() {
        Ok(data) => Event::default().data(data),
        Err(e) => {
            tracing::warn!(event = event.type_name(), error = %e, "Failed to encode stream event");
            Event::default().data(r#"{"type":"error","data":{"error":"failed to encode event"}}"#)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sse_payloads, test_app};
    use axum::http::StatusCode;
    use prismer_agent::ScriptedSpawner;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn empty_content_rejected() {
        let app = test_app(ScriptedSpawner::new());
        let response = app
            .server
            .post("/api/v1/chat")
            .json(&json!({"content": "   "}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "bad_request");
        assert_eq!(body["error"]["message"], "Content is required");
    }

    #[tokio::test]
    async fn streams_scenario_events() {
        let app = test_app(
            ScriptedSpawner::new()
                .stdout("Done. [[UI:show_artifact:/output/plot.png]]See /workspace/output/plot.png"),
        );
        let response = app
            .server
            .post("/api/v1/chat")
            .json(&json!({"content": "run the script"}))
            .await;
        response.assert_status_ok();
        assert_eq!(response.header("x-accel-buffering"), "no");
        assert!(response
            .header("content-type")
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));

        let payloads = sse_payloads(&response.text());
        assert_eq!(
            payloads,
            vec![
                r#"{"type":"content_delta","data":{"content":"Done. See /workspace/output/plot.png"}}"#,
                r#"{"type":"ui_directive","data":{"type":"show_artifact","payload":"/output/plot.png"}}"#,
                r#"{"type":"ui_directive","data":{"type":"open_file","payload":"/output/plot.png"}}"#,
                r#"{"type":"ui_directive","data":{"type":"refresh_artifacts","payload":""}}"#,
                "[DONE]",
            ]
        );
    }

    #[tokio::test]
    async fn spawn_failure_still_ends_with_done() {
        let app = test_app(ScriptedSpawner::new().fail_spawn("agent missing"));
        let response = app
            .server
            .post("/api/v1/chat")
            .json(&json!({"content": "hi"}))
            .await;
        let payloads = sse_payloads(&response.text());
        assert_eq!(payloads.len(), 2);
        assert!(payloads[0].contains("Failed to start agent"));
        assert_eq!(payloads[1], "[DONE]");
    }

    #[tokio::test]
    async fn buffered_reply() {
        let app = test_app(ScriptedSpawner::new().stdout("Here. [[UI:open_panel]]"));
        let response = app
            .server
            .post("/api/v1/chat")
            .json(&json!({"content": "hi", "stream": false, "session_id": "s-1"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["content"], "Here.");
        assert_eq!(body["session_id"], "s-1");
        assert_eq!(body["directives"][0]["type"], "open_panel");
    }

    #[tokio::test]
    async fn buffered_reply_includes_detected_paths() {
        let app = test_app(ScriptedSpawner::new().stdout("Saved /workspace/output/a.png"));
        let response = app
            .server
            .post("/api/v1/chat")
            .json(&json!({"content": "plot", "stream": false}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(
            body["directives"],
            json!([{"type": "open_file", "payload": "/output/a.png"}])
        );
    }

    #[tokio::test]
    async fn buffered_failures() {
        let app = test_app(ScriptedSpawner::new().exit_code(Some(1)));
        let response = app
            .server
            .post("/api/v1/chat")
            .json(&json!({"content": "hi", "stream": false}))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "agent_error");
        assert_eq!(body["error"]["message"], "Agent exited with code 1");

        let app = test_app(ScriptedSpawner::new().fail_spawn("missing"));
        let response = app
            .server
            .post("/api/v1/chat")
            .json(&json!({"content": "hi", "stream": false}))
            .await;
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "spawn_error");
    }

    #[tokio::test]
    async fn session_and_credentials_reach_the_agent() {
        let app = test_app(ScriptedSpawner::new().stdout("ok"));
        app.server
            .post("/api/v1/chat")
            .json(&json!({
                "content": "hi",
                "session_id": "abc",
                "config": {"api_key": "sk-1", "provider": "openai"}
            }))
            .await
            .assert_status_ok();

        let invocations = app.agent.spawner().invocations();
        assert_eq!(invocations.len(), 1);
        assert!(invocations[0].args.windows(2).any(|w| w == ["--session-id", "abc"]));
        assert_eq!(invocations[0].env["OPENAI_API_KEY"], "sk-1");

        let record = app
            .sessions
            .get_session(&"abc".parse().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(record.message_count, 1);
    }

    #[tokio::test]
    async fn invalid_session_id_rejected() {
        let app = test_app(ScriptedSpawner::new());
        let response = app
            .server
            .post("/api/v1/chat")
            .json(&json!({"content": "hi", "session_id": "--help"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(app.agent.spawner().invocations().is_empty());
    }

    #[test]
    fn empty_api_key_is_ignored() {
        let settings = ProviderSettings {
            api_key: Some(String::new()),
            ..ProviderSettings::default()
        };
        assert!(settings.into_credentials().is_none());

        let settings = ProviderSettings {
            api_key: Some("k".into()),
            ..ProviderSettings::default()
        };
        assert_eq!(settings.into_credentials().unwrap().provider, "google");
    }
}
