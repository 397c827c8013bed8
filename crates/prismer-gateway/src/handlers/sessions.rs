//! Session bookkeeping endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use prismer_agent::AgentRunner;
use prismer_core::SessionId;
use prismer_store::{session, SessionRecord, SessionStore, StoreError};

use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request body for creating a session.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// Use this id instead of generating one.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response for listing sessions.
#[derive(Debug, Serialize)]
pub struct ListSessionsResponse {
    /// Sessions, most recently active first.
    pub sessions: Vec<SessionRecord>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List all sessions.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn list_sessions<R, S>(
    State(state): State<Arc<GatewayState<R, S>>>,
) -> Result<impl IntoResponse, ApiError>
where
    R: AgentRunner + 'static,
    S: SessionStore + 'static,
{
    let sessions = state.sessions.list_sessions()?;
    Ok(Json(ListSessionsResponse { sessions }))
}

/// Create a session. The body is optional.
///
/// # Errors
///
/// Returns `bad_request` for a malformed session id.
pub async fn create_session<R, S>(
    State(state): State<Arc<GatewayState<R, S>>>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<impl IntoResponse, ApiError>
where
    R: AgentRunner + 'static,
    S: SessionStore + 'static,
{
    let requested = body
        .and_then(|Json(body)| body.session_id)
        .filter(|id| !id.is_empty())
        .map(|id| parse_session_id(&id))
        .transpose()?;

    let record = session::create_session(state.sessions.as_ref(), requested)?;
    tracing::info!(session_id = %record.id, "Session created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// Get a session by id.
///
/// # Errors
///
/// Returns `not_found` if the session doesn't exist.
pub async fn get_session<R, S>(
    State(state): State<Arc<GatewayState<R, S>>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    R: AgentRunner + 'static,
    S: SessionStore + 'static,
{
    let id = parse_session_id(&session_id)?;
    let record = state
        .sessions
        .get_session(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("session {id}")))?;
    Ok(Json(record))
}

/// Delete a session. Deleting an unknown session succeeds.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn delete_session<R, S>(
    State(state): State<Arc<GatewayState<R, S>>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    R: AgentRunner + 'static,
    S: SessionStore + 'static,
{
    let id = parse_session_id(&session_id)?;
    match state.sessions.delete_session(&id) {
        Ok(()) | Err(StoreError::NotFound) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_session_id(s: &str) -> Result<SessionId, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid session ID: {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_app;
    use prismer_agent::ScriptedSpawner;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn create_get_list_delete() {
        let app = test_app(ScriptedSpawner::new());

        let response = app.server.post("/api/v1/sessions").await;
        response.assert_status(StatusCode::CREATED);
        let created: Value = response.json();
        let id = created["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("session-"));
        assert_eq!(created["message_count"], 0);

        let response = app.server.get(&format!("/api/v1/sessions/{id}")).await;
        response.assert_status_ok();

        let response = app.server.get("/api/v1/sessions").await;
        let listed: Value = response.json();
        assert_eq!(listed["sessions"].as_array().unwrap().len(), 1);

        app.server
            .delete(&format!("/api/v1/sessions/{id}"))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        app.server
            .get(&format!("/api/v1/sessions/{id}"))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        app.server
            .delete(&format!("/api/v1/sessions/{id}"))
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn create_with_explicit_id() {
        let app = test_app(ScriptedSpawner::new());
        let response = app
            .server
            .post("/api/v1/sessions")
            .json(&json!({"session_id": "my-session"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: Value = response.json();
        assert_eq!(created["id"], "my-session");
    }

    #[tokio::test]
    async fn malformed_id_rejected() {
        let app = test_app(ScriptedSpawner::new());
        let response = app
            .server
            .post("/api/v1/sessions")
            .json(&json!({"session_id": "has space"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
