//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use prismer_agent::AgentRunner;
use prismer_store::SessionStore;

use crate::handlers::{artifacts, chat, files, health, sessions};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Health
/// - `GET /health`
/// - `GET /api/v1/status/health`
///
/// ## Chat
/// - `POST /api/v1/chat` - SSE stream or buffered JSON reply
///
/// ## Sessions
/// - `GET /api/v1/sessions` - List sessions
/// - `POST /api/v1/sessions` - Create session
/// - `GET /api/v1/sessions/:session_id` - Get session
/// - `DELETE /api/v1/sessions/:session_id` - Delete session
///
/// ## Workspace
/// - `GET /api/v1/artifacts?path=&recursive=` - List artifacts
/// - `DELETE /api/v1/artifacts?path=` - Delete artifact
/// - `GET /api/v1/files?path=` - Read file or list directory
/// - `POST /api/v1/files` - Write text file
/// - `DELETE /api/v1/files?path=` - Delete file
pub fn create_router<R, S>(state: GatewayState<R, S>) -> Router
where
    R: AgentRunner + 'static,
    S: SessionStore + 'static,
{
    // Extract config values before moving state
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    Router::new()
        // Health
        .route("/health", get(health::health::<R, S>))
        .route("/api/v1/status/health", get(health::health::<R, S>))
        // Chat
        .route("/api/v1/chat", post(chat::chat::<R, S>))
        // Sessions
        .route(
            "/api/v1/sessions",
            get(sessions::list_sessions::<R, S>).post(sessions::create_session::<R, S>),
        )
        .route(
            "/api/v1/sessions/:session_id",
            get(sessions::get_session::<R, S>).delete(sessions::delete_session::<R, S>),
        )
        // Workspace
        .route(
            "/api/v1/artifacts",
            get(artifacts::list_artifacts::<R, S>).delete(artifacts::delete_artifact::<R, S>),
        )
        .route(
            "/api/v1/files",
            get(files::read_file::<R, S>)
                .post(files::write_file::<R, S>)
                .delete(files::delete_file::<R, S>),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
