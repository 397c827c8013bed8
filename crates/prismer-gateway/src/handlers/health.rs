//! Health endpoint, served at `/health` and `/api/v1/status/health`.
//!
//! Reports `healthy` when the workspace root exists and `degraded`
//! otherwise: the gateway still answers, but the agent has nowhere to write.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use prismer_agent::AgentRunner;
use prismer_store::SessionStore;

use crate::state::GatewayState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: &'static str,
    /// Gateway version.
    pub version: &'static str,
    /// Agent executable chat requests run.
    pub agent_program: String,
    /// Workspace served to the agent and the file endpoints.
    pub workspace_root: String,
    /// Whether the workspace root is an existing directory.
    pub workspace_ready: bool,
}

/// Health check handler.
pub async fn health<R, S>(State(state): State<Arc<GatewayState<R, S>>>) -> Json<HealthResponse>
where
    R: AgentRunner + 'static,
    S: SessionStore + 'static,
{
    let root = state.workspace.root();
    let workspace_ready = tokio::fs::metadata(root)
        .await
        .is_ok_and(|meta| meta.is_dir());
    if !workspace_ready {
        tracing::warn!(workspace_root = %root.display(), "Workspace root is missing");
    }

    Json(HealthResponse {
        status: if workspace_ready { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        agent_program: state.config.agent.program.clone(),
        workspace_root: root.display().to_string(),
        workspace_ready,
    })
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_app;
    use prismer_agent::ScriptedSpawner;
    use serde_json::Value;

    #[tokio::test]
    async fn both_paths_report_the_workspace() {
        let app = test_app(ScriptedSpawner::new());
        for path in ["/health", "/api/v1/status/health"] {
            let response = app.server.get(path).await;
            response.assert_status_ok();
            let body: Value = response.json();
            assert_eq!(body["status"], "healthy");
            assert_eq!(body["agent_program"], "openclaw");
            assert_eq!(body["workspace_ready"], true);
            assert_eq!(
                body["workspace_root"],
                app.workspace.path().display().to_string()
            );
        }
    }

    #[tokio::test]
    async fn missing_workspace_is_degraded() {
        let app = test_app(ScriptedSpawner::new());
        let root = app.workspace.path().to_path_buf();
        std::fs::remove_dir_all(&root).unwrap();

        let response = app.server.get("/health").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["workspace_ready"], false);
    }
}
