//! Artifact listing endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use prismer_agent::AgentRunner;
use prismer_core::{sort_artifacts, Artifact};
use prismer_store::SessionStore;

use crate::error::ApiError;
use crate::state::GatewayState;

/// Query parameters for listing artifacts.
#[derive(Debug, Default, Deserialize)]
pub struct ListArtifactsQuery {
    /// Directory under the output directory.
    #[serde(default)]
    pub path: Option<String>,
    /// Descend into subdirectories.
    #[serde(default)]
    pub recursive: bool,
}

/// Query parameters for deleting an artifact.
#[derive(Debug, Deserialize)]
pub struct DeleteArtifactQuery {
    /// Artifact path.
    #[serde(default)]
    pub path: Option<String>,
}

/// Response for listing artifacts.
#[derive(Debug, Serialize)]
pub struct ListArtifactsResponse {
    /// The listed directory.
    pub path: String,
    /// Directories first, then newest first.
    pub artifacts: Vec<Artifact>,
    /// Number of artifacts.
    pub total: usize,
}

/// List artifacts.
///
/// # Errors
///
/// Returns `invalid_path` for paths outside the output directory and
/// `not_found` for a missing directory.
pub async fn list_artifacts<R, S>(
    State(state): State<Arc<GatewayState<R, S>>>,
    Query(query): Query<ListArtifactsQuery>,
) -> Result<impl IntoResponse, ApiError>
where
    R: AgentRunner + 'static,
    S: SessionStore + 'static,
{
    let path = query.path.unwrap_or_else(|| "/".to_string());
    let mut artifacts = state
        .workspace
        .list_artifacts(&path, query.recursive)
        .await?;
    sort_artifacts(&mut artifacts);
    tracing::debug!(path = %path, count = artifacts.len(), "Listed artifacts");

    Ok(Json(ListArtifactsResponse {
        path,
        total: artifacts.len(),
        artifacts,
    }))
}

/// Delete one artifact.
///
/// # Errors
///
/// Returns `bad_request` without a path, `invalid_path` for paths outside
/// the output directory and `not_found` if nothing exists there.
pub async fn delete_artifact<R, S>(
    State(state): State<Arc<GatewayState<R, S>>>,
    Query(query): Query<DeleteArtifactQuery>,
) -> Result<impl IntoResponse, ApiError>
where
    R: AgentRunner + 'static,
    S: SessionStore + 'static,
{
    let path = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Path is required".to_string()))?;
    state.workspace.delete_artifact(&path).await?;
    tracing::info!(path = %path, "Artifact deleted");
    Ok(Json(serde_json::json!({ "success": true, "path": path })))
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_app;
    use axum::http::StatusCode;
    use prismer_agent::ScriptedSpawner;
    use serde_json::Value;

    #[tokio::test]
    async fn lists_directories_first() {
        let app = test_app(ScriptedSpawner::new());
        let output = app.workspace.path().join("output");
        std::fs::create_dir_all(output.join("figs")).unwrap();
        std::fs::write(output.join("data.csv"), "a,b\n").unwrap();
        std::fs::write(output.join(".hidden"), "x").unwrap();

        let response = app.server.get("/api/v1/artifacts").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["path"], "/");
        assert_eq!(body["total"], 2);
        assert_eq!(body["artifacts"][0]["type"], "directory");
        assert_eq!(body["artifacts"][1]["path"], "/output/data.csv");
        assert_eq!(body["artifacts"][1]["mimeType"], "text/csv");
    }

    #[tokio::test]
    async fn recursive_listing() {
        let app = test_app(ScriptedSpawner::new());
        let output = app.workspace.path().join("output");
        std::fs::create_dir_all(output.join("figs")).unwrap();
        std::fs::write(output.join("figs/a.png"), "png").unwrap();

        let body: Value = app
            .server
            .get("/api/v1/artifacts")
            .add_query_param("recursive", "true")
            .await
            .json();
        assert_eq!(body["total"], 2);
    }

    #[tokio::test]
    async fn escaping_path_rejected() {
        let app = test_app(ScriptedSpawner::new());
        let response = app
            .server
            .get("/api/v1/artifacts")
            .add_query_param("path", "../..")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "invalid_path");
    }

    #[tokio::test]
    async fn delete_artifact() {
        let app = test_app(ScriptedSpawner::new());
        let output = app.workspace.path().join("output");
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(output.join("a.txt"), "x").unwrap();

        app.server
            .delete("/api/v1/artifacts")
            .add_query_param("path", "/output/a.txt")
            .await
            .assert_status_ok();
        assert!(!output.join("a.txt").exists());

        app.server
            .delete("/api/v1/artifacts")
            .add_query_param("path", "/output/a.txt")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        app.server
            .delete("/api/v1/artifacts")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
