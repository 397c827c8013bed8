//! Workspace file endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use prismer_agent::AgentRunner;
use prismer_store::{DirEntry, FileContent, SessionStore};

use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query parameters naming a workspace path.
#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    /// Workspace-relative path.
    #[serde(default)]
    pub path: Option<String>,
}

/// Request body for writing a file.
#[derive(Debug, Deserialize)]
pub struct WriteFileRequest {
    /// Workspace-relative path.
    #[serde(default)]
    pub path: String,
    /// Text content.
    #[serde(default)]
    pub content: String,
}

/// Response for a directory read.
#[derive(Debug, Serialize)]
pub struct DirectoryResponse {
    /// The listed path.
    pub path: String,
    /// Always `directory`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Entries, directories first then by name.
    pub items: Vec<DirEntry>,
}

/// Response for a successful write or delete.
#[derive(Debug, Serialize)]
pub struct FileOpResponse {
    /// Always true.
    pub success: bool,
    /// The affected path.
    pub path: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Read a file or list a directory.
///
/// # Errors
///
/// Returns `invalid_path` for paths outside the workspace and `not_found` if
/// nothing exists there.
pub async fn read_file<R, S>(
    State(state): State<Arc<GatewayState<R, S>>>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError>
where
    R: AgentRunner + 'static,
    S: SessionStore + 'static,
{
    let path = query.path.unwrap_or_else(|| "/".to_string());
    match state.workspace.read(&path).await? {
        FileContent::Directory(items) => Ok(Json(DirectoryResponse {
            path,
            kind: "directory",
            items,
        })
        .into_response()),
        FileContent::File {
            bytes,
            content_type,
        } => {
            let file_path = header::HeaderValue::from_str(&path)
                .unwrap_or_else(|_| header::HeaderValue::from_static("/"));
            Ok((
                [
                    (header::CONTENT_TYPE, header::HeaderValue::from_static(content_type)),
                    (header::HeaderName::from_static("x-file-path"), file_path),
                ],
                bytes,
            )
                .into_response())
        }
    }
}

/// Write a text file.
///
/// # Errors
///
/// Returns `bad_request` without a path and `invalid_path` for paths outside
/// the workspace.
pub async fn write_file<R, S>(
    State(state): State<Arc<GatewayState<R, S>>>,
    Json(body): Json<WriteFileRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    R: AgentRunner + 'static,
    S: SessionStore + 'static,
{
    if body.path.is_empty() {
        return Err(ApiError::BadRequest("Path is required".to_string()));
    }
    state.workspace.write_text(&body.path, &body.content).await?;
    Ok(Json(FileOpResponse {
        success: true,
        path: body.path,
    }))
}

/// Delete a file or directory.
///
/// # Errors
///
/// Returns `bad_request` without a path, `invalid_path` for paths outside
/// the workspace and `not_found` if nothing exists there.
pub async fn delete_file<R, S>(
    State(state): State<Arc<GatewayState<R, S>>>,
    Query(query): Query<PathQuery>,
) -> Result<impl IntoResponse, ApiError>
where
    R: AgentRunner + 'static,
    S: SessionStore + 'static,
{
    let path = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Path is required".to_string()))?;
    state.workspace.delete(&path).await?;
    tracing::info!(path = %path, "File deleted");
    Ok(Json(FileOpResponse {
        success: true,
        path,
    }))
}
