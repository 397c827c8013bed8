//! Request and response types for the gateway API.
//!
//! These types mirror the JSON the prismer gateway reads and writes.

use chrono::{DateTime, Utc};
use prismer_core::{Artifact, Directive, SessionId};
use serde::{Deserialize, Serialize};

// =============================================================================
// Chat Types
// =============================================================================

/// Request body for `POST /api/v1/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// The user's message.
    pub content: String,
    /// Conversation to continue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Stream the response as SSE.
    pub stream: bool,
    /// Provider settings forwarded to the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ProviderSettings>,
}

/// Provider credentials sent with a chat message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API key for the provider.
    pub api_key: String,
    /// Provider name, e.g. `google` or `anthropic`.
    pub provider: String,
    /// Model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Response body of a buffered chat request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BufferedReply {
    /// Agent output with directive markers removed.
    pub content: String,
    /// Session the request belonged to.
    #[serde(default)]
    pub session_id: Option<SessionId>,
    /// Directives in the order they appeared.
    #[serde(default)]
    pub directives: Vec<Directive>,
}

// =============================================================================
// Session Types
// =============================================================================

/// Session bookkeeping as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionRecord {
    /// Opaque session token.
    pub id: SessionId,
    /// When the session was first seen.
    pub created_at: DateTime<Utc>,
    /// When the last message was sent in it.
    pub last_active_at: DateTime<Utc>,
    /// Number of user messages sent in it.
    pub message_count: u64,
}

/// Request body for `POST /api/v1/sessions`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest {
    /// Explicit id; the gateway generates one when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// Response from listing sessions.
#[derive(Debug, Clone, Deserialize)]
pub struct ListSessionsResponse {
    /// Known sessions.
    pub sessions: Vec<SessionRecord>,
}

// =============================================================================
// Artifact Types
// =============================================================================

/// Response from listing artifacts.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactList {
    /// Listed directory.
    pub path: String,
    /// Entries, directories first then newest first.
    pub artifacts: Vec<Artifact>,
    /// Number of entries.
    pub total: usize,
}

/// Response from deleting an artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteResponse {
    /// Whether the entry was removed.
    pub success: bool,
    /// Path that was removed.
    pub path: String,
}

/// Health check response.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when the workspace root is missing.
    pub status: String,
    /// Gateway version.
    #[serde(default)]
    pub version: Option<String>,
    /// Agent executable the gateway runs.
    #[serde(default)]
    pub agent_program: Option<String>,
    /// Workspace root served by the gateway.
    #[serde(default)]
    pub workspace_root: Option<String>,
    #[serde(default)]
    pub workspace_ready: bool,
}

// =============================================================================
// Error Types
// =============================================================================

/// API error response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}
