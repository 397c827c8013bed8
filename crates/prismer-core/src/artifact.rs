//! Artifacts: generated files tracked for preview and download.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// MIME type reported for files outside the known table.
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Whether an artifact is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A directory.
    Directory,
    /// A regular file.
    File,
}

/// A listed artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// File name.
    pub name: String,
    /// File or directory.
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    /// Path relative to the workspace root, starting with `/`.
    pub path: String,
    /// Size in bytes; zero for directories.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// MIME type; files only.
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Whether the UI can preview it; files only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<bool>,
}

impl Artifact {
    /// Describe a file, filling MIME type and preview flag from its extension.
    #[must_use]
    pub fn file(
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        modified: DateTime<Utc>,
    ) -> Self {
        let name = name.into();
        let (mime, preview) = file_type(&name).unwrap_or((DEFAULT_MIME, false));
        Self {
            name,
            kind: ArtifactKind::File,
            path: path.into(),
            size,
            modified,
            mime_type: Some(mime.to_string()),
            preview: Some(preview),
        }
    }

    /// Describe a directory.
    #[must_use]
    pub fn directory(
        name: impl Into<String>,
        path: impl Into<String>,
        modified: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ArtifactKind::Directory,
            path: path.into(),
            size: 0,
            modified,
            mime_type: None,
            preview: None,
        }
    }
}

/// Known artifact types: `(mime, previewable)` by extension.
#[must_use]
pub fn file_type(name: &str) -> Option<(&'static str, bool)> {
    let (_, ext) = name.rsplit_once('.')?;
    let entry = match ext.to_ascii_lowercase().as_str() {
        "pdf" => ("application/pdf", true),
        "png" => ("image/png", true),
        "jpg" | "jpeg" => ("image/jpeg", true),
        "gif" => ("image/gif", true),
        "svg" => ("image/svg+xml", true),
        "csv" => ("text/csv", true),
        "json" => ("application/json", true),
        "txt" => ("text/plain", true),
        "md" => ("text/markdown", true),
        "tex" => ("application/x-tex", true),
        "py" => ("text/x-python", true),
        "ipynb" => ("application/x-ipynb+json", true),
        _ => return None,
    };
    Some(entry)
}

/// Order artifacts directories first, then newest first.
pub fn sort_artifacts(artifacts: &mut [Artifact]) {
    artifacts.sort_by(|a, b| {
        let rank = |artifact: &Artifact| artifact.kind != ArtifactKind::Directory;
        rank(a)
            .cmp(&rank(b))
            .then_with(|| b.modified.cmp(&a.modified))
    });
}
