//! Path-scoped access to the agent's workspace directory.
//!
//! Every request path is resolved lexically against a base directory: `.`
//! segments are dropped, `..` pops a segment, and popping past the base is
//! rejected with [`StoreError::InvalidPath`]. Leading slashes are ignored, so
//! `/output/a.png` and `output/a.png` name the same file.

use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use prismer_core::artifact::sort_artifacts;
use prismer_core::{Artifact, ArtifactKind};
use serde::Serialize;
use tokio::fs;

use crate::error::{Result, StoreError};

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "tex", "py", "js", "ts", "json", "yaml", "yml", "toml", "sh", "css", "html",
];

/// Content type used for text files.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    /// Entry name.
    pub name: String,
    /// File or directory.
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Result of [`WorkspaceFs::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// A directory listing, directories first then by name.
    Directory(Vec<DirEntry>),
    /// Raw file bytes.
    File {
        /// File contents.
        bytes: Vec<u8>,
        /// Content type derived from the extension.
        content_type: &'static str,
    },
}

/// The workspace root and its artifact output directory.
#[derive(Debug, Clone)]
pub struct WorkspaceFs {
    root: PathBuf,
    output_name: String,
    output: PathBuf,
}

impl WorkspaceFs {
    /// A workspace whose artifacts live in `<root>/output`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_output_dir(root, "output")
    }

    /// A workspace with a custom artifact subdirectory name.
    #[must_use]
    pub fn with_output_dir(root: impl Into<PathBuf>, output_name: &str) -> Self {
        let root = root.into();
        let output_name = output_name.trim_matches('/').to_string();
        let output = root.join(&output_name);
        Self {
            root,
            output_name,
            output,
        }
    }

    /// The workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The artifact output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    /// Resolve a workspace-relative path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if the path escapes the root.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf> {
        resolve_under(&self.root, requested)
    }

    // =========================================================================
    // Artifacts
    // =========================================================================

    /// List artifacts under a directory of the output directory.
    ///
    /// Hidden entries are skipped and paths are reported relative to the
    /// workspace root (`/output/...`). Symlinked directories are listed but
    /// not descended into.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if `sub` escapes the output directory
    /// and `StoreError::NotFound` if it is not a directory.
    pub async fn list_artifacts(&self, sub: &str, recursive: bool) -> Result<Vec<Artifact>> {
        fs::create_dir_all(&self.output).await?;
        let target = resolve_under(&self.output, sub)?;
        let meta = fs::metadata(&target).await.map_err(io_error)?;
        if !meta.is_dir() {
            return Err(StoreError::NotFound);
        }

        let mut artifacts = Vec::new();
        let mut pending = vec![target];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') {
                    continue;
                }
                let full = entry.path();
                let Ok(meta) = fs::metadata(&full).await else {
                    continue;
                };
                let path = self.display_path(&full);
                let modified = modified_at(meta.modified());

                if meta.is_dir() {
                    artifacts.push(Artifact::directory(name, path, modified));
                    let is_link = entry.file_type().await.is_ok_and(|t| t.is_symlink());
                    if recursive && !is_link {
                        pending.push(full);
                    }
                } else {
                    artifacts.push(Artifact::file(name, path, meta.len(), modified));
                }
            }
        }

        sort_artifacts(&mut artifacts);
        tracing::debug!(sub = %sub, recursive, count = artifacts.len(), "Listed artifacts");
        Ok(artifacts)
    }

    /// Delete an artifact. Accepts both output-relative paths (`/a.png`) and
    /// the workspace-relative paths the lister reports (`/output/a.png`).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` for paths outside the output directory
    /// (including the directory itself) and `StoreError::NotFound` if nothing
    /// exists there.
    pub async fn delete_artifact(&self, path: &str) -> Result<()> {
        let trimmed = path.trim_start_matches('/');
        let relative = trimmed
            .strip_prefix(self.output_name.as_str())
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .unwrap_or(trimmed);
        let target = resolve_under(&self.output, relative)?;
        if target == self.output {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        remove(&target).await
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Read a file or list a directory.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if the path escapes the root and
    /// `StoreError::NotFound` if nothing exists there.
    pub async fn read(&self, path: &str) -> Result<FileContent> {
        let target = self.resolve(path)?;
        let meta = fs::metadata(&target).await.map_err(io_error)?;

        if !meta.is_dir() {
            let bytes = fs::read(&target).await.map_err(io_error)?;
            return Ok(FileContent::File {
                bytes,
                content_type: content_type(&target),
            });
        }

        let mut items = Vec::new();
        let mut entries = fs::read_dir(&target).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = fs::metadata(entry.path()).await.ok();
            let is_dir = match &meta {
                Some(meta) => meta.is_dir(),
                None => entry.file_type().await.is_ok_and(|t| t.is_dir()),
            };
            items.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: if is_dir {
                    ArtifactKind::Directory
                } else {
                    ArtifactKind::File
                },
                size: meta.as_ref().map_or(0, std::fs::Metadata::len),
                modified: meta.and_then(|m| m.modified().ok()).map(DateTime::from),
            });
        }
        items.sort_by(compare_entries);
        Ok(FileContent::Directory(items))
    }

    /// Write a text file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if the path escapes the root or names
    /// the root itself.
    pub async fn write_text(&self, path: &str, content: &str) -> Result<()> {
        let target = self.resolve(path)?;
        if target == self.root {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, content).await?;
        tracing::debug!(path = %path, bytes = content.len(), "Wrote workspace file");
        Ok(())
    }

    /// Delete a file or directory tree.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if the path escapes the root or names
    /// the root itself, and `StoreError::NotFound` if nothing exists there.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        if target == self.root {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        remove(&target).await
    }

    fn display_path(&self, full: &Path) -> String {
        let relative = full.strip_prefix(&self.root).unwrap_or(full);
        let segments: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        format!("/{}", segments.join("/"))
    }
}

/// Lexically resolve `requested` under `base`.
fn resolve_under(base: &Path, requested: &str) -> Result<PathBuf> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in requested.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(StoreError::InvalidPath(requested.to_string()));
                }
            }
            other => segments.push(other),
        }
    }
    Ok(segments.iter().fold(base.to_path_buf(), |path, s| path.join(s)))
}

async fn remove(target: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(target).await.map_err(io_error)?;
    if meta.is_dir() {
        fs::remove_dir_all(target).await?;
    } else {
        fs::remove_file(target).await?;
    }
    tracing::debug!(path = %target.display(), "Removed workspace entry");
    Ok(())
}

fn io_error(err: io::Error) -> StoreError {
    if err.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound
    } else {
        StoreError::Io(err)
    }
}

fn modified_at(time: io::Result<SystemTime>) -> DateTime<Utc> {
    time.map_or_else(|_| DateTime::from(SystemTime::UNIX_EPOCH), DateTime::from)
}

fn compare_entries(a: &DirEntry, b: &DirEntry) -> Ordering {
    let rank = |entry: &DirEntry| entry.kind != ArtifactKind::Directory;
    rank(a)
        .cmp(&rank(b))
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        return TEXT_CONTENT_TYPE;
    }
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => prismer_core::artifact::DEFAULT_MIME,
    }
}
