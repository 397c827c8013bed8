//! Implicit artifact detection.
//!
//! Agents often mention the files they produce without emitting a directive.
//! [`detect_paths`] scans text for absolute workspace paths ending in a known
//! extension and turns each distinct one into an `open_file` directive whose
//! payload is the path relative to the workspace root.

use std::collections::HashSet;

use serde::Deserialize;

use crate::directive::Directive;

/// Which paths count as artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtifactPatterns {
    /// Absolute workspace root, without a trailing slash.
    #[serde(default = "ArtifactPatterns::default_workspace_root")]
    pub workspace_root: String,

    /// Lowercase extensions, tried in order after the last viable `.`.
    #[serde(default = "ArtifactPatterns::default_extensions")]
    pub extensions: Vec<String>,
}

impl ArtifactPatterns {
    fn default_workspace_root() -> String {
        "/workspace".to_string()
    }

    fn default_extensions() -> Vec<String> {
        [
            "pdf", "png", "jpg", "jpeg", "gif", "svg", "csv", "json", "tex", "py", "ipynb", "md",
            "txt",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    /// Patterns for a different workspace root with the default extensions.
    #[must_use]
    pub fn with_root(root: impl Into<String>) -> Self {
        Self {
            workspace_root: root.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    fn prefix(&self) -> String {
        format!("{}/", self.workspace_root)
    }
}

impl Default for ArtifactPatterns {
    fn default() -> Self {
        Self {
            workspace_root: Self::default_workspace_root(),
            extensions: Self::default_extensions(),
        }
    }
}

/// Find workspace file paths in `text`.
///
/// Returns one `open_file` directive per distinct path, in order of first
/// appearance. Deduplication is scoped to this call only. The workspace root
/// is matched ignoring ASCII case; the payload keeps the text's casing.
#[must_use]
pub fn detect_paths(text: &str, patterns: &ArtifactPatterns) -> Vec<Directive> {
    let prefix = patterns.prefix().to_ascii_lowercase();
    // ASCII lowercasing keeps byte offsets, so matches index into `text`.
    let haystack = text.to_ascii_lowercase();
    let root_len = patterns.workspace_root.len();
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(offset) = haystack[pos..].find(&prefix) {
        let start = pos + offset;
        match match_path(text, start + prefix.len(), &patterns.extensions) {
            Some(end) => {
                let payload = &text[start + root_len..end];
                if seen.insert(payload) {
                    found.push(Directive::open_file(payload));
                }
                pos = end;
            }
            None => pos = start + 1,
        }
    }

    found
}

/// Normalize a path-like payload: `\` becomes `/` and a leading workspace
/// root is stripped, so `/workspace/output/a.png` and `/output/a.png` compare
/// equal. The root is matched ignoring ASCII case, as in [`detect_paths`].
#[must_use]
pub fn canonicalize_path(payload: &str, patterns: &ArtifactPatterns) -> String {
    let normalized = payload.replace('\\', "/");
    let root = patterns.workspace_root.as_str();
    let rest = normalized
        .get(..root.len())
        .filter(|head| head.eq_ignore_ascii_case(root))
        .map(|_| normalized[root.len()..].to_string());
    match rest.as_deref() {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => normalized,
    }
}

/// Match the path body that starts at `body`. Returns the end offset.
///
/// The body is a maximal run of path characters; the match ends after the
/// rightmost `.` inside that run (with at least one character before it)
/// that is followed by an allowed extension.
fn match_path(text: &str, body: usize, extensions: &[String]) -> Option<usize> {
    let run_end = text[body..]
        .char_indices()
        .find(|&(_, c)| !is_path_char(c))
        .map_or(text.len(), |(i, _)| body + i);

    let bytes = text.as_bytes();
    (body + 1..run_end)
        .rev()
        .filter(|&dot| bytes[dot] == b'.')
        .find_map(|dot| {
            let ext_start = dot + 1;
            extensions.iter().find_map(|ext| {
                bytes
                    .get(ext_start..ext_start + ext.len())
                    .filter(|candidate| candidate.eq_ignore_ascii_case(ext.as_bytes()))
                    .map(|_| ext_start + ext.len())
            })
        })
}

fn is_path_char(c: char) -> bool {
    !(c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>'))
}
