//! The `[[UI:...]]` directive grammar.
//!
//! Agents steer the workspace UI by embedding markers in their output:
//!
//! ```text
//! [[UI:<type>]]
//! [[UI:<type>:<payload>]]
//! [[UI:<type>:<k1>=<v1>,<k2>=<v2>:<payload>]]
//! ```
//!
//! `<type>` is a run of ASCII word characters. The second segment may not
//! contain `]` or `:`; the third may not contain `]`. A second segment is
//! only read as metadata when it contains `=` *and* a third segment follows;
//! otherwise it is the payload and any third segment is discarded.
//!
//! Matching is a left-to-right scan: when a marker matches at some offset the
//! scan resumes after it, otherwise it resumes at the next byte. The matcher
//! holds no state between calls.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const OPEN: &[u8] = b"[[UI:";
const CLOSE: &[u8] = b"]]";

/// A typed command embedded in agent output.
///
/// Identity for deduplication is the `(kind, payload)` pair; metadata does
/// not participate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    /// Directive type, e.g. `show_artifact`. Kept as a string so unknown
    /// types survive transport and can be logged by the executor.
    #[serde(rename = "type")]
    pub kind: String,
    /// Directive payload; empty when the marker carried none.
    #[serde(default)]
    pub payload: String,
    /// Optional `key=value` metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl Directive {
    /// Create a directive without metadata.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
            metadata: None,
        }
    }

    /// Create an `open_file` directive.
    #[must_use]
    pub fn open_file(path: impl Into<String>) -> Self {
        Self::new(DirectiveKind::OpenFile.as_str(), path)
    }

    /// Create the synthetic `refresh_artifacts` directive.
    #[must_use]
    pub fn refresh_artifacts() -> Self {
        Self::new(DirectiveKind::RefreshArtifacts.as_str(), "")
    }

    /// Attach metadata to this directive.
    #[must_use]
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Parse the directive type, if it is one the workspace understands.
    #[must_use]
    pub fn known_kind(&self) -> Option<DirectiveKind> {
        self.kind.parse().ok()
    }

    /// The deduplication key `(type, payload)`.
    #[must_use]
    pub fn dedup_key(&self) -> (String, String) {
        (self.kind.clone(), self.payload.clone())
    }
}

/// The directive types the workspace acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// Select an artifact and open it in the matching viewer.
    ShowArtifact,
    /// Synonym of `ShowArtifact`.
    OpenFile,
    /// Switch the active editor.
    SwitchEditor,
    /// Re-fetch the artifact list.
    RefreshArtifacts,
    /// Make the secondary panel visible.
    OpenPanel,
    /// Forward a message to the notification surface.
    Notify,
}

impl DirectiveKind {
    /// The wire name of this directive type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ShowArtifact => "show_artifact",
            Self::OpenFile => "open_file",
            Self::SwitchEditor => "switch_editor",
            Self::RefreshArtifacts => "refresh_artifacts",
            Self::OpenPanel => "open_panel",
            Self::Notify => "notify",
        }
    }

    /// Whether the payload of this directive is a workspace path.
    #[must_use]
    pub const fn carries_path(self) -> bool {
        matches!(self, Self::ShowArtifact | Self::OpenFile)
    }
}

impl FromStr for DirectiveKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "show_artifact" => Ok(Self::ShowArtifact),
            "open_file" => Ok(Self::OpenFile),
            "switch_editor" => Ok(Self::SwitchEditor),
            "refresh_artifacts" => Ok(Self::RefreshArtifacts),
            "open_panel" => Ok(Self::OpenPanel),
            "notify" => Ok(Self::Notify),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`parse_directives`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutput {
    /// Input with every marker removed, trimmed.
    pub clean_text: String,
    /// Directives in first-seen order.
    pub directives: Vec<Directive>,
}

/// Split agent output into clean prose and the directives it carries.
///
/// Total and pure: any input yields a result. A payload containing `]]`
/// ends at the first `]]`; the remainder stays in the clean text.
#[must_use]
pub fn parse_directives(text: &str) -> ParsedOutput {
    let bytes = text.as_bytes();
    let mut clean = String::with_capacity(text.len());
    let mut directives = Vec::new();
    let mut copied = 0;
    let mut pos = 0;

    while let Some(offset) = find(&bytes[pos..], OPEN) {
        let start = pos + offset;
        match match_marker(bytes, start) {
            Some(marker) => {
                clean.push_str(&text[copied..start]);
                directives.push(marker.into_directive(text));
                copied = marker.end;
                pos = marker.end;
            }
            None => pos = start + 1,
        }
    }
    clean.push_str(&text[copied..]);

    ParsedOutput {
        clean_text: clean.trim().to_string(),
        directives,
    }
}

/// Render a directive in the embedding grammar.
///
/// The inverse of [`parse_directives`] for well-formed input.
#[must_use]
pub fn format_directive(
    kind: &str,
    payload: &str,
    metadata: Option<&BTreeMap<String, String>>,
) -> String {
    match metadata {
        Some(meta) if !meta.is_empty() => {
            let pairs: Vec<String> = meta.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("[[UI:{kind}:{}:{payload}]]", pairs.join(","))
        }
        _ if payload.is_empty() => format!("[[UI:{kind}]]"),
        _ => format!("[[UI:{kind}:{payload}]]"),
    }
}

// =============================================================================
// Matcher
// =============================================================================

/// Byte spans of one matched marker.
#[derive(Debug, Clone, Copy)]
struct Marker {
    kind: (usize, usize),
    second: Option<(usize, usize)>,
    third: Option<(usize, usize)>,
    end: usize,
}

impl Marker {
    fn into_directive(self, text: &str) -> Directive {
        let kind = &text[self.kind.0..self.kind.1];
        let second = self.second.map(|(a, b)| &text[a..b]);
        let third = self.third.map(|(a, b)| &text[a..b]);

        match (second, third) {
            (Some(meta), Some(payload)) if meta.contains('=') => {
                Directive::new(kind, payload).with_metadata(parse_metadata(meta))
            }
            (Some(payload), _) => Directive::new(kind, payload),
            (None, _) => Directive::new(kind, ""),
        }
    }
}

/// Try to match a marker starting exactly at `start`.
///
/// Every run in the grammar is greedy and is always followed by a byte the
/// run cannot contain, so shortening a run never opens a new match. The only
/// choices are whether each optional segment is present, tried in order.
fn match_marker(bytes: &[u8], start: usize) -> Option<Marker> {
    if !bytes[start..].starts_with(OPEN) {
        return None;
    }
    let kind_start = start + OPEN.len();
    let kind_end = run(bytes, kind_start, is_word_byte);
    if kind_end == kind_start {
        return None;
    }

    for with_second in [true, false] {
        let (after_second, second) = if with_second {
            if bytes.get(kind_end) != Some(&b':') {
                continue;
            }
            let seg_start = kind_end + 1;
            let seg_end = run(bytes, seg_start, |b| b != b']' && b != b':');
            if seg_end == seg_start {
                continue;
            }
            (seg_end, Some((seg_start, seg_end)))
        } else {
            (kind_end, None)
        };

        if bytes.get(after_second) == Some(&b':') {
            let seg_start = after_second + 1;
            let seg_end = run(bytes, seg_start, |b| b != b']');
            if seg_end > seg_start && bytes[seg_end..].starts_with(CLOSE) {
                return Some(Marker {
                    kind: (kind_start, kind_end),
                    second,
                    third: Some((seg_start, seg_end)),
                    end: seg_end + CLOSE.len(),
                });
            }
        }

        if bytes[after_second..].starts_with(CLOSE) {
            return Some(Marker {
                kind: (kind_start, kind_end),
                second,
                third: None,
                end: after_second + CLOSE.len(),
            });
        }
    }

    None
}

fn run(bytes: &[u8], from: usize, accept: impl Fn(u8) -> bool) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| !accept(b))
        .map_or(bytes.len(), |n| from + n)
}

const fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parse `k1=v1,k2=v2`. Only the first two `=`-separated fields of a pair
/// are read; pairs with an empty key or value are dropped.
fn parse_metadata(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let mut fields = pair.split('=');
            let key = fields.next().unwrap_or_default();
            let value = fields.next().unwrap_or_default();
            if key.is_empty() || value.is_empty() {
                None
            } else {
                Some((key.trim().to_string(), value.trim().to_string()))
            }
        })
        .collect()
}
