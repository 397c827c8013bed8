//! Editor identifiers and the extension to viewer table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The closed set of workspace editors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditorKind {
    /// General purpose rich text editor.
    #[default]
    AiEditor,
    /// Notebook editor.
    Jupyter,
    /// LaTeX source editor with preview.
    Latex,
    /// Code editor with a run button.
    CodePlayground,
    /// PDF viewer.
    PdfReader,
    /// Image viewer.
    ImageViewer,
}

impl EditorKind {
    /// All editors, in display order.
    pub const ALL: [Self; 6] = [
        Self::AiEditor,
        Self::Jupyter,
        Self::Latex,
        Self::CodePlayground,
        Self::PdfReader,
        Self::ImageViewer,
    ];

    /// The wire identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AiEditor => "ai-editor",
            Self::Jupyter => "jupyter",
            Self::Latex => "latex",
            Self::CodePlayground => "code-playground",
            Self::PdfReader => "pdf-reader",
            Self::ImageViewer => "image-viewer",
        }
    }
}

impl FromStr for EditorKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|editor| editor.as_str() == s)
            .ok_or_else(|| CoreError::UnknownEditor(s.to_string()))
    }
}

impl fmt::Display for EditorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the viewer for a file path from its extension.
///
/// The extension is whatever follows the last `.`, lowercased; a path with
/// no `.` uses the whole path, which falls through to the default editor.
#[must_use]
pub fn editor_for_path(path: &str) -> EditorKind {
    let ext = path.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => EditorKind::PdfReader,
        "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" => EditorKind::ImageViewer,
        "ipynb" => EditorKind::Jupyter,
        "tex" => EditorKind::Latex,
        "py" | "js" | "ts" | "json" => EditorKind::CodePlayground,
        _ => EditorKind::AiEditor,
    }
}
