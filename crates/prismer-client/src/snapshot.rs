//! Persisting client state between runs.
//!
//! Only an allowlist survives: the session id, the last
//! [`MAX_PERSISTED_MESSAGES`] messages, the active editor and the panel.
//! Everything transient (streaming flags, the artifact list, in-flight
//! work, notifications) starts fresh.

use std::fs;
use std::path::Path;

use prismer_core::{EditorKind, SessionId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conversation::{Conversation, Message};
use crate::error::{ClientError, Result};
use crate::ui::{PanelState, UiState};

/// Messages kept in a snapshot.
pub const MAX_PERSISTED_MESSAGES: usize = 100;

/// Everything the client holds for one conversation.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    /// Session the conversation belongs to.
    pub session_id: Option<SessionId>,
    /// Messages.
    pub conversation: Conversation,
    /// UI selection state.
    pub ui: UiState,
}

/// The persisted subset of [`ClientState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Session id.
    #[serde(default)]
    pub session_id: Option<SessionId>,
    /// Most recent messages, oldest first.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Active editor.
    #[serde(default)]
    pub active_editor: EditorKind,
    /// Panel state.
    #[serde(default)]
    pub panel: PanelState,
}

impl Snapshot {
    /// Take the persisted subset of `state`.
    #[must_use]
    pub fn capture(state: &ClientState) -> Self {
        let messages = state.conversation.messages();
        let skip = messages.len().saturating_sub(MAX_PERSISTED_MESSAGES);
        Self {
            session_id: state.session_id.clone(),
            messages: messages[skip..].to_vec(),
            active_editor: state.ui.active_editor,
            panel: state.ui.panel,
        }
    }

    /// Rebuild client state. No message is left streaming.
    #[must_use]
    pub fn restore(self) -> ClientState {
        let mut ui = UiState::default();
        ui.active_editor = self.active_editor;
        ui.panel = self.panel;
        ClientState {
            session_id: self.session_id,
            conversation: Conversation::from_messages(self.messages),
            ui,
        }
    }

    /// Read a snapshot file. A missing file yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot =
            serde_json::from_slice(&bytes).map_err(|e| ClientError::Parse(e.to_string()))?;
        debug!(path = %path.display(), "Snapshot loaded");
        Ok(Some(snapshot))
    }

    /// Write the snapshot, replacing any previous file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(|e| ClientError::Parse(e.to_string()))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), messages = self.messages.len(), "Snapshot saved");
        Ok(())
    }
}
