//! Workspace UI selection state.
//!
//! The directive executor is the only writer besides user actions; a front
//! end renders from this and drains notifications as it shows them.

use std::collections::VecDeque;

use prismer_core::{Artifact, EditorKind};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Notifications kept before the oldest is dropped.
pub const MAX_NOTIFICATIONS: usize = 50;

/// The secondary panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PanelState {
    /// Whether the panel is hidden.
    pub collapsed: bool,
}

/// What the agent is doing, as far as the UI knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentStatus {
    /// No response in flight.
    #[default]
    Idle,
    /// A response is streaming.
    Running,
    /// The last response failed.
    Error,
}

/// Selection and panel state driven by directives.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Path of the selected artifact.
    pub selected_artifact: Option<String>,
    /// Editor shown in the main area.
    pub active_editor: EditorKind,
    /// Secondary panel.
    pub panel: PanelState,
    /// Last fetched artifact list.
    pub artifacts: Vec<Artifact>,
    /// An artifact fetch is in flight.
    pub artifacts_loading: bool,
    /// Agent status.
    pub agent_status: AgentStatus,
    /// Message of the last failure, cleared on the next send.
    pub last_error: Option<String>,
    notifications: VecDeque<String>,
}

impl UiState {
    /// Queue a notification.
    pub fn notify(&mut self, message: impl Into<String>) {
        if self.notifications.len() == MAX_NOTIFICATIONS {
            self.notifications.pop_front();
        }
        self.notifications.push_back(message.into());
    }

    /// Take every queued notification, oldest first.
    pub fn take_notifications(&mut self) -> Vec<String> {
        self.notifications.drain(..).collect()
    }

    /// Store the outcome of an artifact fetch and clear the loading flag.
    ///
    /// A failed fetch keeps the previous list.
    pub fn finish_artifact_refresh(&mut self, result: Result<Vec<Artifact>, String>) {
        self.artifacts_loading = false;
        match result {
            Ok(artifacts) => self.artifacts = artifacts,
            Err(message) => warn!(error = %message, "Artifact refresh failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn notifications_drain_in_order_and_are_bounded() {
        let mut ui = UiState::default();
        for i in 0..=MAX_NOTIFICATIONS {
            ui.notify(format!("n{i}"));
        }
        let drained = ui.take_notifications();
        assert_eq!(drained.len(), MAX_NOTIFICATIONS);
        assert_eq!(drained[0], "n1");
        assert!(ui.take_notifications().is_empty());
    }

    #[test]
    fn failed_refresh_keeps_previous_list() {
        let mut ui = UiState {
            artifacts_loading: true,
            ..UiState::default()
        };
        let listed = vec![Artifact::file("a.csv", "/output/a.csv", 1, Utc::now())];
        ui.finish_artifact_refresh(Ok(listed.clone()));
        assert!(!ui.artifacts_loading);

        ui.artifacts_loading = true;
        ui.finish_artifact_refresh(Err("connection refused".into()));
        assert!(!ui.artifacts_loading);
        assert_eq!(ui.artifacts, listed);
    }
}
