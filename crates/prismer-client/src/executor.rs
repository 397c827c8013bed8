//! Directive executor.
//!
//! A dispatch table from directive type to a bounded mutation of
//! [`UiState`]. Every case is idempotent and nothing here fails: malformed
//! or unknown directives are logged and dropped.

use prismer_core::{editor_for_path, Directive, DirectiveKind, EditorKind};
use tracing::{debug, warn};

use crate::ui::UiState;

/// Follow-up work the caller must perform after [`execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Effect {
    /// Nothing further.
    Nothing,
    /// Fetch the artifact list and hand the result to
    /// [`UiState::finish_artifact_refresh`].
    FetchArtifacts,
}

/// Apply one directive to the UI state.
pub fn execute(ui: &mut UiState, directive: &Directive) -> Effect {
    let Some(kind) = directive.known_kind() else {
        warn!(directive_type = %directive.kind, "Ignoring unknown directive");
        return Effect::Nothing;
    };
    debug!(directive_type = %kind, payload = %directive.payload, "Executing directive");

    match kind {
        DirectiveKind::ShowArtifact | DirectiveKind::OpenFile => {
            if directive.payload.is_empty() {
                warn!(directive_type = %kind, "Directive without a path");
                return Effect::Nothing;
            }
            ui.active_editor = editor_for_path(&directive.payload);
            ui.selected_artifact = Some(directive.payload.clone());
            ui.panel.collapsed = false;
        }
        DirectiveKind::SwitchEditor => match directive.payload.parse::<EditorKind>() {
            Ok(editor) => ui.active_editor = editor,
            Err(e) => warn!(error = %e, "Ignoring switch_editor"),
        },
        DirectiveKind::RefreshArtifacts => {
            if ui.artifacts_loading {
                debug!("Artifact refresh already in flight");
                return Effect::Nothing;
            }
            ui.artifacts_loading = true;
            return Effect::FetchArtifacts;
        }
        DirectiveKind::OpenPanel => ui.panel.collapsed = false,
        DirectiveKind::Notify => ui.notify(directive.payload.clone()),
    }
    Effect::Nothing
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(ui: &mut UiState, kind: &str, payload: &str) -> Effect {
        execute(ui, &Directive::new(kind, payload))
    }

    #[test]
    fn show_artifact_selects_and_switches_viewer() {
        let mut ui = UiState::default();
        ui.panel.collapsed = true;
        assert_eq!(run(&mut ui, "show_artifact", "/output/report.pdf"), Effect::Nothing);
        assert_eq!(ui.selected_artifact.as_deref(), Some("/output/report.pdf"));
        assert_eq!(ui.active_editor, EditorKind::PdfReader);
        assert!(!ui.panel.collapsed);
    }

    #[test]
    fn open_file_is_a_synonym() {
        let mut a = UiState::default();
        let mut b = UiState::default();
        let _ = run(&mut a, "show_artifact", "/output/nb.ipynb");
        let _ = run(&mut b, "open_file", "/output/nb.ipynb");
        assert_eq!(a.selected_artifact, b.selected_artifact);
        assert_eq!(a.active_editor, EditorKind::Jupyter);
        assert_eq!(b.active_editor, EditorKind::Jupyter);
    }

    #[test]
    fn empty_path_is_ignored() {
        let mut ui = UiState::default();
        let _ = run(&mut ui, "open_file", "");
        assert!(ui.selected_artifact.is_none());
    }

    #[test]
    fn switch_editor_validates() {
        let mut ui = UiState::default();
        let _ = run(&mut ui, "switch_editor", "latex");
        assert_eq!(ui.active_editor, EditorKind::Latex);
        let _ = run(&mut ui, "switch_editor", "emacs");
        assert_eq!(ui.active_editor, EditorKind::Latex);
    }

    #[test]
    fn overlapping_refresh_is_suppressed() {
        let mut ui = UiState::default();
        assert_eq!(run(&mut ui, "refresh_artifacts", ""), Effect::FetchArtifacts);
        assert_eq!(run(&mut ui, "refresh_artifacts", ""), Effect::Nothing);
        ui.finish_artifact_refresh(Ok(Vec::new()));
        assert_eq!(run(&mut ui, "refresh_artifacts", ""), Effect::FetchArtifacts);
    }

    #[test]
    fn panel_and_notify() {
        let mut ui = UiState::default();
        ui.panel.collapsed = true;
        let _ = run(&mut ui, "open_panel", "");
        assert!(!ui.panel.collapsed);

        let _ = execute(&mut ui, &prismer_core::parse_directives("[[UI:notify:Saved]]").directives[0]);
        assert_eq!(ui.take_notifications(), vec!["Saved".to_string()]);
    }

    #[test]
    fn unknown_type_is_a_no_op() {
        let mut ui = UiState::default();
        let before = format!("{ui:?}");
        assert_eq!(run(&mut ui, "launch_rocket", "now"), Effect::Nothing);
        assert_eq!(format!("{ui:?}"), before);
    }
}
