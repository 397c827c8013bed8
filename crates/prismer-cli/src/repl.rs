//! Interactive chat loop.
//!
//! Reads prompts from stdin and prints the streamed reply as it arrives.
//! Ctrl-C cancels the reply in flight; a second Ctrl-C at the prompt exits.

use std::io::Write;
use std::path::PathBuf;

use prismer_client::{ChatController, ClientState, GatewayClient, Snapshot};
use prismer_core::{Artifact, ArtifactKind, MessageId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

// =============================================================================
// Slash Commands
// =============================================================================

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Message(&'a str),
    New,
    Artifacts,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line);
    };
    match command {
        "new" => Input::New,
        "artifacts" => Input::Artifacts,
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Unknown(other),
    }
}

const HELP: &str = "\
/new        start a new session
/artifacts  refresh and list artifacts
/quit       exit
Ctrl-C cancels a reply in flight.";

// =============================================================================
// Rendering
// =============================================================================

/// One line describing an artifact.
pub fn describe_artifact(artifact: &Artifact) -> String {
    let modified = artifact
        .modified
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M");
    match artifact.kind {
        ArtifactKind::Directory => format!("{modified}  {:>10}  {}/", "-", artifact.path),
        ArtifactKind::File => format!("{modified}  {:>10}  {}", artifact.size, artifact.path),
    }
}

/// Tracks what has already been printed of the streaming message.
#[derive(Debug)]
struct Printer {
    message_id: MessageId,
    printed: usize,
    selected: Option<String>,
}

impl Printer {
    fn new(message_id: MessageId, state: &ClientState) -> Self {
        Self {
            message_id,
            printed: 0,
            selected: state.ui.selected_artifact.clone(),
        }
    }

    /// Print whatever is new since the last call.
    fn update(&mut self, state: &mut ClientState) {
        if let Some(message) = state.conversation.get(self.message_id) {
            if let Some(fresh) = message.content.get(self.printed..) {
                print!("{fresh}");
                self.printed = message.content.len();
            }
        }
        if state.ui.selected_artifact != self.selected {
            self.selected.clone_from(&state.ui.selected_artifact);
            if let Some(path) = &self.selected {
                eprintln!("\n[{} -> {}]", path, state.ui.active_editor);
            }
        }
        for note in state.ui.take_notifications() {
            eprintln!("\n[notice] {note}");
        }
        let _ = std::io::stdout().flush();
    }
}

// =============================================================================
// Loop
// =============================================================================

/// Run the interactive loop until stdin closes or the user quits.
pub async fn run(
    client: GatewayClient,
    state: ClientState,
    state_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut controller = ChatController::new(client, state);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    match controller.client().health().await {
        Ok(health) => eprintln!("Connected to {} ({})", controller.client().base_url(), health.status),
        Err(e) => eprintln!("Gateway not reachable: {}", e.user_message()),
    }
    if let Some(session) = &controller.state().session_id {
        eprintln!(
            "Resuming {session} ({} messages)",
            controller.state().conversation.messages().len()
        );
    }

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_input(&line) {
            Input::Empty => {}
            Input::Help => println!("{HELP}"),
            Input::Quit => break,
            Input::Unknown(command) => println!("Unknown command /{command}. Try /help."),
            Input::New => {
                let session = controller.new_session();
                println!("New session {session}");
            }
            Input::Artifacts => {
                controller.refresh_artifacts();
                drain(&mut controller, None).await;
                let artifacts = &controller.state().ui.artifacts;
                if artifacts.is_empty() {
                    println!("No artifacts.");
                }
                for artifact in artifacts {
                    println!("{}", describe_artifact(artifact));
                }
            }
            Input::Message(text) => {
                if let Some(id) = controller.send(text) {
                    drain(&mut controller, Some(id)).await;
                    println!();
                }
            }
        }

        if let Some(path) = &state_path {
            if let Err(e) = Snapshot::capture(controller.state()).save(path) {
                warn!(error = %e, path = %path.display(), "Failed to save state");
            }
        }
    }

    controller.cancel();
    if let Some(path) = &state_path {
        Snapshot::capture(controller.state()).save(path)?;
    }
    Ok(())
}

/// Apply events until the reply and any artifact fetch are done.
async fn drain(controller: &mut ChatController, message_id: Option<MessageId>) {
    let mut printer = message_id.map(|id| Printer::new(id, controller.state()));

    while controller.is_sending() || controller.state().ui.artifacts_loading {
        tokio::select! {
            event = controller.recv() => {
                let Some(event) = event else { break };
                if controller.handle(event) {
                    if let Some(printer) = printer.as_mut() {
                        printer.update(controller.state_mut());
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if controller.is_sending() {
                    controller.cancel();
                    if let Some(printer) = printer.as_mut() {
                        printer.update(controller.state_mut());
                    }
                } else {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prismer_client::Message;

    #[test]
    fn slash_commands() {
        assert_eq!(parse_input("   "), Input::Empty);
        assert_eq!(parse_input(" plot it "), Input::Message("plot it"));
        assert_eq!(parse_input("/new"), Input::New);
        assert_eq!(parse_input("/exit"), Input::Quit);
        assert_eq!(parse_input("/frobnicate"), Input::Unknown("frobnicate"));
    }

    #[test]
    fn printer_only_prints_new_text() {
        let mut state = ClientState::default();
        let id = state.conversation.add_message(Message::assistant_placeholder());
        let mut printer = Printer::new(id, &state);

        state.conversation.append_stream_chunk(id, "Hel");
        printer.update(&mut state);
        assert_eq!(printer.printed, 3);

        state.conversation.append_stream_chunk(id, "lo");
        printer.update(&mut state);
        assert_eq!(printer.printed, 5);
    }

    #[test]
    fn describes_directories_with_slash() {
        let dir = Artifact::directory("figs", "/output/figs", Utc::now());
        assert!(describe_artifact(&dir).ends_with("/output/figs/"));
        let file = Artifact::file("a.csv", "/output/a.csv", 42, Utc::now());
        assert!(describe_artifact(&file).contains("42"));
    }
}
