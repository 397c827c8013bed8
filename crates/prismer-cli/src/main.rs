//! Prismer CLI - terminal front-end for the gateway.
//!
//! This is the entry point for the `prismer` binary.

mod repl;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use prismer_client::{ClientState, GatewayClient, ProviderSettings, Snapshot};
use prismer_core::SessionId;

/// Prismer CLI - chat with a workspace agent.
#[derive(Parser, Debug)]
#[command(name = "prismer")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gateway URL.
    #[arg(long, env = "PRISMER_GATEWAY", default_value = "http://localhost:8080")]
    gateway: String,

    /// File the conversation is saved to between runs.
    #[arg(long, env = "PRISMER_STATE")]
    state: Option<PathBuf>,

    /// Provider API key forwarded to the agent.
    #[arg(long, env = "PRISMER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Provider the API key belongs to.
    #[arg(long, env = "PRISMER_PROVIDER", default_value = "google")]
    provider: String,

    /// Model name.
    #[arg(long)]
    model: Option<String>,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat (the default).
    Chat,
    /// Send one message and print the whole reply.
    Ask {
        /// Continue this session.
        #[arg(long)]
        session: Option<String>,
        /// The message.
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// Manage sessions.
    Sessions {
        #[command(subcommand)]
        action: Option<SessionAction>,
    },
    /// List artifacts in the output directory.
    Artifacts {
        /// Directory to list.
        #[arg(long)]
        path: Option<String>,
        /// Include subdirectories.
        #[arg(long)]
        recursive: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SessionAction {
    /// List sessions.
    List,
    /// Create a session.
    Create {
        /// Explicit id.
        id: Option<String>,
    },
    /// Delete a session.
    Delete {
        /// Session id.
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.debug {
        tracing_subscriber::fmt()
            .with_env_filter("prismer_cli=debug,prismer_client=debug,warn")
            .with_writer(std::io::stderr)
            .init();
    }

    let mut client = GatewayClient::new(&args.gateway);
    if let Some(api_key) = args.api_key.filter(|key| !key.is_empty()) {
        client = client.with_provider(ProviderSettings {
            api_key,
            provider: args.provider,
            model: args.model,
        });
    }

    match args.command.unwrap_or(Command::Chat) {
        Command::Chat => {
            let state = match &args.state {
                Some(path) => Snapshot::load(path)
                    .with_context(|| format!("reading {}", path.display()))?
                    .map(Snapshot::restore)
                    .unwrap_or_default(),
                None => ClientState::default(),
            };
            repl::run(client, state, args.state).await
        }
        Command::Ask { session, prompt } => {
            let session = session.map(|s| s.parse::<SessionId>()).transpose()?;
            let reply = client.chat(&prompt.join(" "), session.as_ref()).await?;
            println!("{}", reply.content);
            for directive in &reply.directives {
                println!("-> {} {}", directive.kind, directive.payload);
            }
            Ok(())
        }
        Command::Sessions { action } => sessions(&client, action.unwrap_or(SessionAction::List)).await,
        Command::Artifacts { path, recursive } => {
            let artifacts = client.list_artifacts(path.as_deref(), recursive).await?;
            if artifacts.is_empty() {
                println!("No artifacts.");
            }
            for artifact in artifacts {
                println!("{}", repl::describe_artifact(&artifact));
            }
            Ok(())
        }
    }
}

async fn sessions(client: &GatewayClient, action: SessionAction) -> anyhow::Result<()> {
    match action {
        SessionAction::List => {
            let sessions = client.list_sessions().await?;
            if sessions.is_empty() {
                println!("No sessions.");
            }
            for session in sessions {
                println!(
                    "{:<40} {:>5} msgs  last active {}",
                    session.id.as_str(),
                    session.message_count,
                    session.last_active_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        SessionAction::Create { id } => {
            let id = id.map(|s| s.parse::<SessionId>()).transpose()?;
            let record = client.create_session(id.as_ref()).await?;
            println!("{}", record.id);
        }
        SessionAction::Delete { id } => {
            client.delete_session(&id.parse()?).await?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}
