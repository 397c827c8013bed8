//! HTTP gateway for prismer.
//!
//! This crate exposes the agent to the browser workspace. It handles:
//!
//! - Streaming chat over server-sent events, or buffered JSON replies
//! - Session bookkeeping over an injected [`SessionStore`]
//! - Artifact listing and workspace file CRUD, scoped to the workspace root
//! - Health checks
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                  Browser UI                   │
//! └───────────────────────────────────────────────┘
//!                        │ HTTP / SSE
//!                        ▼
//! ┌───────────────────────────────────────────────┐
//! │                prismer-gateway                │
//! │   ┌──────────┐  ┌──────────┐  ┌───────────┐   │
//! │   │   Chat   │  │ Sessions │  │ Workspace │   │
//! │   └──────────┘  └──────────┘  └───────────┘   │
//! └───────────────────────────────────────────────┘
//!          │               │              │
//!          ▼               ▼              ▼
//!    ┌──────────┐   ┌───────────┐   ┌──────────┐
//!    │  Agent   │   │  Session  │   │  Files   │
//!    │ process  │   │   store   │   │          │
//!    └──────────┘   └───────────┘   └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use prismer_agent::{AgentService, CommandSpawner};
//! use prismer_gateway::{create_router, GatewayConfig, GatewayState};
//! use prismer_store::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::default();
//! let agent = Arc::new(AgentService::new(CommandSpawner, config.agent.clone()));
//! let sessions = Arc::new(MemoryStore::new());
//!
//! let app = create_router(GatewayState::new(agent, sessions, config));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`SessionStore`]: prismer_store::SessionStore

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::GatewayState;
