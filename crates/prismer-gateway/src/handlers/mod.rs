//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the gateway API.

pub mod artifacts;
pub mod chat;
pub mod files;
pub mod health;
pub mod sessions;
