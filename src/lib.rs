//! gpt-session - ask questions over a cookie-authenticated web session
//!
//! The library exchanges browser session cookies for a short-lived access
//! token and reduces the provider's event-stream answer to a single string.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod repl;
pub mod ui;

pub use client::ChatClient;
pub use error::{Error, Result};
