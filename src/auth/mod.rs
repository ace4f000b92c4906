//! Authentication module for session credentials and access tokens
//!
//! This module provides:
//! - Session credential type
//! - Short-lived token cache with an injectable clock
//! - Authenticator exchanging session cookies for a bearer token

mod cache;
mod credentials;
mod provider;

pub use cache::{CachedToken, Clock, SystemClock, TokenCache, DEFAULT_TOKEN_TTL_SECS};
pub use credentials::Credentials;
pub use provider::Authenticator;
