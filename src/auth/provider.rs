//! Authenticator - exchanges session cookies for a bearer token
//!
//! Manages the token lifecycle:
//! - Cache lookup before any network call
//! - Browser-mimicking session exchange on a miss
//! - Storing the fresh token for the cache TTL

use reqwest::header::{HeaderMap, COOKIE};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;
use crate::Result;
use crate::error::Error;
use crate::headers::{browser_headers, value};
use super::cache::TokenCache;
use super::credentials::Credentials;

/// Session endpoint, relative to the provider base URL
const SESSION_PATH: &str = "api/auth/session";

/// Body of the session endpoint; only the token matters
#[derive(Debug, Default, Deserialize)]
struct SessionResponse {
    #[serde(rename = "accessToken", default)]
    access_token: Option<String>,
}

/// Token cache authenticator
///
/// Cloning shares the underlying cache, so every clone observes the same
/// token for its TTL window.
#[derive(Clone)]
pub struct Authenticator {
    http_client: Client,
    cache: Arc<TokenCache>,
    session_url: Url,
    base_url: Url,
    refresh_lock: Arc<Mutex<()>>,
}

impl Authenticator {
    pub fn new(http_client: Client, cache: Arc<TokenCache>, base_url: &Url) -> Result<Self> {
        Ok(Self {
            http_client,
            cache,
            session_url: base_url.join(SESSION_PATH)?,
            base_url: base_url.clone(),
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn cache(&self) -> &Arc<TokenCache> {
        &self.cache
    }

    /// Get a valid access token, exchanging the session cookies if needed
    pub async fn get_access_token(&self, credentials: &Credentials) -> Result<String> {
        if let Some(token) = self.cache.get() {
            tracing::debug!("Using cached access token");
            return Ok(token);
        }

        // Serialize refreshes; whoever waited may find the token already there.
        let _guard = self.refresh_lock.lock().await;
        if let Some(token) = self.cache.get() {
            tracing::debug!("Access token refreshed by a concurrent caller");
            return Ok(token);
        }

        let session = self.fetch_session(credentials).await?;
        let token = match session.access_token {
            Some(token) if !token.is_empty() => token,
            _ => {
                tracing::debug!("Session response carried no access token");
                return Err(Error::Unauthorized);
            }
        };

        let cached = self.cache.set(token);
        tracing::info!("Fetched new access token, valid until {}", cached.expires_at);
        Ok(cached.value)
    }

    /// Call the session endpoint
    ///
    /// Credentials that cannot be sent as headers, network failures and
    /// unreadable bodies all count as an empty session, which the caller
    /// turns into `Unauthorized`.
    async fn fetch_session(&self, credentials: &Credentials) -> Result<SessionResponse> {
        let headers = match self.session_headers(credentials) {
            Ok(headers) => headers,
            Err(e) => {
                tracing::warn!("Cannot present session credentials: {}", e);
                return Ok(SessionResponse::default());
            }
        };

        let response = match self
            .http_client
            .get(self.session_url.clone())
            .headers(headers)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Session request failed: {}", e);
                return Ok(SessionResponse::default());
            }
        };

        match response.json::<SessionResponse>().await {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::warn!("Session response was not valid JSON: {}", e);
                Ok(SessionResponse::default())
            }
        }
    }

    fn session_headers(&self, credentials: &Credentials) -> Result<HeaderMap> {
        let mut headers = browser_headers(&self.base_url, &credentials.user_agent)?;
        headers.insert(COOKIE, value(&credentials.cookie_header(), "cookie")?);
        Ok(headers)
    }
}
