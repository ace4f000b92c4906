//! Conversation client
//!
//! Asks one question per call over the provider's event-stream endpoint:
//! - Resolves a bearer token through the shared [`Authenticator`]
//! - Posts the question anchored to this client's thread id
//! - Decodes the event stream and reduces it to the final answer
//!
//! A call moves through `TokenResolving -> RequestSent -> Streaming` and ends
//! resolved or failed. The answer only resolves on the `[DONE]` sentinel; a
//! stream that ends without it never resolves, so callers wanting bounded
//! latency wrap [`ChatClient::get_answer`] in their own timeout.

pub mod reducer;
pub mod sse;
pub mod types;

use chrono::Duration;
use futures_util::{pin_mut, Stream, StreamExt};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;
use crate::Result;
use crate::auth::{Authenticator, Credentials, TokenCache};
use crate::config::Config;
use crate::error::Error;
use crate::headers::browser_headers;

pub use reducer::{AnswerReducer, DONE_SENTINEL};
pub use sse::{SseDecoder, SseEvent};
pub use types::{ConversationMessage, ConversationRequest, MessageContent};

/// Conversation endpoint, relative to the provider base URL
const CONVERSATION_PATH: &str = "backend-api/conversation";

/// Client for a single conversation thread
///
/// Cheap to clone; clones share the token cache and the thread id.
#[derive(Clone)]
pub struct ChatClient {
    credentials: Credentials,
    authenticator: Authenticator,
    http_client: Client,
    base_url: Url,
    conversation_url: Url,
    model: String,
    thread_id: Uuid,
}

impl ChatClient {
    /// Create a client with its own token cache
    pub fn new(
        credentials: Credentials,
        base_url: &Url,
        model: impl Into<String>,
        token_ttl: Duration,
    ) -> Result<Self> {
        let cache = Arc::new(TokenCache::with_ttl(token_ttl));
        let authenticator = Authenticator::new(Client::new(), cache, base_url)?;
        Self::with_authenticator(credentials, authenticator, base_url, model)
    }

    /// Create a client that shares an existing authenticator and its cache
    pub fn with_authenticator(
        credentials: Credentials,
        authenticator: Authenticator,
        base_url: &Url,
        model: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            credentials,
            http_client: authenticator.http_client().clone(),
            authenticator,
            base_url: base_url.clone(),
            conversation_url: base_url.join(CONVERSATION_PATH)?,
            model: model.into(),
            thread_id: Uuid::new_v4(),
        })
    }

    /// Create a client from the persisted configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.credentials(),
            &config.base_url()?,
            config.model.clone(),
            config.token_ttl(),
        )
    }

    /// Thread id sent as the parent message of every question
    pub fn thread_id(&self) -> Uuid {
        self.thread_id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Make sure the credentials yield an access token
    pub async fn ensure_auth(&self) -> Result<()> {
        self.authenticator.get_access_token(&self.credentials).await?;
        Ok(())
    }

    /// Ask a question and wait for the complete answer
    pub async fn get_answer(&self, question: &str) -> Result<String> {
        tracing::debug!(phase = "TokenResolving", "Resolving access token");
        let access_token = self.authenticator.get_access_token(&self.credentials).await?;

        let request = ConversationRequest::next(question, &self.model, self.thread_id);
        let headers = browser_headers(&self.base_url, &self.credentials.user_agent)?;

        tracing::debug!(phase = "RequestSent", thread_id = %self.thread_id, "Posting question");
        let response = self
            .http_client
            .post(self.conversation_url.clone())
            .headers(headers)
            .bearer_auth(&access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let status = status_text(&response);
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Conversation request failed with {}", status);
            return Err(Error::Transport { status, body });
        }

        tracing::debug!(phase = "Streaming", "Reading answer stream");
        reduce_event_stream(response.bytes_stream()).await
    }
}

/// Reduce a raw event stream to the final answer
///
/// Chunks are decoded in arrival order. Only primary `message` events reach
/// the reducer. Resolves on the `[DONE]` sentinel; if the stream ends before
/// it, the returned future stays pending forever.
pub async fn reduce_event_stream<S, B, E>(stream: S) -> Result<String>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    Error: From<E>,
{
    pin_mut!(stream);
    let mut decoder = SseDecoder::new();
    let mut reducer = AnswerReducer::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for event in decoder.feed(chunk.as_ref())? {
            if !event.is_message() {
                tracing::trace!("Skipping {:?} event", event.event);
                continue;
            }
            if let Some(answer) = reducer.apply(&event.data)? {
                tracing::debug!(phase = "Resolved", "Answer complete: {} chars", answer.len());
                return Ok(answer);
            }
        }
    }

    tracing::warn!(
        partial_event = !decoder.is_idle(),
        "Answer stream ended without {}; the answer will never resolve",
        DONE_SENTINEL
    );
    std::future::pending().await
}

/// Reason phrase the server sent on the status line
///
/// hyper only records it when it differs from the canonical reason, so fall
/// back to that and then to the numeric code.
fn status_text(response: &reqwest::Response) -> String {
    if let Some(reason) = response.extensions().get::<hyper::ext::ReasonPhrase>() {
        return String::from_utf8_lossy(reason.as_bytes()).into_owned();
    }
    canonical_status_text(response.status())
}

fn canonical_status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}
