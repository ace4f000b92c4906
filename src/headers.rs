//! Browser fingerprint headers
//!
//! The provider rejects requests that do not look like they come from the
//! browser the session cookies were issued to, so both endpoints send the
//! same header set a desktop Chrome would.

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_ENCODING, ACCEPT_LANGUAGE, ORIGIN, REFERER,
    USER_AGENT,
};
use url::Url;
use crate::Result;
use crate::error::Error;

const SEC_CH_UA: &str = r#""Not?A_Brand";v="8", "Chromium";v="108", "Google Chrome";v="108""#;
const SEC_CH_UA_PLATFORM: &str = r#""macOS""#;

/// Build the header set shared by the session and conversation requests
pub fn browser_headers(base_url: &Url, user_agent: &str) -> Result<HeaderMap> {
    let origin = base_url.origin().ascii_serialization();
    let referer = base_url.join("chat")?;

    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, value(user_agent, "user agent")?);
    headers.insert(
        HeaderName::from_static("x-openai-assistant-app-id"),
        HeaderValue::from_static(""),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
    headers.insert(ORIGIN, value(&origin, "origin")?);
    headers.insert(REFERER, value(referer.as_str(), "referer")?);
    headers.insert(HeaderName::from_static("sec-ch-ua"), HeaderValue::from_static(SEC_CH_UA));
    headers.insert(
        HeaderName::from_static("sec-ch-ua-platform"),
        HeaderValue::from_static(SEC_CH_UA_PLATFORM),
    );
    headers.insert(HeaderName::from_static("sec-fetch-dest"), HeaderValue::from_static("empty"));
    headers.insert(HeaderName::from_static("sec-fetch-mode"), HeaderValue::from_static("cors"));
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-origin"),
    );
    Ok(headers)
}

/// Parse a header value, reporting which setting was malformed
pub(crate) fn value(raw: &str, what: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(raw).map_err(|e| Error::Config(format!("Invalid {} header: {}", what, e)))
}
