//! Session credentials supplied by the config layer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Long-lived browser session credentials
///
/// Exchanged for a short-lived bearer token by [`super::Authenticator`].
/// Treated as opaque strings and never modified by the client.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Value of the `__Secure-next-auth.session-token` cookie
    #[serde(default)]
    pub session_token: String,

    /// Value of the `cf_clearance` cookie
    #[serde(default)]
    pub cf_clearance: String,

    /// User agent of the browser the cookies were taken from
    #[serde(default)]
    pub user_agent: String,
}

impl Credentials {
    pub fn new(
        session_token: impl Into<String>,
        cf_clearance: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            session_token: session_token.into(),
            cf_clearance: cf_clearance.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Check that every field has been filled in
    pub fn is_complete(&self) -> bool {
        !self.session_token.is_empty() && !self.cf_clearance.is_empty() && !self.user_agent.is_empty()
    }

    /// Same user agent, secrets cleared for re-entry
    pub fn without_secrets(&self) -> Self {
        Self {
            user_agent: self.user_agent.clone(),
            ..Self::default()
        }
    }

    /// Cookie header presented to the session endpoint
    pub fn cookie_header(&self) -> String {
        format!(
            "__Secure-next-auth.session-token={}; cf_clearance={}",
            self.session_token, self.cf_clearance
        )
    }
}

// Cookies are secrets; keep them out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("session_token", &mask(&self.session_token))
            .field("cf_clearance", &mask(&self.cf_clearance))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn mask(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header() {
        let creds = Credentials::new("sess", "clear", "Mozilla/5.0");
        assert_eq!(
            creds.cookie_header(),
            "__Secure-next-auth.session-token=sess; cf_clearance=clear"
        );
    }

    #[test]
    fn test_is_complete() {
        assert!(Credentials::new("a", "b", "c").is_complete());
        assert!(!Credentials::new("a", "", "c").is_complete());
        assert!(!Credentials::default().is_complete());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials::new("very-secret", "also-secret", "Mozilla/5.0");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("also-secret"));
        assert!(debug.contains("Mozilla/5.0"));
    }

    #[test]
    fn test_credentials_serialization() {
        let creds = Credentials::new("sess", "clear", "ua");
        let json = serde_json::to_string(&creds).unwrap();
        let parsed: Credentials = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, creds);
    }
}
