//! Short-lived access token cache
//!
//! Holds at most one bearer token and evicts it once its TTL has elapsed.
//! Time comes from a [`Clock`] so expiry can be driven by tests.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard};

/// Default lifetime of a cached access token
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 10;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A token together with the instant it stops being valid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Single-slot token cache with a fixed TTL
pub struct TokenCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: Mutex::new(None),
        }
    }

    /// Cache using the wall clock
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::new(ttl, Arc::new(SystemClock))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the cached token unless it has expired
    ///
    /// An expired entry is evicted on the way out.
    pub fn get(&self) -> Option<String> {
        let now = self.clock.now();
        let mut slot = self.lock();
        match slot.as_ref() {
            Some(token) if !token.is_expired_at(now) => Some(token.value.clone()),
            Some(_) => {
                *slot = None;
                None
            }
            None => None,
        }
    }

    /// Store a token, replacing any previous one
    pub fn set(&self, value: impl Into<String>) -> CachedToken {
        let token = CachedToken {
            value: value.into(),
            expires_at: self.clock.now() + self.ttl,
        };
        *self.lock() = Some(token.clone());
        token
    }

    /// True when no live token is held
    pub fn is_expired(&self) -> bool {
        let now = self.clock.now();
        self.lock()
            .as_ref()
            .map_or(true, |token| token.is_expired_at(now))
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<CachedToken>> {
        // The slot holds plain data, so a poisoned lock is still consistent.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::with_ttl(Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }
}

/// Manually advanced clock for tests
#[cfg(test)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_clock() -> (TokenCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = TokenCache::new(Duration::seconds(10), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_empty_cache() {
        let (cache, _) = cache_with_clock();
        assert!(cache.get().is_none());
        assert!(cache.is_expired());
    }

    #[test]
    fn test_token_live_within_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set("tok");
        clock.advance(Duration::seconds(9));
        assert_eq!(cache.get().as_deref(), Some("tok"));
        assert!(!cache.is_expired());
    }

    #[test]
    fn test_token_expires_exactly_at_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set("tok");
        clock.advance(Duration::seconds(10));
        assert!(cache.is_expired());
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_set_replaces_previous_token() {
        let (cache, clock) = cache_with_clock();
        cache.set("first");
        clock.advance(Duration::seconds(5));
        let token = cache.set("second");
        assert_eq!(token.expires_at, clock.now() + Duration::seconds(10));
        clock.advance(Duration::seconds(8));
        assert_eq!(cache.get().as_deref(), Some("second"));
    }

    #[test]
    fn test_clear() {
        let (cache, _) = cache_with_clock();
        cache.set("tok");
        cache.clear();
        assert!(cache.get().is_none());
    }
}
