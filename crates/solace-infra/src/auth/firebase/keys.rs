//! Cache of the public keys that sign Firebase ID tokens.

use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::JwkSet;
use reqwest::header::{CACHE_CONTROL, HeaderMap};
use tokio::sync::{Mutex, RwLock};

use solace_core::ports::AuthError;

/// Used when the key endpoint sends no `max-age`.
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);

/// While the cached set is unexpired, an unknown `kid` refetches at most this often.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

struct CachedKeys {
    keys: JwkSet,
    expires_at: Instant,
}

/// JWK set fetched on demand and kept until its `Cache-Control` expiry.
pub(crate) struct KeyCache {
    url: String,
    client: reqwest::Client,
    state: RwLock<Option<CachedKeys>>,
    /// Held for the whole fetch; records when the last one started.
    last_refresh: Mutex<Option<Instant>>,
}

impl KeyCache {
    pub(crate) fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client,
            state: RwLock::new(None),
            last_refresh: Mutex::new(None),
        }
    }

    /// Seed the cache with a fixed key set.
    #[cfg(test)]
    pub(crate) fn with_keys(client: reqwest::Client, url: impl Into<String>, keys: JwkSet) -> Self {
        Self {
            url: url.into(),
            client,
            state: RwLock::new(Some(CachedKeys {
                keys,
                expires_at: Instant::now() + DEFAULT_KEY_TTL,
            })),
            last_refresh: Mutex::new(None),
        }
    }

    /// Key for `kid`, refreshing the set if it is stale or lacks the id
    /// (Google rotates keys ahead of the cache expiry).
    ///
    /// Concurrent misses share one fetch, and an unknown id on an unexpired
    /// set refetches at most once per [`MIN_REFRESH_INTERVAL`].
    pub(crate) async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.cached(kid).await? {
            return Ok(key);
        }

        let mut last_refresh = self.last_refresh.lock().await;

        // Another task may have refreshed while we waited for the lock.
        if let Some(key) = self.cached(kid).await? {
            return Ok(key);
        }

        let recently_refreshed =
            last_refresh.is_some_and(|at| at.elapsed() < MIN_REFRESH_INTERVAL);
        if recently_refreshed && self.is_current().await {
            tracing::debug!(kid, "Unknown signing key, refresh skipped");
            return Err(unknown_key(kid));
        }

        *last_refresh = Some(Instant::now());
        self.refresh().await?;

        self.cached(kid).await?.ok_or_else(|| unknown_key(kid))
    }

    async fn is_current(&self) -> bool {
        self.state
            .read()
            .await
            .as_ref()
            .is_some_and(|c| c.expires_at > Instant::now())
    }

    async fn cached(&self, kid: &str) -> Result<Option<DecodingKey>, AuthError> {
        let state = self.state.read().await;
        let Some(cached) = state.as_ref().filter(|c| c.expires_at > Instant::now()) else {
            return Ok(None);
        };

        cached
            .keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()
            .map_err(|e| AuthError::Provider(format!("unusable signing key '{kid}': {e}")))
    }

    async fn refresh(&self) -> Result<(), AuthError> {
        tracing::debug!(url = %self.url, "Fetching identity provider signing keys");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Provider(format!("key fetch failed: {e}")))?;

        let ttl = max_age(response.headers()).unwrap_or(DEFAULT_KEY_TTL);
        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("invalid key set: {e}")))?;

        tracing::info!(keys = keys.keys.len(), ttl_secs = ttl.as_secs(), "Signing keys refreshed");
        *self.state.write().await = Some(CachedKeys {
            keys,
            expires_at: Instant::now() + ttl,
        });

        Ok(())
    }
}

fn unknown_key(kid: &str) -> AuthError {
    AuthError::InvalidToken(format!("unknown signing key '{kid}'"))
}

fn max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .find_map(|directive| directive.trim().strip_prefix("max-age=")?.parse().ok())
        .map(Duration::from_secs)
}
