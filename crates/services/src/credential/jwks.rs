use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use parking_lot::RwLock;
use reqwest::Client;
use tracing::debug;

/// Floor between fetches triggered by a key id the cache does not know.
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

/// In-memory cache of the authority's published signing keys.
pub struct JwksCache {
    url: String,
    ttl: Duration,
    entry: RwLock<Option<(Instant, JwkSet)>>,
}

impl JwksCache {
    pub fn new(url: String, ttl: Duration) -> Self {
        Self {
            url,
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// Looks up `kid`, fetching the key set when the cache is stale or does
    /// not know the key yet. Returns `Ok(None)` for a key the authority does
    /// not publish. Unknown key ids refetch at most once per
    /// `MIN_REFETCH_INTERVAL` (or per TTL, when that is shorter).
    pub async fn key(&self, client: &Client, kid: &str) -> Result<Option<Jwk>, reqwest::Error> {
        if let Some(jwk) = self.cached(kid) {
            return Ok(Some(jwk));
        }
        if self.fetched_recently() {
            debug!(kid, "Unknown key id, skipping refetch");
            return Ok(None);
        }

        let set = self.fetch(client).await?;
        Ok(set.find(kid).cloned())
    }

    fn cached(&self, kid: &str) -> Option<Jwk> {
        let guard = self.entry.read();
        let (fetched_at, set) = guard.as_ref()?;
        if fetched_at.elapsed() > self.ttl {
            return None;
        }
        set.find(kid).cloned()
    }

    fn fetched_recently(&self) -> bool {
        let floor = MIN_REFETCH_INTERVAL.min(self.ttl);
        self.entry
            .read()
            .as_ref()
            .is_some_and(|(fetched_at, _)| fetched_at.elapsed() < floor)
    }

    async fn fetch(&self, client: &Client) -> Result<JwkSet, reqwest::Error> {
        let set: JwkSet = client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(url = %self.url, keys = set.keys.len(), "Fetched signing keys");
        *self.entry.write() = Some((Instant::now(), set.clone()));
        Ok(set)
    }
}
