//! Process-wide access token cache.
//!
//! Responsibilities:
//! - Key entries by a SHA-256 digest of the credential blob.
//! - Serve cached tokens until they come within the refresh margin (10 min).
//! - Coalesce concurrent refreshes of one credential (single-flight).
//! - Leave the cache untouched when a fetch fails.
use crate::service_account::ServiceAccountFetcher;
use chanrelay_types::{AccessToken, TokenFetcher, traits::Result};
use sha2::{Digest as _, Sha256};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, OnceLock},
    time::Duration,
};

/// Tokens expiring sooner than this are refreshed before use.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(600);

type CredentialKey = String;

fn credential_key(credential: &str) -> CredentialKey {
    hex::encode(Sha256::digest(credential.as_bytes()))
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

pub struct AccessTokenCache {
    fetcher: Arc<dyn TokenFetcher>,
    margin: Duration,
    entries: Mutex<HashMap<CredentialKey, AccessToken>>,
    refreshing: Mutex<HashMap<CredentialKey, Arc<tokio::sync::Mutex<()>>>>,
}

static GLOBAL: OnceLock<Arc<AccessTokenCache>> = OnceLock::new();

fn service_account_cache(margin: Duration) -> Arc<AccessTokenCache> {
    Arc::new(
        AccessTokenCache::new(Arc::new(ServiceAccountFetcher::new(rquest::Client::new())))
            .with_refresh_margin(margin),
    )
}

impl AccessTokenCache {
    pub fn new(fetcher: Arc<dyn TokenFetcher>) -> Self {
        Self {
            fetcher,
            margin: DEFAULT_REFRESH_MARGIN,
            entries: Mutex::new(HashMap::new()),
            refreshing: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }

    /// The shared instance backed by [`ServiceAccountFetcher`].
    ///
    /// Uses [`DEFAULT_REFRESH_MARGIN`] unless [`configure_global`] ran first.
    ///
    /// [`configure_global`]: Self::configure_global
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| service_account_cache(DEFAULT_REFRESH_MARGIN)))
    }

    /// Install the shared instance with a configured refresh margin.
    ///
    /// Returns `false` if the shared instance already exists; it is left as is.
    pub fn configure_global(margin: Duration) -> bool {
        let mut installed = false;
        GLOBAL.get_or_init(|| {
            installed = true;
            service_account_cache(margin)
        });
        if !installed {
            tracing::warn!("access token cache already initialized, margin not applied");
        }
        installed
    }

    #[must_use]
    pub fn refresh_margin(&self) -> Duration {
        self.margin
    }

    /// Return a usable access token for `credential`, fetching one if the
    /// cached entry is missing or expires within the refresh margin.
    ///
    /// # Errors
    ///
    /// Propagates the fetcher's error; the cache is not modified in that case.
    pub async fn get_access_token(&self, credential: &str) -> Result<String> {
        let key = credential_key(credential);
        if let Some(token) = self.fresh(&key) {
            return Ok(token);
        }

        let gate = Arc::clone(lock(&self.refreshing).entry(key.clone()).or_default());
        let _guard = gate.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(token) = self.fresh(&key) {
            tracing::debug!("access token refreshed by concurrent caller");
            return Ok(token);
        }

        let token = self.fetcher.fetch(credential).await.inspect_err(|e| {
            tracing::warn!(error = %e, "access token refresh failed");
        })?;
        tracing::info!(
            expires_in = token.remaining().as_secs(),
            "access token refreshed"
        );
        let access_token = token.access_token.clone();
        lock(&self.entries).insert(key, token);
        Ok(access_token)
    }

    /// The cached entry for `credential`, whether or not it is still fresh.
    #[must_use]
    pub fn cached(&self, credential: &str) -> Option<AccessToken> {
        lock(&self.entries).get(&credential_key(credential)).cloned()
    }

    /// Drop the cached entry for `credential`.
    pub fn invalidate(&self, credential: &str) {
        lock(&self.entries).remove(&credential_key(credential));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fresh(&self, key: &str) -> Option<String> {
        lock(&self.entries)
            .get(key)
            .filter(|t| !t.expires_within(self.margin))
            .map(|t| t.access_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chanrelay_types::RelayError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out `tok-1`, `tok-2`, ... with a fixed lifetime; fails once
    /// `fail_after` successful fetches have been served.
    struct CountingFetcher {
        calls: AtomicUsize,
        lifetime_secs: u64,
        fail_after: usize,
        delay: Duration,
    }

    impl CountingFetcher {
        fn new(lifetime_secs: u64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                lifetime_secs,
                fail_after: usize::MAX,
                delay: Duration::ZERO,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenFetcher for CountingFetcher {
        async fn fetch(&self, _credential: &str) -> Result<AccessToken> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if n > self.fail_after {
                return Err(RelayError::TokenFetch("endpoint down".into()));
            }
            Ok(AccessToken::expiring_in(format!("tok-{n}"), self.lifetime_secs))
        }
    }

    fn cache_with(fetcher: &Arc<CountingFetcher>) -> AccessTokenCache {
        AccessTokenCache::new(Arc::clone(fetcher) as Arc<dyn TokenFetcher>)
    }

    #[tokio::test]
    async fn test_fresh_token_is_reused() {
        let fetcher = Arc::new(CountingFetcher::new(3600));
        let cache = cache_with(&fetcher);
        assert_eq!(cache.get_access_token("cred").await.unwrap(), "tok-1");
        assert_eq!(cache.get_access_token("cred").await.unwrap(), "tok-1");
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_token_inside_margin_is_refreshed_once() {
        // 300 s lifetime is inside the 600 s margin: every lookup refreshes.
        let fetcher = Arc::new(CountingFetcher::new(300));
        let cache = cache_with(&fetcher);
        assert_eq!(cache.get_access_token("cred").await.unwrap(), "tok-1");
        assert_eq!(cache.get_access_token("cred").await.unwrap(), "tok-2");
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cache.cached("cred").unwrap().access_token, "tok-2");
    }

    #[tokio::test]
    async fn test_custom_margin() {
        let fetcher = Arc::new(CountingFetcher::new(300));
        let cache = cache_with(&fetcher).with_refresh_margin(Duration::from_secs(60));
        cache.get_access_token("cred").await.unwrap();
        cache.get_access_token("cred").await.unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_entry() {
        let fetcher = Arc::new(CountingFetcher {
            fail_after: 1,
            ..CountingFetcher::new(300)
        });
        let cache = cache_with(&fetcher);
        assert_eq!(cache.get_access_token("cred").await.unwrap(), "tok-1");

        let err = cache.get_access_token("cred").await.unwrap_err();
        assert!(matches!(err, RelayError::TokenFetch(_)));
        assert_eq!(cache.cached("cred").unwrap().access_token, "tok-1");
    }

    #[tokio::test]
    async fn test_failed_first_fetch_caches_nothing() {
        let fetcher = Arc::new(CountingFetcher {
            fail_after: 0,
            ..CountingFetcher::new(3600)
        });
        let cache = cache_with(&fetcher);
        assert!(cache.get_access_token("cred").await.is_err());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_credentials_have_distinct_entries() {
        let fetcher = Arc::new(CountingFetcher::new(3600));
        let cache = cache_with(&fetcher);
        let a = cache.get_access_token("cred-a").await.unwrap();
        let b = cache.get_access_token("cred-b").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_coalesced() {
        let fetcher = Arc::new(CountingFetcher {
            delay: Duration::from_millis(20),
            ..CountingFetcher::new(3600)
        });
        let cache = Arc::new(cache_with(&fetcher));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_access_token("cred").await })
            })
            .collect();
        for t in futures_util::future::join_all(tasks).await {
            assert_eq!(t.unwrap().unwrap(), "tok-1");
        }
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_fetch() {
        let fetcher = Arc::new(CountingFetcher::new(3600));
        let cache = cache_with(&fetcher);
        cache.get_access_token("cred").await.unwrap();
        cache.invalidate("cred");
        assert_eq!(cache.get_access_token("cred").await.unwrap(), "tok-2");
    }

    #[test]
    fn test_configure_global_applies_margin_once() {
        let margin = Duration::from_secs(120);
        if AccessTokenCache::configure_global(margin) {
            assert_eq!(AccessTokenCache::global().refresh_margin(), margin);
        }
        let current = AccessTokenCache::global().refresh_margin();
        assert!(!AccessTokenCache::configure_global(Duration::from_secs(60)));
        assert_eq!(AccessTokenCache::global().refresh_margin(), current);
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(
            &AccessTokenCache::global(),
            &AccessTokenCache::global()
        ));
    }

    #[test]
    fn test_credential_key_is_stable_digest() {
        let k = credential_key("blob");
        assert_eq!(k.len(), 64);
        assert_eq!(k, credential_key("blob"));
        assert_ne!(k, credential_key("blob2"));
    }
}
