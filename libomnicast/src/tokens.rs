//! Token lifecycle management for the Facebook family
//!
//! Facebook issues short-lived user tokens that must be exchanged for
//! long-lived ones, and even those expire after a couple of months. The
//! lifecycle manager owns the exchange, introspection, and the periodic
//! proactive refresh. Refresh failures are logged and swallowed: a stale
//! token surfaces later as a publish-time authentication failure, never as a
//! crashed session.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::graph::{GraphApi, TokenInfo};
use crate::registry::PlatformId;
use crate::store::CredentialStore;

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days until `expires_at`, floored (negative when already expired)
pub fn days_left(expires_at: i64, now: i64) -> i64 {
    (expires_at - now).div_euclid(SECONDS_PER_DAY)
}

pub struct TokenLifecycle {
    graph: Arc<dyn GraphApi>,
    store: CredentialStore,
    threshold_days: i64,
}

impl TokenLifecycle {
    pub fn new(graph: Arc<dyn GraphApi>, store: CredentialStore, threshold_days: i64) -> Self {
        Self {
            graph,
            store,
            threshold_days,
        }
    }

    /// Exchange a short-lived token, caching the result and updating the
    /// Facebook credential
    pub async fn exchange_for_long_lived(&self, short_lived_token: &str) -> Result<String> {
        let long_lived = self.graph.exchange_token(short_lived_token).await?;
        self.store.set_long_lived_token(&long_lived)?;
        self.store.set(PlatformId::Facebook, &long_lived, None)?;
        Ok(long_lived)
    }

    /// Return the cached long-lived token, exchanging the given user token
    /// if no cache entry exists yet
    pub async fn ensure_long_lived(&self, user_token: &str) -> Result<String> {
        if let Some(cached) = self.store.long_lived_token()? {
            if !cached.is_empty() {
                return Ok(cached);
            }
        }
        self.exchange_for_long_lived(user_token).await
    }

    /// Introspect a token via the debug endpoint
    pub async fn verify_token(&self, token: &str) -> Result<TokenInfo> {
        self.graph.debug_token(token).await
    }

    /// Refresh the long-lived token if it expires within the configured
    /// threshold. Never fails: problems are logged and the session carries on.
    pub async fn refresh_if_expiring_soon(&self) {
        let token = match self.store.long_lived_token() {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => return,
            Err(e) => {
                warn!("Token check skipped, storage unavailable: {}", e);
                return;
            }
        };

        let info = match self.graph.debug_token(&token).await {
            Ok(info) => info,
            Err(e) => {
                warn!("Token check failed: {}", e);
                return;
            }
        };

        // expires_at == 0 means the token never expires.
        if info.expires_at == 0 {
            return;
        }

        let now = chrono::Utc::now().timestamp();
        let remaining = days_left(info.expires_at, now);
        debug!("Long-lived token has {} day(s) left", remaining);

        if remaining >= self.threshold_days {
            return;
        }

        match self.graph.exchange_token(&token).await {
            Ok(new_token) => {
                // The new token has its own expiry; the old one's would show
                // a stale countdown.
                let new_expiry = match self.graph.debug_token(&new_token).await {
                    Ok(info) if info.expires_at != 0 => Some(info.expires_at),
                    Ok(_) => None,
                    Err(e) => {
                        warn!("Could not introspect refreshed token: {}", e);
                        None
                    }
                };
                let stored = self
                    .store
                    .set_long_lived_token(&new_token)
                    .and_then(|_| self.store.set(PlatformId::Facebook, &new_token, None))
                    .and_then(|_| match new_expiry {
                        Some(expires_at) => self.store.set_expiry(PlatformId::Facebook, expires_at),
                        None => Ok(()),
                    });
                match stored {
                    Ok(()) => info!("Refreshed long-lived Facebook token"),
                    Err(e) => warn!("Refreshed token could not be stored: {}", e),
                }
            }
            Err(e) => warn!("Token refresh failed: {}", e),
        }
    }
}

/// Guard for the periodic expiry check; dropping it tears the timer down
pub struct RefreshTask {
    handle: JoinHandle<()>,
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Run `refresh_if_expiring_soon` on a fixed interval
///
/// The first check runs one full period after spawn, not at startup.
pub fn spawn_refresh_task(lifecycle: Arc<TokenLifecycle>, period: Duration) -> RefreshTask {
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // immediate first tick
        loop {
            interval.tick().await;
            lifecycle.refresh_if_expiring_soon().await;
        }
    });
    RefreshTask { handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mock::MockGraph;
    use crate::store::MemoryStorage;
    use std::sync::atomic::Ordering;

    fn test_store() -> CredentialStore {
        CredentialStore::new(Arc::new(MemoryStorage::new()))
    }

    fn lifecycle_with(graph: MockGraph, store: &CredentialStore) -> TokenLifecycle {
        TokenLifecycle::new(Arc::new(graph), store.clone(), 7)
    }

    #[test]
    fn test_days_left_floors_toward_negative_infinity() {
        assert_eq!(days_left(86_400 * 10, 0), 10);
        assert_eq!(days_left(86_400 * 10 + 1, 0), 10);
        assert_eq!(days_left(100, 0), 0);
        assert_eq!(days_left(0, 100), -1);
    }

    #[tokio::test]
    async fn test_exchange_updates_cache_and_credential() {
        let store = test_store();
        let mut graph = MockGraph::new();
        graph.long_lived_token = Some("long-lived".to_string());
        let lifecycle = lifecycle_with(graph, &store);

        let token = lifecycle.exchange_for_long_lived("short").await.unwrap();

        assert_eq!(token, "long-lived");
        assert_eq!(store.long_lived_token().unwrap().as_deref(), Some("long-lived"));
        assert_eq!(
            store.get(PlatformId::Facebook).unwrap().primary_token,
            "long-lived"
        );
    }

    #[tokio::test]
    async fn test_ensure_long_lived_prefers_cache() {
        let store = test_store();
        store.set_long_lived_token("cached").unwrap();
        let graph = MockGraph::new();
        let lifecycle = lifecycle_with(graph, &store);

        let token = lifecycle.ensure_long_lived("short").await.unwrap();
        assert_eq!(token, "cached");
    }

    #[tokio::test]
    async fn test_refresh_skips_when_not_connected() {
        let store = test_store();
        let lifecycle = TokenLifecycle::new(Arc::new(MockGraph::new()), store.clone(), 7);

        lifecycle.refresh_if_expiring_soon().await;
        // No token stored, so nothing was introspected or exchanged.
    }

    #[tokio::test]
    async fn test_refresh_exchanges_expiring_token() {
        let store = test_store();
        store.set_long_lived_token("old-token").unwrap();

        let mut graph = MockGraph::new();
        graph.long_lived_token = Some("new-token".to_string());
        // Expires in 3 days, under the 7-day threshold.
        graph.expires_at = chrono::Utc::now().timestamp() + 3 * 86_400;
        let lifecycle = lifecycle_with(graph, &store);

        lifecycle.refresh_if_expiring_soon().await;

        assert_eq!(store.long_lived_token().unwrap().as_deref(), Some("new-token"));
        assert_eq!(
            store.get(PlatformId::Facebook).unwrap().primary_token,
            "new-token"
        );
    }

    #[tokio::test]
    async fn test_refresh_records_new_token_expiry() {
        let store = test_store();
        store.set_long_lived_token("old-token").unwrap();

        let now = chrono::Utc::now().timestamp();
        let fresh_expiry = now + 60 * 86_400;
        let mut graph = MockGraph::new();
        graph.long_lived_token = Some("new-token".to_string());
        graph.expires_at = now + 3 * 86_400;
        graph
            .token_expiries
            .lock()
            .unwrap()
            .insert("new-token".to_string(), fresh_expiry);
        let lifecycle = lifecycle_with(graph, &store);

        lifecycle.refresh_if_expiring_soon().await;

        let credential = store.get(PlatformId::Facebook).unwrap();
        assert_eq!(credential.primary_token, "new-token");
        assert_eq!(credential.expires_at, Some(fresh_expiry));
    }

    #[tokio::test]
    async fn test_refresh_leaves_healthy_token_alone() {
        let store = test_store();
        store.set_long_lived_token("healthy").unwrap();

        let mut graph = MockGraph::new();
        graph.long_lived_token = Some("unused".to_string());
        graph.expires_at = chrono::Utc::now().timestamp() + 60 * 86_400;
        let graph = Arc::new(graph);
        let lifecycle = TokenLifecycle::new(graph.clone(), store.clone(), 7);

        lifecycle.refresh_if_expiring_soon().await;

        assert_eq!(store.long_lived_token().unwrap().as_deref(), Some("healthy"));
        assert_eq!(graph.exchange_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_swallowed() {
        let store = test_store();
        store.set_long_lived_token("expiring").unwrap();

        let mut graph = MockGraph::new();
        graph.long_lived_token = None; // exchange will fail
        graph.expires_at = chrono::Utc::now().timestamp() + 86_400;
        let lifecycle = lifecycle_with(graph, &store);

        // Must not panic or error; the stale token stays in place.
        lifecycle.refresh_if_expiring_soon().await;
        assert_eq!(store.long_lived_token().unwrap().as_deref(), Some("expiring"));
    }

    #[tokio::test]
    async fn test_refresh_task_is_torn_down_on_drop() {
        let store = test_store();
        let lifecycle = Arc::new(TokenLifecycle::new(Arc::new(MockGraph::new()), store, 7));

        let task = spawn_refresh_task(lifecycle, Duration::from_secs(3600));
        drop(task);
        // Dropping the guard aborts the timer; nothing left running.
    }
}
