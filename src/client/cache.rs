//! Bounded client instance cache
//!
//! One facade instance per connection identity, evicted in insertion order
//! once the capacity is exceeded. Hits never reorder entries.
//!
//! The map lock only covers lookup and bookkeeping. Construction runs
//! outside it behind a per-identity cell, so a slow BMC never blocks hits
//! for other identities and concurrent first access constructs once.

use crate::client::facade::{BmcClient, ClientFactory};
use crate::config::{ConnectionConfig, ConnectionIdentity};
use crate::error::Result;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

/// Slot for one identity; empty while its client is being constructed
type Slot = Arc<OnceCell<Arc<BmcClient>>>;

// =============================================================================
// Statistics
// =============================================================================

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

// =============================================================================
// Client Cache
// =============================================================================

/// Insertion-ordered pool of facade instances
pub struct ClientCache {
    factory: ClientFactory,
    /// Entries in insertion order (front = oldest)
    entries: Mutex<IndexMap<ConnectionIdentity, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ClientCache {
    pub fn new(factory: ClientFactory) -> Self {
        Self {
            factory,
            entries: Mutex::new(IndexMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn factory(&self) -> &ClientFactory {
        &self.factory
    }

    pub fn capacity(&self) -> usize {
        self.factory.options().cache_capacity
    }

    /// Instance for `config`, constructing it on a miss
    ///
    /// With caching disabled every call constructs a fresh instance. A
    /// failed construction leaves the cache unchanged. Callers racing on
    /// the same identity share one construction.
    pub async fn get(&self, config: &ConnectionConfig) -> Result<Arc<BmcClient>> {
        if !self.factory.options().caching {
            return Ok(Arc::new(self.factory.connect(config).await?));
        }

        let identity = config.identity();
        let slot = {
            let mut entries = self.entries.lock().await;
            match entries.get(&identity) {
                Some(slot) => {
                    if let Some(client) = slot.get() {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        debug!("client cache hit for {}", identity.address);
                        return Ok(client.clone());
                    }
                    debug!("waiting on pending client for {}", identity.address);
                    slot.clone()
                }
                None => {
                    let slot: Slot = Arc::new(OnceCell::new());
                    entries.insert(identity.clone(), slot.clone());
                    slot
                }
            }
        };

        let result = slot
            .get_or_try_init(|| async {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.factory.connect(config).await.map(Arc::new)
            })
            .await
            .map(Arc::clone);

        let mut entries = self.entries.lock().await;
        let current = entries
            .get(&identity)
            .map_or(false, |existing| Arc::ptr_eq(existing, &slot));
        match result {
            Ok(client) => {
                if current {
                    self.evict_overflow(&mut entries, &identity);
                }
                Ok(client)
            }
            Err(e) => {
                if current && slot.get().is_none() {
                    entries.shift_remove(&identity);
                }
                Err(e)
            }
        }
    }

    /// Drop the oldest entries until the capacity holds, never `keep`
    fn evict_overflow(
        &self,
        entries: &mut IndexMap<ConnectionIdentity, Slot>,
        keep: &ConnectionIdentity,
    ) {
        while entries.len() > self.capacity() {
            let Some(index) = entries.keys().position(|identity| identity != keep) else {
                break;
            };
            if let Some((evicted, _)) = entries.shift_remove_index(index) {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                info!("Evicted cached client for {}", evicted.address);
            }
        }
    }

    pub async fn contains(&self, identity: &ConnectionIdentity) -> bool {
        self.entries.lock().await.contains_key(identity)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Identities in eviction order
    pub async fn identities(&self) -> Vec<ConnectionIdentity> {
        self.entries.lock().await.keys().cloned().collect()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulated::{Fixture, SimulatedConnector};
    use crate::config::ClientOptions;
    use crate::domain::ports::{Protocol, ProtocolClientRef, ProtocolConnector};
    use crate::error::Error;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Holds the legacy connection to one address until released
    struct GatedConnector {
        inner: SimulatedConnector,
        gated: String,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ProtocolConnector for GatedConnector {
        async fn connect(
            &self,
            protocol: Protocol,
            config: &ConnectionConfig,
        ) -> Result<ProtocolClientRef> {
            if protocol == Protocol::Legacy && config.address == self.gated {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.connect(protocol, config).await
        }
    }

    fn cache(capacity: usize, caching: bool) -> (ClientCache, Arc<SimulatedConnector>) {
        let connector = Arc::new(SimulatedConnector::new(Fixture::new("ProLiant DL360 G7")));
        let options = ClientOptions {
            caching,
            cache_capacity: capacity,
            ..Default::default()
        };
        let factory = ClientFactory::new(connector.clone(), options).unwrap();
        (ClientCache::new(factory), connector)
    }

    fn host(address: &str) -> ConnectionConfig {
        ConnectionConfig::new(address, "admin", "secret")
    }

    #[tokio::test]
    async fn test_hit_returns_same_instance() {
        let (cache, connector) = cache(4, true);
        let first = cache.get(&host("10.0.0.1")).await.unwrap();
        let second = cache.get(&host("10.0.0.1")).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connections(), 1);
        assert_eq!(cache.stats().await.hits, 1);
    }

    #[tokio::test]
    async fn test_password_is_part_of_identity() {
        let (cache, _) = cache(4, true);
        let first = cache.get(&host("10.0.0.1")).await.unwrap();
        let other = cache
            .get(&ConnectionConfig::new("10.0.0.1", "admin", "rotated"))
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_insertion_order_eviction() {
        let (cache, connector) = cache(2, true);
        let a = host("10.0.0.1");
        let b = host("10.0.0.2");
        let c = host("10.0.0.3");

        cache.get(&a).await.unwrap();
        cache.get(&b).await.unwrap();
        // a hit does not protect `a` from eviction
        cache.get(&a).await.unwrap();
        cache.get(&c).await.unwrap();

        assert_eq!(cache.identities().await, vec![b.identity(), c.identity()]);
        assert!(!cache.contains(&a.identity()).await);
        assert_eq!(cache.stats().await.evictions, 1);

        let connections = connector.connections();
        cache.get(&a).await.unwrap();
        assert!(connector.connections() > connections);
        assert_eq!(cache.identities().await, vec![c.identity(), a.identity()]);
    }

    #[tokio::test]
    async fn test_uncached_mode_constructs_every_time() {
        let (cache, connector) = cache(2, false);
        let first = cache.get(&host("10.0.0.1")).await.unwrap();
        let second = cache.get(&host("10.0.0.1")).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connections(), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_construction_leaves_cache_unchanged() {
        let (cache, _) = cache(2, true);
        cache.get(&host("10.0.0.1")).await.unwrap();
        assert_matches!(cache.get(&host("  ")).await, Err(Error::InvalidInput(_)));
        assert_eq!(cache.identities().await, vec![host("10.0.0.1").identity()]);
    }

    #[tokio::test]
    async fn test_concurrent_first_access_constructs_once() {
        let (cache, connector) = cache(4, true);
        let config = host("10.0.0.1");

        let clients = futures::future::join_all((0..8).map(|_| cache.get(&config))).await;

        let first = clients[0].as_ref().unwrap();
        for client in &clients {
            assert!(Arc::ptr_eq(first, client.as_ref().unwrap()));
        }
        // a G7 server needs a single legacy connection
        assert_eq!(connector.connections(), 1);
        assert_eq!(cache.stats().await.misses, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_slow_construction_does_not_block_hits() {
        let connector = Arc::new(GatedConnector {
            inner: SimulatedConnector::new(Fixture::new("ProLiant DL360 G7")),
            gated: "10.0.0.99".to_string(),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let factory = ClientFactory::new(connector.clone(), ClientOptions::default()).unwrap();
        let cache = Arc::new(ClientCache::new(factory));
        let cached = cache.get(&host("10.0.0.1")).await.unwrap();

        let pending = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get(&host("10.0.0.99")).await }
        });
        connector.entered.notified().await;

        let hit = tokio::time::timeout(Duration::from_secs(1), cache.get(&host("10.0.0.1")))
            .await
            .expect("hit waited on another identity's construction")
            .unwrap();
        assert!(Arc::ptr_eq(&cached, &hit));

        connector.release.notify_one();
        pending.await.unwrap().unwrap();
        assert_eq!(
            cache.identities().await,
            vec![host("10.0.0.1").identity(), host("10.0.0.99").identity()]
        );
    }
}
