use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use ouinet_core::swarm::SwarmName;
use ouinet_dht::{DhtClient, UdpEndpoint};
use tokio::sync::Mutex;

use crate::cell::LookupCell;
use crate::config::LookupConfig;
use crate::error::LookupError;

/// Bounded-size cache of per-swarm [`LookupCell`]s, coordinating peer
/// discovery so concurrent `load()` calls for the same swarm share one DHT
/// query. Evicting a cell from the LRU only drops its cached result; a
/// lookup already in flight holds its own `Arc` and keeps running.
pub struct LookupCache<D: DhtClient> {
    dht: Arc<D>,
    config: LookupConfig,
    cells: Mutex<LruCache<SwarmName, Arc<LookupCell>>>,
}

impl<D: DhtClient> LookupCache<D> {
    pub fn new(dht: Arc<D>, config: LookupConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        LookupCache {
            dht,
            config,
            cells: Mutex::new(LruCache::new(capacity)),
        }
    }

    async fn cell_for(&self, swarm: &SwarmName) -> Arc<LookupCell> {
        let mut cells = self.cells.lock().await;
        if let Some(cell) = cells.get(swarm) {
            return Arc::clone(cell);
        }
        let cell = Arc::new(LookupCell::new());
        cells.put(swarm.clone(), Arc::clone(&cell));
        cell
    }

    pub async fn get(&self, swarm: &SwarmName) -> Result<HashSet<UdpEndpoint>, LookupError> {
        let cell = self.cell_for(swarm).await;
        cell.get(
            &*self.dht,
            swarm.info_hash(),
            self.config.freshness,
            self.config.watchdog,
        )
        .await
    }

    pub async fn len(&self) -> usize {
        self.cells.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ouinet_core::swarm::InfoHash;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDht {
        calls: AtomicUsize,
    }

    impl DhtClient for CountingDht {
        async fn announce(&self, _infohash: InfoHash) -> Result<(), ouinet_dht::DhtError> {
            Ok(())
        }

        async fn get_peers(&self, _infohash: InfoHash) -> Result<HashSet<UdpEndpoint>, ouinet_dht::DhtError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HashSet::new())
        }

        fn local_endpoints(&self) -> HashSet<UdpEndpoint> {
            HashSet::new()
        }

        fn wan_endpoints(&self) -> HashSet<UdpEndpoint> {
            HashSet::new()
        }
    }

    #[tokio::test]
    async fn distinct_swarms_get_distinct_cells() {
        let dht = Arc::new(CountingDht {
            calls: AtomicUsize::new(0),
        });
        let cache = LookupCache::new(dht.clone(), LookupConfig::default());

        cache
            .get(&SwarmName::from_raw("ed25519:a/v6/uri/one.example"))
            .await
            .unwrap();
        cache
            .get(&SwarmName::from_raw("ed25519:a/v6/uri/two.example"))
            .await
            .unwrap();

        assert_eq!(cache.len().await, 2);
        assert_eq!(dht.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn lru_evicts_the_least_recently_used_swarm() {
        let dht = Arc::new(CountingDht {
            calls: AtomicUsize::new(0),
        });
        let config = LookupConfig {
            capacity: 1,
            ..LookupConfig::default()
        };
        let cache = LookupCache::new(dht, config);

        let a = SwarmName::from_raw("ed25519:a/v6/uri/one.example");
        let b = SwarmName::from_raw("ed25519:a/v6/uri/two.example");
        cache.get(&a).await.unwrap();
        cache.get(&b).await.unwrap();

        assert_eq!(cache.len().await, 1);
    }
}
