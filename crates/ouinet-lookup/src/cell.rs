use std::collections::HashSet;
use std::time::{Duration, Instant};

use ouinet_core::swarm::InfoHash;
use ouinet_dht::{DhtClient, UdpEndpoint};
use tokio::sync::{Mutex, RwLock};

use crate::error::LookupError;

/// Single-flight, freshness-windowed peer lookup for one swarm. Concurrent
/// callers serialize on `fetch_lock`; whichever arrives first performs the
/// DHT query, the rest find a fresh result already cached by the time they
/// acquire the lock and skip the query entirely.
pub struct LookupCell {
    fetch_lock: Mutex<()>,
    result: RwLock<Option<(HashSet<UdpEndpoint>, Instant)>>,
}

impl LookupCell {
    pub fn new() -> Self {
        LookupCell {
            fetch_lock: Mutex::new(()),
            result: RwLock::new(None),
        }
    }

    fn fresh(result: &Option<(HashSet<UdpEndpoint>, Instant)>, freshness: Duration) -> Option<HashSet<UdpEndpoint>> {
        result.as_ref().and_then(|(peers, time)| {
            if time.elapsed() < freshness {
                Some(peers.clone())
            } else {
                None
            }
        })
    }

    pub async fn get<D: DhtClient>(
        &self,
        dht: &D,
        infohash: InfoHash,
        freshness: Duration,
        watchdog: Duration,
    ) -> Result<HashSet<UdpEndpoint>, LookupError> {
        if let Some(peers) = Self::fresh(&*self.result.read().await, freshness) {
            return Ok(peers);
        }

        let _guard = self.fetch_lock.lock().await;

        if let Some(peers) = Self::fresh(&*self.result.read().await, freshness) {
            return Ok(peers);
        }

        tracing::debug!(infohash = %infohash, "running dht peer lookup");
        let outcome = tokio::time::timeout(watchdog, dht.get_peers(infohash)).await;
        let peers = match outcome {
            Ok(Ok(peers)) => peers,
            Ok(Err(err)) => return Err(LookupError::Dht(err)),
            Err(_) => return Err(LookupError::TimedOut),
        };

        *self.result.write().await = Some((peers.clone(), Instant::now()));
        Ok(peers)
    }
}

impl Default for LookupCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingDht {
        calls: AtomicUsize,
        peers: HashSet<UdpEndpoint>,
    }

    impl DhtClient for CountingDht {
        async fn announce(&self, _infohash: InfoHash) -> Result<(), ouinet_dht::DhtError> {
            Ok(())
        }

        async fn get_peers(&self, _infohash: InfoHash) -> Result<HashSet<UdpEndpoint>, ouinet_dht::DhtError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.peers.clone())
        }

        fn local_endpoints(&self) -> HashSet<UdpEndpoint> {
            HashSet::new()
        }

        fn wan_endpoints(&self) -> HashSet<UdpEndpoint> {
            HashSet::new()
        }
    }

    fn infohash() -> InfoHash {
        ouinet_core::swarm::SwarmName::from_raw("ed25519:abc/v6/uri/example.com").info_hash()
    }

    #[tokio::test]
    async fn caches_a_fresh_result() {
        let dht = CountingDht {
            calls: AtomicUsize::new(0),
            peers: HashSet::from(["127.0.0.1:6881".parse().unwrap()]),
        };
        let cell = LookupCell::new();

        let first = cell
            .get(&dht, infohash(), Duration::from_secs(300), Duration::from_secs(1))
            .await
            .unwrap();
        let second = cell
            .get(&dht, infohash(), Duration::from_secs(300), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(dht.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_single_flight_into_one_query() {
        let dht = Arc::new(CountingDht {
            calls: AtomicUsize::new(0),
            peers: HashSet::from(["127.0.0.1:6881".parse().unwrap()]),
        });
        let cell = Arc::new(LookupCell::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let dht = Arc::clone(&dht);
            let cell = Arc::clone(&cell);
            handles.push(tokio::spawn(async move {
                cell.get(&*dht, infohash(), Duration::from_secs(300), Duration::from_secs(1))
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(dht.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_result_triggers_a_fresh_query() {
        let dht = CountingDht {
            calls: AtomicUsize::new(0),
            peers: HashSet::new(),
        };
        let cell = LookupCell::new();

        cell.get(&dht, infohash(), Duration::from_millis(1), Duration::from_secs(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cell.get(&dht, infohash(), Duration::from_millis(1), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(dht.calls.load(Ordering::SeqCst), 2);
    }
}
