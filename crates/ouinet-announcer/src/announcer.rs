use std::sync::Arc;
use std::time::Instant;

use ouinet_core::swarm::SwarmName;
use ouinet_dht::DhtClient;
use tokio::sync::{Mutex, Notify, Semaphore};

use crate::announce_set::AnnounceSet;
use crate::config::AnnouncerConfig;

/// Background re-announcer: keeps a foreground set of swarms alive on the
/// DHT, re-announcing each at `config.period`, retrying failures with
/// exponential backoff, and bounding in-flight announcements with a
/// semaphore.
pub struct Announcer<D: DhtClient> {
    dht: Arc<D>,
    state: Mutex<AnnounceSet>,
    notify: Notify,
    semaphore: Semaphore,
    config: AnnouncerConfig,
}

impl<D: DhtClient + Send + Sync + 'static> Announcer<D> {
    pub fn new(dht: Arc<D>, config: AnnouncerConfig) -> Arc<Self> {
        let semaphore = Semaphore::new(config.max_simultaneous_announcements);
        Arc::new(Announcer {
            dht,
            state: Mutex::new(AnnounceSet::new(config)),
            notify: Notify::new(),
            semaphore,
            config,
        })
    }

    /// Adds `swarm` to the foreground set, waking the worker if it's idle.
    pub async fn add(&self, swarm: SwarmName) {
        let mut state = self.state.lock().await;
        state.add(swarm, Instant::now());
        drop(state);
        self.notify.notify_one();
    }

    pub async fn remove(&self, swarm: &SwarmName) {
        self.state.lock().await.remove(swarm);
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    /// Drives the re-announce loop until cancelled. Intended to be spawned
    /// as a long-lived background task: `tokio::spawn(announcer.clone().run())`.
    pub async fn run(self: Arc<Self>) {
        loop {
            let due = {
                let state = self.state.lock().await;
                state.due(Instant::now())
            };

            if due.is_empty() {
                self.sleep_until_next_wakeup().await;
                continue;
            }

            for swarm in due {
                let permit = match self.semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                let this = Arc::clone(&self);
                tokio::spawn(async move {
                    this.announce_one(swarm).await;
                    drop(permit);
                });
            }
        }
    }

    async fn sleep_until_next_wakeup(&self) {
        let wake_at = self.state.lock().await.next_wakeup();
        match wake_at {
            Some(at) => {
                let delay = at.saturating_duration_since(Instant::now());
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.notify.notified() => {}
                }
            }
            None => self.notify.notified().await,
        }
    }

    async fn announce_one(&self, swarm: SwarmName) {
        let infohash = swarm.info_hash();
        let outcome = tokio::time::timeout(self.config.watchdog, self.dht.announce(infohash)).await;
        let now = Instant::now();
        let mut state = self.state.lock().await;
        match outcome {
            Ok(Ok(())) => {
                tracing::debug!(swarm = %swarm, "announced");
                state.record_success(&swarm, now);
            }
            Ok(Err(err)) => {
                tracing::warn!(swarm = %swarm, error = %err, "announce failed");
                state.record_failure(&swarm, now);
            }
            Err(_) => {
                tracing::warn!(swarm = %swarm, "announce watchdog expired");
                state.record_failure(&swarm, now);
            }
        }
    }
}
