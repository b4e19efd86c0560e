use std::time::Duration;

/// Tuning for background re-announcement of resource-group swarms.
#[derive(Debug, Clone, Copy)]
pub struct AnnouncerConfig {
    /// Target re-announce period for a freshly-announced swarm.
    pub period: Duration,
    /// Upper bound on announcements in flight at once.
    pub max_simultaneous_announcements: usize,
    /// Backoff applied after the first failed announce.
    pub min_backoff: Duration,
    /// Backoff ceiling for repeatedly failing announces.
    pub max_backoff: Duration,
    /// Per-announce watchdog; an announce that doesn't resolve within this
    /// is treated as failed and retried with backoff.
    pub watchdog: Duration,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(20 * 60),
            max_simultaneous_announcements: 4,
            min_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(5 * 60),
            watchdog: Duration::from_secs(30),
        }
    }
}
