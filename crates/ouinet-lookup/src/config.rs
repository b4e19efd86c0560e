use std::time::Duration;

/// Tuning for the DHT lookup cache.
#[derive(Debug, Clone, Copy)]
pub struct LookupConfig {
    /// A cached result younger than this is returned without a fresh query.
    pub freshness: Duration,
    /// Per-lookup watchdog; longer in release builds to tolerate slower
    /// production DHT round trips.
    pub watchdog: Duration,
    /// Maximum number of distinct swarms tracked at once.
    pub capacity: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            freshness: Duration::from_secs(5 * 60),
            watchdog: if cfg!(debug_assertions) {
                Duration::from_secs(60)
            } else {
                Duration::from_secs(3 * 60)
            },
            capacity: 256,
        }
    }
}
