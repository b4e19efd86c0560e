use std::collections::HashMap;
use std::time::Instant;

use ouinet_core::swarm::SwarmName;

use crate::config::AnnouncerConfig;

struct SwarmState {
    next_attempt: Instant,
    backoff: std::time::Duration,
}

/// Deterministic scheduling core for the announcer: which swarms are due,
/// and how backoff evolves on success/failure. Kept free of any I/O or
/// async runtime so it can be driven synchronously in tests; [`crate::Announcer`]
/// wraps this with the actual DHT calls and timers.
pub struct AnnounceSet {
    entries: HashMap<SwarmName, SwarmState>,
    config: AnnouncerConfig,
}

impl AnnounceSet {
    pub fn new(config: AnnouncerConfig) -> Self {
        AnnounceSet {
            entries: HashMap::new(),
            config,
        }
    }

    /// Marks `swarm` for immediate announcement, unless already tracked.
    pub fn add(&mut self, swarm: SwarmName, now: Instant) {
        self.entries.entry(swarm).or_insert(SwarmState {
            next_attempt: now,
            backoff: self.config.min_backoff,
        });
    }

    pub fn remove(&mut self, swarm: &SwarmName) {
        self.entries.remove(swarm);
    }

    pub fn contains(&self, swarm: &SwarmName) -> bool {
        self.entries.contains_key(swarm)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Swarms whose `next_attempt` has arrived, earliest first.
    pub fn due(&self, now: Instant) -> Vec<SwarmName> {
        let mut due: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, state)| state.next_attempt <= now)
            .map(|(swarm, state)| (swarm.clone(), state.next_attempt))
            .collect();
        due.sort_by_key(|(_, next_attempt)| *next_attempt);
        due.into_iter().map(|(swarm, _)| swarm).collect()
    }

    /// The earliest `next_attempt` across all tracked swarms, for scheduling
    /// the worker's sleep. `None` if nothing is tracked.
    pub fn next_wakeup(&self) -> Option<Instant> {
        self.entries.values().map(|s| s.next_attempt).min()
    }

    pub fn record_success(&mut self, swarm: &SwarmName, now: Instant) {
        if let Some(state) = self.entries.get_mut(swarm) {
            state.next_attempt = now + self.config.period;
            state.backoff = self.config.min_backoff;
        }
    }

    pub fn record_failure(&mut self, swarm: &SwarmName, now: Instant) {
        if let Some(state) = self.entries.get_mut(swarm) {
            state.backoff = (state.backoff * 2).min(self.config.max_backoff);
            state.next_attempt = now + state.backoff;
        }
    }
}
