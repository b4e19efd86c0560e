use std::path::PathBuf;
use std::time::Duration;

use ouinet_announcer::AnnouncerConfig;
use ouinet_lookup::LookupConfig;
use ouinet_peer::ReaderConfig;

/// Explicit, cloneable configuration for a [`crate::client::CacheClient`].
/// No hidden globals: every timing constant below has the default this
/// specification documents, and every nested component's config is
/// constructed here rather than reached for implicitly.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root directory the on-disk store, and the trusted groups tree, live
    /// under.
    pub data_root: PathBuf,
    /// Read-only groups tree shipped by a static content bundle, unioned
    /// with the trusted tree. `None` if there is no such bundle.
    pub static_groups_root: Option<PathBuf>,
    /// The injector's Ed25519 public key, used both to verify fetched
    /// responses and to derive swarm names.
    pub injector_pubkey: [u8; 32],
    pub injector_pubkey_hex: String,
    /// Maximum age (since injection) a cached entry is kept for.
    pub max_cached_age: Duration,
    /// Interval between garbage-collection sweeps.
    pub gc_period: Duration,
    pub announcer: AnnouncerConfig,
    pub lookup: LookupConfig,
    pub reader: ReaderConfig,
}

impl CacheConfig {
    pub fn new(data_root: impl Into<PathBuf>, injector_pubkey: [u8; 32]) -> Self {
        CacheConfig {
            data_root: data_root.into(),
            static_groups_root: None,
            injector_pubkey,
            injector_pubkey_hex: hex::encode(injector_pubkey),
            max_cached_age: Duration::from_secs(7 * 24 * 60 * 60),
            gc_period: Duration::from_secs(7 * 60),
            announcer: AnnouncerConfig::default(),
            lookup: LookupConfig::default(),
            reader: ReaderConfig::default(),
        }
    }
}
