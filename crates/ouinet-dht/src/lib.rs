use std::collections::HashSet;
use std::net::SocketAddr;

use ouinet_core::swarm::InfoHash;
use thiserror::Error;

/// A UDP endpoint as seen on the wire (BEP5 peers are UDP-addressable).
pub type UdpEndpoint = SocketAddr;

/// Failure modes surfaced by a [`DhtClient`] implementation.
#[derive(Debug, Error)]
pub enum DhtError {
    #[error("dht operation timed out")]
    TimedOut,
    #[error("dht operation aborted")]
    OperationAborted,
    #[error("dht transport error: {0}")]
    Transport(String),
}

/// The DHT operations the cache core consumes (announce/lookup plus this
/// node's own endpoints for martian-address filtering). The BEP5 wire
/// transport implementing this trait lives outside this crate.
pub trait DhtClient: Send + Sync {
    /// Announces this node as a peer for `infohash`.
    fn announce(&self, infohash: InfoHash) -> impl std::future::Future<Output = Result<(), DhtError>> + Send;

    /// Looks up peers currently announced for `infohash`.
    fn get_peers(
        &self,
        infohash: InfoHash,
    ) -> impl std::future::Future<Output = Result<HashSet<UdpEndpoint>, DhtError>> + Send;

    /// This node's own LAN-reachable endpoints.
    fn local_endpoints(&self) -> HashSet<UdpEndpoint>;

    /// This node's own WAN-reachable endpoints, used to filter out
    /// self-connections when building a peer set.
    fn wan_endpoints(&self) -> HashSet<UdpEndpoint>;
}
