use ouinet_dht::UdpEndpoint;
use ouinet_sign::{Part, ResponseHead};

use crate::error::PeerError;

/// Pluggable wire-protocol transport to a single peer. Implementations own
/// the actual connection (QUIC, TCP, whatever the transport layer picks);
/// this trait only describes the two requests a [`crate::peer::Peer`] ever
/// makes of one.
pub trait PeerConnector: Send {
    /// Issues the equivalent of a `PROPFIND`: the signed head plus the raw
    /// hash-list body (`ouinet_store::reader::read_hash_list`'s shape).
    fn fetch_hash_list(
        &mut self,
    ) -> impl std::future::Future<Output = Result<(ResponseHead, Vec<u8>), PeerError>> + Send;

    /// Issues a ranged `GET` covering byte offsets `[first, last]`,
    /// returning the signed chunked stream exactly as
    /// `ouinet_store::reader::read_range` would produce it.
    fn fetch_range(
        &mut self,
        first: u64,
        last: u64,
    ) -> impl std::future::Future<Output = Result<Vec<Part>, PeerError>> + Send;
}

/// Dials a fresh [`PeerConnector`] to a discovered endpoint. Kept separate
/// from `PeerConnector` itself so a [`crate::reader::MultiPeerReader`] can
/// hold one long-lived factory (the actual transport/socket layer) while
/// opening and discarding many short-lived per-endpoint connectors.
pub trait PeerConnectorFactory: Send + Sync {
    type Connector: PeerConnector;

    fn connect(
        &self,
        endpoint: UdpEndpoint,
    ) -> impl std::future::Future<Output = Result<Self::Connector, PeerError>> + Send;
}
