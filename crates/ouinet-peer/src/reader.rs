use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ouinet_dht::UdpEndpoint;
use tracing::warn;

use crate::connector::PeerConnectorFactory;
use crate::error::PeerError;
use crate::hash_list::HashList;
use crate::peer::Peer;
use crate::peers_set::PeersSet;

#[derive(Debug, Clone, Copy)]
pub struct ReaderConfig {
    pub init_watchdog: Duration,
    pub block_watchdog: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            init_watchdog: Duration::from_secs(10),
            block_watchdog: Duration::from_secs(30),
        }
    }
}

/// Assembles a response from blocks pulled across multiple candidate peers,
/// failing over between them on error and re-verifying every block against
/// the first peer's hash list — the "reference" a malicious later peer can
/// never substitute its own for.
pub struct MultiPeerReader<F: PeerConnectorFactory> {
    factory: Arc<F>,
    config: ReaderConfig,
    peers: PeersSet,
    reference: Option<Arc<HashList>>,
    current: Option<(UdpEndpoint, Peer<F::Connector>)>,
}

impl<F: PeerConnectorFactory> MultiPeerReader<F> {
    pub fn new(
        factory: Arc<F>,
        discovered: impl IntoIterator<Item = UdpEndpoint>,
        self_endpoints: &HashSet<UdpEndpoint>,
        config: ReaderConfig,
    ) -> Self {
        MultiPeerReader {
            factory,
            config,
            peers: PeersSet::new(discovered, self_endpoints),
            reference: None,
            current: None,
        }
    }

    /// The reference hash list the first accepted peer returned, once one
    /// has been established.
    pub fn reference(&self) -> Option<&HashList> {
        self.reference.as_deref()
    }

    /// The head of the most recently fetched block from the currently
    /// active peer, if any.
    pub fn current_head(&self) -> Option<ouinet_sign::ResponseHead> {
        self.current.as_ref().and_then(|(_, peer)| peer.last_head().cloned())
    }

    /// Ensures a peer with an authoritative hash list is active, dialing
    /// and initializing candidates in turn until one succeeds.
    pub async fn ensure_peer(&mut self, pubkey: [u8; 32]) -> Result<(), PeerError> {
        if self.current.is_some() {
            return Ok(());
        }
        while let Some(endpoint) = self.peers.next_candidate() {
            match self.try_init(endpoint, pubkey).await {
                Ok(peer) => {
                    if self.reference.is_none() {
                        self.reference = peer.hash_list().cloned().map(Arc::new);
                    }
                    self.peers.mark_good(endpoint);
                    self.current = Some((endpoint, peer));
                    return Ok(());
                }
                Err(err) => {
                    warn!(%endpoint, error = %err, "peer init failed, trying next candidate");
                    self.peers.mark_failed(endpoint);
                }
            }
        }
        Err(PeerError::NoGoodPeer)
    }

    async fn try_init(&self, endpoint: UdpEndpoint, pubkey: [u8; 32]) -> Result<Peer<F::Connector>, PeerError> {
        let connector = self.factory.connect(endpoint).await?;
        let mut peer = Peer::new(connector, pubkey);
        peer.init(self.config.init_watchdog).await?;
        Ok(peer)
    }

    /// Fetches and verifies `block_id`, failing over to another good
    /// candidate peer on any error and re-verifying against the reference
    /// hash list established by [`Self::ensure_peer`].
    pub async fn read_block(&mut self, block_id: usize, pubkey: [u8; 32]) -> Result<Vec<u8>, PeerError> {
        self.ensure_peer(pubkey).await?;

        loop {
            let reference = Arc::clone(self.reference.as_ref().expect("ensure_peer sets it"));
            let endpoint = self.current.as_ref().expect("ensure_peer sets it").0;
            let result = {
                let peer = &mut self.current.as_mut().expect("ensure_peer sets it").1;
                peer.read_block(block_id, self.config.block_watchdog, &reference).await
            };
            match result {
                Ok(bytes) => return Ok(bytes),
                Err(err) => {
                    warn!(%endpoint, block_id, error = %err, "block fetch failed, failing over");
                    self.peers.mark_failed(endpoint);
                    self.current = None;
                    self.ensure_peer(pubkey).await?;
                }
            }
        }
    }
}
