use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("store error: {0}")]
    Store(#[from] ouinet_store::StoreError),
    #[error("groups error: {0}")]
    Groups(#[from] ouinet_groups::GroupsError),
    #[error("signed stream error: {0}")]
    Sign(#[from] ouinet_sign::SignError),
    #[error("lookup error: {0}")]
    Lookup(#[from] ouinet_lookup::LookupError),
    #[error("peer error: {0}")]
    Peer(#[from] ouinet_peer::PeerError),
    #[error("no good peer for this resource's swarm")]
    NoGoodPeer,
    #[error("request carries no X-Ouinet-Version or an unsupported one")]
    UnsupportedVersion,
    #[error("resource not found")]
    NotFound,
    #[error("range starts beyond the resource's size")]
    InvalidSeek,
    #[error("operation aborted")]
    OperationAborted,
}
