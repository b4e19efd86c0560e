use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("signed stream error: {0}")]
    Sign(#[from] ouinet_sign::SignError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("init watchdog expired")]
    InitTimedOut,
    #[error("block watchdog expired")]
    BlockTimedOut,
    #[error("peer has not been initialized")]
    NotInitialized,
    #[error("unaccepted protocol version")]
    UnacceptedProtocolVersion,
    #[error("malformed hash list")]
    MalformedHashList,
    #[error("block id out of range")]
    BlockOutOfRange,
    #[error("fetched block does not match the reference hash list")]
    HashMismatch,
    #[error("no good peer available")]
    NoGoodPeer,
}
