use thiserror::Error;

/// Failure modes of the HTTP store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("entry is missing its head file")]
    MissingHead,
    #[error("signature chain is shorter than the body")]
    ShortSigChain,
    #[error("malformed sig record")]
    MalformedSigRecord,
    #[error("body-path escapes the content root")]
    BodyPathEscapesRoot,
    #[error("entry name is not a valid resource id shard")]
    InvalidShardName,
    #[error("range starts beyond the body's size")]
    InvalidSeek,
    #[error(transparent)]
    Sign(#[from] ouinet_sign::SignError),
}
