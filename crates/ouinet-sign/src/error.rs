use ouinet_crypto::http_sig::HttpSigError;
use thiserror::Error;

/// Failure modes of the signed-response codec, matching the verification
/// and protocol error kinds a caller must be able to distinguish.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignError {
    #[error("malformed head, chunk header, or trailer")]
    BadMessage,
    #[error("missing head")]
    NoMessage,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("chained hash verification failed")]
    InconsistentHash,
    #[error("expected a response head")]
    ExpectedHead,
    #[error("expected the first chunk header")]
    ExpectedFirstChunkHdr,
    #[error("expected a chunk body")]
    ExpectedChunkBody,
    #[error("data block exceeds the signed block size")]
    BlockIsTooBig,
    #[error("expected a chunk header")]
    ExpectedChunkHdr,
    #[error("expected a trailer or end of response")]
    ExpectedTrailerOrEndOfResponse,
    #[error("trailer received twice")]
    TrailerReceivedTwice,
    #[error("expected no more data")]
    ExpectedNoMoreData,
    #[error("no signature verified against the configured key")]
    NoValidSignature,
    #[error("body length does not match X-Ouinet-Data-Size")]
    DataSizeMismatch,
    #[error("body digest does not match the Digest trailer")]
    DigestMismatch,
    #[error(transparent)]
    HttpSig(#[from] HttpSigError),
}
