use ouinet_sign::ResponseHead;

/// Where a [`Session`]'s bytes were ultimately served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Already-verified, on-disk entry.
    LocalCache,
    /// Assembled and re-verified from one or more swarm peers.
    DistCache,
}

/// The result of [`crate::client::CacheClient::load`]: a verified head and
/// fully-assembled body, tagged with where it came from.
#[derive(Debug, Clone)]
pub struct Session {
    pub source: ResponseSource,
    pub head: ResponseHead,
    pub body: Vec<u8>,
}
