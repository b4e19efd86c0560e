use std::fmt;

use sha1::{Digest, Sha1};

use crate::error::CoreError;
use crate::resource_id::Digest20;

/// Current on-disk/wire protocol version (`X-Ouinet-Version`).
pub const PROTOCOL_VERSION: u32 = 6;

/// Name of a resource group, typically a host name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupName(String);

impl GroupName {
    /// Maximum on-disk size of a group name, mirroring the historical
    /// implementation's `MAX_URL_SIZE` constant.
    pub const MAX_LEN: usize = 2000;

    /// Builds a group name, rejecting empty or oversized input.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::InvalidInput("group name must not be empty"));
        }
        if name.len() > Self::MAX_LEN {
            return Err(CoreError::InvalidInput("group name too long"));
        }
        Ok(GroupName(name))
    }

    /// Borrows the group name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives the swarm name this group is announced under for a given
    /// injector public key.
    pub fn swarm_name(&self, injector_pubkey_hex: &str) -> SwarmName {
        SwarmName(format!(
            "ed25519:{}/v{}/uri/{}",
            injector_pubkey_hex, PROTOCOL_VERSION, self.0
        ))
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fully-qualified DHT swarm name: `ed25519:<hex-pubkey>/v<N>/uri/<group>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SwarmName(String);

impl SwarmName {
    /// Wraps an already-formatted swarm name string as-is.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        SwarmName(raw.into())
    }

    /// Borrows the swarm name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives the BEP5 infohash this swarm is announced/looked-up under.
    pub fn info_hash(&self) -> InfoHash {
        let mut hasher = Sha1::new();
        hasher.update(self.0.as_bytes());
        InfoHash(hasher.finalize().into())
    }
}

impl fmt::Display for SwarmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-1 of a [`SwarmName`]; the DHT key peers announce themselves under.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoHash(Digest20);

impl InfoHash {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &Digest20 {
        &self.0
    }

    /// Lowercase 40-character hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", self.to_hex())
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
