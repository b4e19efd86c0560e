use std::fmt;

use sha1::{Digest, Sha1};

use crate::error::CoreError;

/// Raw 20-byte SHA-1 digest backing a [`ResourceId`].
pub type Digest20 = [u8; 20];

/// Content address of a cached HTTP resource: SHA-1 of its canonical URL.
///
/// Hex-encodes to 40 lowercase characters and shards on disk as
/// `DIGEST[:2]/DIGEST[2:]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(Digest20);

impl ResourceId {
    /// Derives a resource id from an already-canonicalized URL.
    pub fn from_canonical_uri(uri: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(uri.as_bytes());
        let digest: Digest20 = hasher.finalize().into();
        ResourceId(digest)
    }

    /// Normalizes `uri` (trims surrounding whitespace, lower-cases the
    /// scheme and host) and derives its resource id.
    pub fn from_uri(uri: &str) -> Result<Self, CoreError> {
        let canonical = canonicalize_uri(uri)?;
        Ok(Self::from_canonical_uri(&canonical))
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &Digest20 {
        &self.0
    }

    /// Lowercase 40-character hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 40-character lowercase (or mixed-case) hex digest.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        if s.len() != 40 {
            return Err(CoreError::MalformedDigest("resource id must be 40 hex chars"));
        }
        let mut buf = [0u8; 20];
        hex::decode_to_slice(s, &mut buf)
            .map_err(|_| CoreError::MalformedDigest("resource id is not valid hex"))?;
        Ok(ResourceId(buf))
    }

    /// Splits the hex digest into the on-disk shard components
    /// `(first two chars, remaining 38 chars)`.
    pub fn shard_path(&self) -> (String, String) {
        let hex = self.to_hex();
        (hex[..2].to_string(), hex[2..].to_string())
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.to_hex())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Minimal canonicalization: trims whitespace and lower-cases the scheme
/// and authority (host[:port]) while leaving path/query untouched, mirroring
/// how an HTTP client would normalize a request target before hashing it.
pub fn canonicalize_uri(uri: &str) -> Result<String, CoreError> {
    let trimmed = uri.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidInput("empty uri"));
    }
    let scheme_end = trimmed
        .find("://")
        .ok_or(CoreError::InvalidInput("uri is missing a scheme"))?;
    let (scheme, rest) = trimmed.split_at(scheme_end);
    let rest = &rest[3..];
    let (authority, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    if authority.is_empty() {
        return Err(CoreError::InvalidInput("uri is missing an authority"));
    }
    Ok(format!(
        "{}://{}{}",
        scheme.to_ascii_lowercase(),
        authority.to_ascii_lowercase(),
        path
    ))
}
