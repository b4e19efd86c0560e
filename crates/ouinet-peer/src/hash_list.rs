use ouinet_crypto::chain_hash::{ChainHasher, Sha512Digest};
use ouinet_sign::ResponseHead;

use crate::error::PeerError;

/// One block's reference digest and signature, as carried in a `PROPFIND`
/// hash list response (`ouinet_store::reader::HASH_LIST_MAGIC` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashListEntry {
    pub dhash: [u8; 64],
    pub sig: [u8; 64],
}

/// Parsed `PROPFIND` hash list body: one `(dhash, sig)` pair per block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashList {
    pub entries: Vec<HashListEntry>,
}

const MAGIC: &str = "ouinet-hashlist-v1";
const ENTRY_LEN: usize = 64 + 64;

impl HashList {
    pub fn parse(body: &[u8]) -> Result<Self, PeerError> {
        let prefix = MAGIC.as_bytes();
        if body.len() < prefix.len() + 1 || &body[..prefix.len()] != prefix || body[prefix.len()] != b'\n' {
            return Err(PeerError::MalformedHashList);
        }
        let rest = &body[prefix.len() + 1..];
        if rest.len() % ENTRY_LEN != 0 {
            return Err(PeerError::MalformedHashList);
        }
        let entries = rest
            .chunks(ENTRY_LEN)
            .map(|chunk| HashListEntry {
                dhash: chunk[..64].try_into().unwrap(),
                sig: chunk[64..].try_into().unwrap(),
            })
            .collect();
        Ok(HashList { entries })
    }

    /// Folds `DHASH[0..block_id)` into `CHASH[block_id - 1]`, the seed a
    /// verifier resuming mid-stream at `block_id` needs. `None` for block 0,
    /// which has no predecessor to seed from.
    pub fn chash_before(&self, block_id: usize) -> Option<Sha512Digest> {
        if block_id == 0 {
            return None;
        }
        let mut chain = ChainHasher::new();
        let mut digest = None;
        for entry in &self.entries[..block_id] {
            digest = Some(chain.calculate_block(0, entry.dhash).digest);
        }
        digest
    }
}

/// Extracts the block size a peer's responses are chunked at from
/// `X-Ouinet-BSigs: ...;size=<n>;...`, mirroring the store's own parsing.
pub fn block_size(head: &ResponseHead) -> Option<u64> {
    head.get("X-Ouinet-BSigs")?
        .split(',')
        .find_map(|part| part.trim().strip_prefix("size="))
        .and_then(|s| s.parse().ok())
}
