use std::time::Duration;

use ouinet_core::swarm::PROTOCOL_VERSION;
use ouinet_crypto::chain_hash::data_hash;
use ouinet_sign::{Part, SignError, Verifier};

use crate::connector::PeerConnector;
use crate::error::PeerError;
use crate::hash_list::{self, HashList};

/// A single peer connection, scoped to one resource: initialized with its
/// hash list, then read block by block. Re-verification of fetched bytes
/// against a caller-supplied reference hash list (rather than `self`'s own,
/// which may belong to a different peer entirely on failover) is the
/// caller's job via [`Self::read_block`]'s `reference` parameter.
pub struct Peer<C: PeerConnector> {
    connector: C,
    pubkey: [u8; 32],
    hash_list: Option<HashList>,
    block_size: Option<u64>,
    last_head: Option<ouinet_sign::ResponseHead>,
}

impl<C: PeerConnector> Peer<C> {
    pub fn new(connector: C, pubkey: [u8; 32]) -> Self {
        Peer {
            connector,
            pubkey,
            hash_list: None,
            block_size: None,
            last_head: None,
        }
    }

    pub fn hash_list(&self) -> Option<&HashList> {
        self.hash_list.as_ref()
    }

    pub fn block_size(&self) -> Option<u64> {
        self.block_size
    }

    /// The head of the most recently fetched block, rewritten by the peer
    /// as a range response (`206` plus `Content-Range`/`X-Ouinet-HTTP-Status`).
    pub fn last_head(&self) -> Option<&ouinet_sign::ResponseHead> {
        self.last_head.as_ref()
    }

    /// Fetches and validates this peer's hash list, the prerequisite for
    /// any [`Self::read_block`] call.
    pub async fn init(&mut self, watchdog: Duration) -> Result<(), PeerError> {
        let (head, body) = tokio::time::timeout(watchdog, self.connector.fetch_hash_list())
            .await
            .map_err(|_| PeerError::InitTimedOut)??;

        let version: u32 = head
            .get("X-Ouinet-Version")
            .and_then(|s| s.parse().ok())
            .ok_or(PeerError::UnacceptedProtocolVersion)?;
        if version != PROTOCOL_VERSION {
            return Err(PeerError::UnacceptedProtocolVersion);
        }

        let block_size = hash_list::block_size(&head).ok_or(PeerError::MalformedHashList)?;
        let list = HashList::parse(&body)?;

        self.block_size = Some(block_size);
        self.hash_list = Some(list);
        Ok(())
    }

    /// Fetches block `block_id`, verifies the signed stream this peer
    /// returned, and independently checks the recovered bytes against
    /// `reference`'s `DHASH` for that block before returning them. The
    /// cross-check against `reference` (not `self.hash_list`) is what makes
    /// failover safe: an alternate peer can only ever supply bytes this
    /// download already agreed to trust.
    pub async fn read_block(
        &mut self,
        block_id: usize,
        watchdog: Duration,
        reference: &HashList,
    ) -> Result<Vec<u8>, PeerError> {
        let block_size = self.block_size.ok_or(PeerError::NotInitialized)?;
        if block_id >= reference.entries.len() {
            return Err(PeerError::BlockOutOfRange);
        }

        let first = block_id as u64 * block_size;
        let last = first + block_size - 1;
        let parts = tokio::time::timeout(watchdog, self.connector.fetch_range(first, last))
            .await
            .map_err(|_| PeerError::BlockTimedOut)??;

        let mut parts = parts.into_iter();
        let head = match parts.next() {
            Some(Part::Head(head)) => head,
            _ => return Err(PeerError::Sign(SignError::ExpectedHead)),
        };
        self.last_head = Some(head.clone());

        let body = if block_id == 0 {
            let mut verifier = Verifier::new(self.pubkey);
            verifier.feed(Part::Head(head))?;
            for part in parts {
                verifier.feed(part)?;
            }
            verifier.finish()?.1
        } else {
            let seed_chash = reference
                .chash_before(block_id)
                .expect("block_id != 0 has a predecessor");
            let mut verifier = Verifier::new_for_range(self.pubkey, head, first, seed_chash)?;
            for part in parts {
                verifier.feed(part)?;
            }
            verifier.finish()?.1
        };

        if data_hash(&body) != reference.entries[block_id].dhash {
            return Err(PeerError::HashMismatch);
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_list::HashListEntry;
    use ouinet_crypto::chain_hash::ChainHasher;
    use ouinet_crypto::signing::{Ed25519Signer, Signer as _};
    use ouinet_sign::sign::{sign_response, InjectionMeta};
    use ouinet_sign::ResponseHead;
    use std::collections::VecDeque;

    struct FakeConnector {
        hash_list_response: Option<(ResponseHead, Vec<u8>)>,
        ranges: VecDeque<Vec<Part>>,
    }

    impl PeerConnector for FakeConnector {
        async fn fetch_hash_list(&mut self) -> Result<(ResponseHead, Vec<u8>), PeerError> {
            self.hash_list_response
                .clone()
                .ok_or(PeerError::Transport("no hash list queued".to_string()))
        }

        async fn fetch_range(&mut self, _first: u64, _last: u64) -> Result<Vec<Part>, PeerError> {
            self.ranges
                .pop_front()
                .ok_or(PeerError::Transport("no range queued".to_string()))
        }
    }

    fn build_fixture(block_size: u64) -> ([u8; 32], HashList, Vec<Vec<Part>>, ResponseHead) {
        let signer = Ed25519Signer::from_seed([0x42; 32]);
        let injection = InjectionMeta {
            id: "11111111-2222-3333-4444-555555555555".to_string(),
            ts: 1700000000,
        };
        let head = ResponseHead::new(200, "OK");
        let whole = sign_response(
            head,
            b"Hello, World!",
            "http://example.com/a",
            &injection,
            block_size,
            &signer,
        )
        .unwrap();

        // Recompute per-block DHASH/sig entries the way the store would
        // serve them over PROPFIND: walk the chunk bodies and re-derive.
        let mut entries = Vec::new();
        let mut bodies = Vec::new();
        let mut cur_body = None;
        for part in &whole {
            match part {
                Part::ChunkBody(b) => cur_body = Some(b.clone()),
                Part::ChunkHeader { exts: Some(e), .. } => {
                    let body = cur_body.take().expect("body precedes its terminator header");
                    entries.push(HashListEntry {
                        dhash: data_hash(&body),
                        sig: e.sig,
                    });
                    bodies.push(body);
                }
                _ => {}
            }
        }
        let hash_list = HashList { entries: entries.clone() };

        let mut ranges = Vec::new();
        let head_for_wire = whole
            .iter()
            .find_map(|p| match p {
                Part::Head(h) => Some(h.clone()),
                _ => None,
            })
            .unwrap();
        // The trailer covers the whole resource (total size, full-body
        // digest, Sig1) and is reused verbatim across every range response,
        // exactly as the store's own `read_range` does.
        let orig_trailer = whole
            .iter()
            .find_map(|p| match p {
                Part::Trailer(kv) => Some(kv.clone()),
                _ => None,
            })
            .unwrap();

        let mut chain = ChainHasher::new();
        let mut offset = 0u64;
        for (i, body) in bodies.iter().enumerate() {
            let dhash = data_hash(body);
            let chash = chain.calculate_block(body.len() as u64, dhash);
            let mut range_head = head_for_wire.clone();
            range_head.status = 206;
            range_head.set("X-Ouinet-HTTP-Status", "200");
            range_head.set(
                "Content-Range",
                format!("bytes {offset}-{}/13", offset + body.len() as u64 - 1),
            );
            let exts = whole
                .iter()
                .find_map(|p| match p {
                    Part::ChunkHeader { exts: Some(e), .. } if e.chash == chash.digest => Some(*e),
                    _ => None,
                })
                .unwrap();
            let seed_ext = if i == 0 {
                None
            } else {
                let prev = &entries[i - 1];
                Some(ouinet_sign::ChunkExts {
                    sig: prev.sig,
                    chash: hash_list.chash_before(i).unwrap(),
                })
            };
            let parts = vec![
                Part::Head(range_head),
                Part::ChunkHeader {
                    size: body.len() as u64,
                    exts: seed_ext,
                },
                Part::ChunkBody(body.clone()),
                Part::ChunkHeader {
                    size: 0,
                    exts: Some(exts),
                },
                Part::Trailer(orig_trailer.clone()),
                Part::End,
            ];
            ranges.push(parts);
            offset += body.len() as u64;
        }

        let mut hash_list_head = ResponseHead::new(200, "OK");
        hash_list_head.set("X-Ouinet-Version", PROTOCOL_VERSION.to_string());
        hash_list_head.set("X-Ouinet-BSigs", format!("size={block_size}"));

        (signer.public_key(), hash_list, ranges, hash_list_head)
    }

    #[tokio::test]
    async fn init_then_read_block_zero_round_trips() {
        let (pubkey, hash_list, ranges, head) = build_fixture(8);
        let mut body = Vec::new();
        body.extend_from_slice(b"ouinet-hashlist-v1\n");
        for e in &hash_list.entries {
            body.extend_from_slice(&e.dhash);
            body.extend_from_slice(&e.sig);
        }

        let connector = FakeConnector {
            hash_list_response: Some((head, body)),
            ranges: ranges.into(),
        };
        let mut peer = Peer::new(connector, pubkey.try_into().unwrap());
        peer.init(Duration::from_secs(1)).await.unwrap();
        assert_eq!(peer.block_size(), Some(8));

        let block0 = peer
            .read_block(0, Duration::from_secs(1), &hash_list)
            .await
            .unwrap();
        assert_eq!(block0, b"Hello, W");
    }

    #[tokio::test]
    async fn read_block_rejects_content_not_matching_the_reference_hash_list() {
        let (pubkey, hash_list, ranges, head) = build_fixture(8);
        let mut body = Vec::new();
        body.extend_from_slice(b"ouinet-hashlist-v1\n");
        for e in &hash_list.entries {
            body.extend_from_slice(&e.dhash);
            body.extend_from_slice(&e.sig);
        }
        let connector = FakeConnector {
            hash_list_response: Some((head, body)),
            ranges: ranges.into(),
        };
        let mut peer = Peer::new(connector, pubkey.try_into().unwrap());
        peer.init(Duration::from_secs(1)).await.unwrap();

        let mut tampered_reference = hash_list.clone();
        tampered_reference.entries[0].dhash = [0xff; 64];

        let err = peer
            .read_block(0, Duration::from_secs(1), &tampered_reference)
            .await
            .unwrap_err();
        assert!(matches!(err, PeerError::HashMismatch));
    }
}
