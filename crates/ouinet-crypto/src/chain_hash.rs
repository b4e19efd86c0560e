use sha2::{Digest as _, Sha512};

use crate::signing::{Signer, Verifier};

/// A SHA-512 digest, used for both data hashes (`DHASH`) and chained
/// hashes (`CHASH`).
pub type Sha512Digest = [u8; 64];

/// One block's position and chained commitment, signable/verifiable in
/// isolation given the injection id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHash {
    /// Byte offset of the block this digest commits to.
    pub offset: u64,
    /// `CHASH[i]`: the chained digest up to and including this block.
    pub digest: Sha512Digest,
}

impl ChainHash {
    /// Verifies `signature` over `(injection_id, offset, digest)` using
    /// `verifier` and the injector's public key.
    pub fn verify(
        &self,
        verifier: &impl Verifier,
        pubkey: [u8; 32],
        injection_id: &str,
        signature: [u8; 64],
    ) -> bool {
        verifier
            .verify(pubkey, &self.str_to_sign(injection_id), signature)
            .unwrap_or(false)
    }

    /// Signs `(injection_id, offset, digest)` with `signer`.
    pub fn sign(&self, signer: &impl Signer, injection_id: &str) -> [u8; 64] {
        signer.sign(&self.str_to_sign(injection_id))
    }

    fn str_to_sign(&self, injection_id: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(injection_id.len() + 1 + 20 + 1 + 64);
        buf.extend_from_slice(injection_id.as_bytes());
        buf.push(0);
        buf.extend_from_slice(self.offset.to_string().as_bytes());
        buf.push(0);
        buf.extend_from_slice(&self.digest);
        buf
    }
}

/// Running state that turns a sequence of per-block data digests into a
/// chain of [`ChainHash`] commitments: `CHASH[0] = SHA-512(DHASH[0])`,
/// `CHASH[i] = SHA-512(CHASH[i-1] ‖ DHASH[i])`.
#[derive(Debug, Default, Clone)]
pub struct ChainHasher {
    offset: u64,
    prev_chained_digest: Option<Sha512Digest>,
}

impl ChainHasher {
    /// Creates a hasher starting at offset 0 with no prior chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds in the next block (`data_size` bytes, whose SHA-512 is
    /// `data_digest`) and returns its [`ChainHash`]. Advances internal
    /// state so the next call continues the chain.
    pub fn calculate_block(&mut self, data_size: u64, data_digest: Sha512Digest) -> ChainHash {
        let mut hasher = Sha512::new();
        if let Some(prev) = self.prev_chained_digest {
            hasher.update(prev);
        }
        hasher.update(data_digest);
        let chained_digest: Sha512Digest = hasher.finalize().into();

        let old_offset = self.offset;
        self.offset += data_size;
        self.prev_chained_digest = Some(chained_digest);

        ChainHash {
            offset: old_offset,
            digest: chained_digest,
        }
    }

    /// Seeds the chain at a non-zero starting point, used when a reader
    /// resumes verification partway through a stored response (e.g. a
    /// range read whose first `ouihash` extension supplies `CHASH[i-1]`).
    pub fn set_prev_chained_digest(&mut self, prev: Sha512Digest) {
        self.prev_chained_digest = Some(prev);
    }

    /// Sets the byte offset of the next block to be folded in.
    pub fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    /// The most recently computed chained digest, if any.
    pub fn prev_chained_digest(&self) -> Option<Sha512Digest> {
        self.prev_chained_digest
    }
}

/// Computes `DHASH[i] = SHA-512(data)`.
pub fn data_hash(data: &[u8]) -> Sha512Digest {
    let mut hasher = Sha512::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{Ed25519Signer, Ed25519Verifier};

    #[test]
    fn chain_hash_follows_the_recurrence() {
        let dhash0 = data_hash(b"hello");
        let dhash1 = data_hash(b"world");

        let mut hasher = ChainHasher::new();
        let ch0 = hasher.calculate_block(5, dhash0);
        let ch1 = hasher.calculate_block(5, dhash1);

        assert_eq!(ch0.offset, 0);
        assert_eq!(ch1.offset, 5);

        let mut expect0 = Sha512::new();
        expect0.update(dhash0);
        let expect0: Sha512Digest = expect0.finalize().into();
        assert_eq!(ch0.digest, expect0);

        let mut expect1 = Sha512::new();
        expect1.update(ch0.digest);
        expect1.update(dhash1);
        let expect1: Sha512Digest = expect1.finalize().into();
        assert_eq!(ch1.digest, expect1);
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let signer = Ed25519Signer::from_seed([0x01; 32]);
        let verifier = Ed25519Verifier;
        let mut hasher = ChainHasher::new();
        let ch = hasher.calculate_block(8, data_hash(b"abcdefgh"));

        let sig = ch.sign(&signer, "injection-id");
        assert!(ch.verify(&verifier, signer.public_key(), "injection-id", sig));
        assert!(!ch.verify(&verifier, signer.public_key(), "other-id", sig));
    }

    #[test]
    fn resuming_a_chain_matches_continuous_computation() {
        let dhash0 = data_hash(b"hello");
        let dhash1 = data_hash(b"world");

        let mut continuous = ChainHasher::new();
        let ch0 = continuous.calculate_block(5, dhash0);
        let ch1 = continuous.calculate_block(5, dhash1);

        let mut resumed = ChainHasher::new();
        resumed.set_offset(ch0.offset + 5);
        resumed.set_prev_chained_digest(ch0.digest);
        let ch1_resumed = resumed.calculate_block(5, dhash1);

        assert_eq!(ch1, ch1_resumed);
    }
}
