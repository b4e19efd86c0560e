use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ouinet_crypto::chain_hash::{data_hash, ChainHasher, Sha512Digest};
use ouinet_crypto::http_sig::{build_signing_string, SignatureParams};
use ouinet_crypto::signing::{Ed25519Verifier, Verifier as _};
use sha2::{Digest as _, Sha256};

use crate::error::SignError;
use crate::head::ResponseHead;
use crate::part::{ChunkExts, Part};
use crate::sign::{MANDATORY_SIG0_HEADERS, MANDATORY_SIG1_HEADERS, MAX_BLOCK_SIZE};

#[derive(Debug)]
enum VState {
    AwaitHead,
    AwaitHeader,
    AwaitBody(u64),
    AwaitTrailer,
    AwaitEnd,
    Done,
}

/// Streaming verifier for a signed response: feed it [`Part`]s in emission
/// order; it surfaces a [`SignError`] as soon as anything fails to verify,
/// and yields the recovered head/body once `Part::End` is reached.
pub struct Verifier {
    pubkey: [u8; 32],
    is_range: bool,
    injection_id: Option<String>,
    block_size: Option<u64>,
    chain: ChainHasher,
    state: VState,
    pending: Option<Vec<u8>>,
    seen_first_header: bool,
    total_len: u64,
    running_digest: Sha256,
    head: Option<ResponseHead>,
    verified_body: Vec<u8>,
}

impl Verifier {
    /// Verifier for a whole (non-partial) response: the first chunk header
    /// must carry no extensions, since there is no previous block.
    pub fn new(pubkey: [u8; 32]) -> Self {
        Verifier {
            pubkey,
            is_range: false,
            injection_id: None,
            block_size: None,
            chain: ChainHasher::new(),
            state: VState::AwaitHead,
            pending: None,
            seen_first_header: false,
            total_len: 0,
            running_digest: Sha256::new(),
            head: None,
            verified_body: Vec::new(),
        }
    }

    /// Verifier resuming mid-stream (a range read). `head` is the already
    /// fetched and locally cached response head (its Sig0 is verified here
    /// just as in [`Self::new`]); `seed_offset`/`seed_chash` come from the
    /// sig record immediately preceding the requested range, and the first
    /// chunk header's `ouihash` extension must match the seed.
    pub fn new_for_range(
        pubkey: [u8; 32],
        head: ResponseHead,
        seed_offset: u64,
        seed_chash: Sha512Digest,
    ) -> Result<Self, SignError> {
        let mut v = Self::new(pubkey);
        v.is_range = true;
        v.on_head(head)?;
        v.chain.set_offset(seed_offset);
        v.chain.set_prev_chained_digest(seed_chash);
        Ok(v)
    }

    /// Feeds the next part of the stream.
    pub fn feed(&mut self, part: Part) -> Result<(), SignError> {
        match (&self.state, part) {
            (VState::AwaitHead, Part::Head(head)) => self.on_head(head),
            (VState::AwaitHead, _) => Err(SignError::ExpectedHead),

            (VState::AwaitHeader, Part::ChunkHeader { size, exts }) => self.on_header(size, exts),
            (VState::AwaitHeader, _) => Err(SignError::ExpectedChunkHdr),

            (VState::AwaitBody(size), Part::ChunkBody(bytes)) => self.on_body(size, bytes),
            (VState::AwaitBody(_), _) => Err(SignError::ExpectedChunkBody),

            (VState::AwaitTrailer, Part::Trailer(kv)) => self.on_trailer(kv),
            (VState::AwaitTrailer, _) => Err(SignError::ExpectedTrailerOrEndOfResponse),

            (VState::AwaitEnd, Part::End) => {
                self.state = VState::Done;
                Ok(())
            }
            (VState::AwaitEnd, _) => Err(SignError::ExpectedTrailerOrEndOfResponse),

            (VState::Done, _) => Err(SignError::ExpectedNoMoreData),
        }
    }

    /// Returns the verified head and body once [`Part::End`] has been fed.
    pub fn finish(self) -> Result<(ResponseHead, Vec<u8>), SignError> {
        match self.state {
            VState::Done => Ok((self.head.expect("head set before Done"), self.verified_body)),
            _ => Err(SignError::BadMessage),
        }
    }

    fn on_head(&mut self, head: ResponseHead) -> Result<(), SignError> {
        let bsigs = head.get("X-Ouinet-BSigs").ok_or(SignError::NoMessage)?;
        let bsigs_params = parse_params(bsigs)?;
        let size_str = bsigs_params
            .iter()
            .find(|(k, _)| *k == "size")
            .map(|(_, v)| v.as_str())
            .ok_or(SignError::BadMessage)?;
        let block_size: u64 = size_str.parse().map_err(|_| SignError::BadMessage)?;
        if block_size == 0 || block_size > MAX_BLOCK_SIZE {
            return Err(SignError::BlockIsTooBig);
        }
        let algorithm = bsigs_params
            .iter()
            .find(|(k, _)| *k == "algorithm")
            .map(|(_, v)| v.as_str());
        if algorithm != Some("hs2019") {
            return Err(SignError::BadMessage);
        }

        let injection = head.get("X-Ouinet-Injection").ok_or(SignError::NoMessage)?;
        let injection_id = parse_params(injection)?
            .into_iter()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v)
            .ok_or(SignError::BadMessage)?;

        let sig0 = head.get("X-Ouinet-Sig0").ok_or(SignError::NoMessage)?;
        let sig0_params = SignatureParams::parse(sig0)?;
        for mandatory in MANDATORY_SIG0_HEADERS {
            if !sig0_params.headers.iter().any(|h| h == mandatory) {
                return Err(SignError::BadMessage);
            }
        }
        let status = original_status(&head);
        let signing_string =
            build_signing_string(&sig0_params.headers, |name| resolve(&head, &[], status, name))?;
        let verifier = Ed25519Verifier;
        let ok = verifier
            .verify(self.pubkey, signing_string.as_bytes(), sig0_params.signature)
            .map_err(|_| SignError::NoValidSignature)?;
        if !ok {
            return Err(SignError::NoValidSignature);
        }

        self.block_size = Some(block_size);
        self.injection_id = Some(injection_id);
        self.head = Some(head);
        self.state = VState::AwaitHeader;
        Ok(())
    }

    fn on_header(&mut self, size: u64, exts: Option<ChunkExts>) -> Result<(), SignError> {
        if !self.seen_first_header {
            self.seen_first_header = true;
            if size == 0 {
                // Either the empty-body response (exts describes the sole,
                // zero-length block) or a malformed stream.
                let e = exts.ok_or(SignError::BadMessage)?;
                self.verify_block(Vec::new(), e)?;
                self.state = VState::AwaitTrailer;
                return Ok(());
            }
            if self.is_range {
                let e = exts.ok_or(SignError::ExpectedFirstChunkHdr)?;
                let seed = self
                    .chain
                    .prev_chained_digest()
                    .ok_or(SignError::ExpectedFirstChunkHdr)?;
                if e.chash != seed {
                    return Err(SignError::InconsistentHash);
                }
            } else if exts.is_some() {
                return Err(SignError::ExpectedFirstChunkHdr);
            }
            if size > self.block_size.ok_or(SignError::NoMessage)? {
                return Err(SignError::BlockIsTooBig);
            }
            self.state = VState::AwaitBody(size);
            return Ok(());
        }

        let pending = self.pending.take().ok_or(SignError::ExpectedChunkHdr)?;
        let e = exts.ok_or(SignError::BadMessage)?;
        self.verify_block(pending, e)?;

        if size == 0 {
            self.state = VState::AwaitTrailer;
        } else {
            if size > self.block_size.ok_or(SignError::NoMessage)? {
                return Err(SignError::BlockIsTooBig);
            }
            self.state = VState::AwaitBody(size);
        }
        Ok(())
    }

    fn on_body(&mut self, size: u64, bytes: Vec<u8>) -> Result<(), SignError> {
        if bytes.len() as u64 != size {
            return Err(SignError::BadMessage);
        }
        self.running_digest.update(&bytes);
        self.total_len += bytes.len() as u64;
        self.verified_body.extend_from_slice(&bytes);
        self.pending = Some(bytes);
        self.state = VState::AwaitHeader;
        Ok(())
    }

    fn on_trailer(&mut self, kv: Vec<(String, String)>) -> Result<(), SignError> {
        let find = |name: &str| -> Option<&str> {
            kv.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        };

        let data_size: u64 = find("X-Ouinet-Data-Size")
            .ok_or(SignError::BadMessage)?
            .parse()
            .map_err(|_| SignError::BadMessage)?;
        if data_size != self.total_len {
            return Err(SignError::DataSizeMismatch);
        }

        let digest_header = find("Digest").ok_or(SignError::BadMessage)?;
        let (algo, digest_b64) = digest_header.split_once('=').ok_or(SignError::BadMessage)?;
        if algo != "SHA-256" {
            return Err(SignError::BadMessage);
        }
        let expected = BASE64.encode(self.running_digest.clone().finalize());
        if expected != digest_b64 {
            return Err(SignError::DigestMismatch);
        }

        let sig1 = find("X-Ouinet-Sig1").ok_or(SignError::BadMessage)?;
        let sig1_params = SignatureParams::parse(sig1)?;
        for mandatory in MANDATORY_SIG0_HEADERS.iter().chain(MANDATORY_SIG1_HEADERS) {
            if !sig1_params.headers.iter().any(|h| h == mandatory) {
                return Err(SignError::BadMessage);
            }
        }
        let head = self.head.as_ref().expect("head set before trailer");
        let status = original_status(head);
        let signing_string =
            build_signing_string(&sig1_params.headers, |name| resolve(head, &kv, status, name))?;
        let verifier = Ed25519Verifier;
        let ok = verifier
            .verify(self.pubkey, signing_string.as_bytes(), sig1_params.signature)
            .map_err(|_| SignError::NoValidSignature)?;
        if !ok {
            return Err(SignError::NoValidSignature);
        }

        self.state = VState::AwaitEnd;
        Ok(())
    }

    fn verify_block(&mut self, bytes: Vec<u8>, exts: ChunkExts) -> Result<(), SignError> {
        let dhash = data_hash(&bytes);
        let chash = self.chain.calculate_block(bytes.len() as u64, dhash);
        if chash.digest != exts.chash {
            return Err(SignError::InconsistentHash);
        }
        let verifier = Ed25519Verifier;
        let injection_id = self.injection_id.as_ref().expect("set in on_head");
        if !chash.verify(&verifier, self.pubkey, injection_id, exts.sig) {
            return Err(SignError::NoValidSignature);
        }
        Ok(())
    }
}

/// Drives a [`Verifier`] over a complete, already-assembled part sequence.
pub fn verify_response(parts: Vec<Part>, pubkey: [u8; 32]) -> Result<(ResponseHead, Vec<u8>), SignError> {
    let mut verifier = Verifier::new(pubkey);
    for part in parts {
        verifier.feed(part)?;
    }
    verifier.finish()
}

/// The signature's `(response-status)` pseudo-header always covers the
/// status the head had at signing time. A range read rewrites the outer
/// status to `206` and stashes the original in `X-Ouinet-HTTP-Status`, so
/// verification must resolve against that rather than `head.status`.
fn original_status(head: &ResponseHead) -> u16 {
    head.get("X-Ouinet-HTTP-Status")
        .and_then(|s| s.parse().ok())
        .unwrap_or(head.status)
}

fn resolve(head: &ResponseHead, trailer: &[(String, String)], status: u16, name: &str) -> Option<String> {
    match name {
        "(response-status)" => Some(status.to_string()),
        _ => head.get(name).map(str::to_string).or_else(|| {
            trailer
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
        }),
    }
}

/// Parses a loose `key=value[,key=value...]` parameter string (used for
/// `X-Ouinet-BSigs` and `X-Ouinet-Injection`, which are not full HTTP
/// signature parameter sets).
fn parse_params(s: &str) -> Result<Vec<(String, String)>, SignError> {
    s.split(',')
        .map(|part| {
            let (k, v) = part.split_once('=').ok_or(SignError::BadMessage)?;
            let v = v.trim().trim_matches('"');
            Ok((k.trim().to_string(), v.to_string()))
        })
        .collect()
}
