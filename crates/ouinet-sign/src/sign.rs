use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ouinet_core::swarm::PROTOCOL_VERSION;
use ouinet_crypto::chain_hash::{data_hash, ChainHasher};
use ouinet_crypto::http_sig::{build_signing_string, SignatureParams};
use ouinet_crypto::signing::Signer;
use sha2::{Digest as _, Sha256};

use crate::error::SignError;
use crate::head::ResponseHead;
use crate::part::{ChunkExts, Part};

/// Maximum block size the codec will sign or verify.
pub const MAX_BLOCK_SIZE: u64 = 16 * 1024 * 1024;

/// Injection identity carried in `X-Ouinet-Injection` and woven into every
/// per-block signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionMeta {
    pub id: String,
    pub ts: i64,
}

/// Header names every `X-Ouinet-Sig0` must cover, in addition to whatever
/// headers the caller had already set on the response before signing.
pub const MANDATORY_SIG0_HEADERS: &[&str] = &[
    "(response-status)",
    "x-ouinet-version",
    "x-ouinet-uri",
    "x-ouinet-injection",
    "x-ouinet-bsigs",
];

/// Header names every `X-Ouinet-Sig1` must additionally cover.
pub const MANDATORY_SIG1_HEADERS: &[&str] = &["x-ouinet-data-size", "digest"];

/// Signs a complete, already-buffered HTTP response: rewrites `head` into a
/// [`ResponseHead`] carrying `X-Ouinet-*` signature headers, and reframes
/// `body` into one chunk per block with chained-hash chunk extensions.
/// Returns the full part sequence in emission order.
pub fn sign_response(
    mut head: ResponseHead,
    body: &[u8],
    uri: &str,
    injection: &InjectionMeta,
    block_size: u64,
    signer: &impl Signer,
) -> Result<Vec<Part>, SignError> {
    if block_size == 0 || block_size > MAX_BLOCK_SIZE {
        return Err(SignError::InvalidArgument("block_size out of range"));
    }

    let pubkey = signer.public_key();
    let key_id = format!("ed25519={}", BASE64.encode(pubkey));

    // Every header the caller set before signing is itself covered by Sig0,
    // so a peer relaying only the headers this signature lists (see
    // `keep_signed`) cannot silently drop e.g. `Content-Type`.
    let mut caller_header_names: Vec<String> = head
        .headers
        .iter()
        .map(|(k, _)| k.to_ascii_lowercase())
        .collect();
    caller_header_names.dedup();

    head.set("X-Ouinet-Version", PROTOCOL_VERSION.to_string());
    head.set("X-Ouinet-URI", uri);
    head.set(
        "X-Ouinet-Injection",
        format!("id={},ts={}", injection.id, injection.ts),
    );
    head.set(
        "X-Ouinet-BSigs",
        format!("keyId=\"{key_id}\",algorithm=\"hs2019\",size={block_size}"),
    );

    let mut sig0_headers: Vec<String> = vec!["(response-status)".to_string()];
    sig0_headers.extend(caller_header_names);
    sig0_headers.extend(MANDATORY_SIG0_HEADERS[1..].iter().map(|s| s.to_string()));
    let status = head.status;
    let signing_string = build_signing_string(&sig0_headers, |name| resolve(&head, &[], status, name))?;
    let sig0_sig = signer.sign(signing_string.as_bytes());
    let sig0_params = SignatureParams {
        key_id: key_id.clone(),
        created: Some(injection.ts),
        expires: None,
        headers: sig0_headers.clone(),
        signature: sig0_sig,
    };
    head.set("X-Ouinet-Sig0", sig0_params.to_header_value());
    head.set("Trailer", "X-Ouinet-Data-Size, Digest, X-Ouinet-Sig1");
    head.set("Transfer-Encoding", "chunked");

    let mut parts = vec![Part::Head(head.clone())];

    let mut chain = ChainHasher::new();
    let mut running_digest = Sha256::new();
    let mut prev_exts: Option<ChunkExts> = None;
    let mut total = 0u64;

    if body.is_empty() {
        // No data chunk is framed for a zero-length body; the sole block's
        // exts are carried directly on the terminating chunk header below.
        let chash = chain.calculate_block(0, data_hash(&[]));
        let sig = chash.sign(signer, &injection.id);
        prev_exts = Some(ChunkExts {
            sig,
            chash: chash.digest,
        });
    } else {
        for chunk in body.chunks(block_size as usize) {
            running_digest.update(chunk);
            total += chunk.len() as u64;
            parts.push(Part::ChunkHeader {
                size: chunk.len() as u64,
                exts: prev_exts,
            });
            parts.push(Part::ChunkBody(chunk.to_vec()));

            let dhash = data_hash(chunk);
            let chash = chain.calculate_block(chunk.len() as u64, dhash);
            let sig = chash.sign(signer, &injection.id);
            prev_exts = Some(ChunkExts {
                sig,
                chash: chash.digest,
            });
        }
    }

    parts.push(Part::ChunkHeader {
        size: 0,
        exts: prev_exts,
    });

    let digest_b64 = BASE64.encode(running_digest.finalize());
    let trailer_kv = vec![
        ("X-Ouinet-Data-Size".to_string(), total.to_string()),
        ("Digest".to_string(), format!("SHA-256={digest_b64}")),
    ];

    let mut sig1_headers = sig0_headers.clone();
    sig1_headers.extend(MANDATORY_SIG1_HEADERS.iter().map(|s| s.to_string()));
    let sig1_signing_string =
        build_signing_string(&sig1_headers, |name| resolve(&head, &trailer_kv, status, name))?;
    let sig1_sig = signer.sign(sig1_signing_string.as_bytes());
    let sig1_params = SignatureParams {
        key_id,
        created: Some(injection.ts),
        expires: None,
        headers: sig1_headers,
        signature: sig1_sig,
    };

    let mut trailer = trailer_kv;
    trailer.push(("X-Ouinet-Sig1".to_string(), sig1_params.to_header_value()));
    parts.push(Part::Trailer(trailer));
    parts.push(Part::End);

    Ok(parts)
}

fn resolve(head: &ResponseHead, trailer: &[(String, String)], status: u16, name: &str) -> Option<String> {
    match name {
        "(response-status)" => Some(status.to_string()),
        _ => head
            .get(name)
            .map(str::to_string)
            .or_else(|| {
                trailer
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v.clone())
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ouinet_crypto::signing::Ed25519Signer;

    #[test]
    fn signs_a_two_block_response() {
        let signer = Ed25519Signer::from_seed([0x01; 32]);
        let injection = InjectionMeta {
            id: "11111111-2222-3333-4444-555555555555".to_string(),
            ts: 1700000000,
        };
        let head = ResponseHead::new(200, "OK");
        let parts = sign_response(head, b"Hello, World!", "http://example.com/a", &injection, 8, &signer)
            .unwrap();

        let chunk_bodies: Vec<&Vec<u8>> = parts
            .iter()
            .filter_map(|p| match p {
                Part::ChunkBody(b) => Some(b),
                _ => None,
            })
            .collect();
        assert_eq!(chunk_bodies.len(), 2);
        assert_eq!(chunk_bodies[0].as_slice(), b"Hello, W");
        assert_eq!(chunk_bodies[1].as_slice(), b"orld!");

        let trailer = parts
            .iter()
            .find_map(|p| match p {
                Part::Trailer(kv) => Some(kv),
                _ => None,
            })
            .unwrap();
        let data_size = trailer
            .iter()
            .find(|(k, _)| k == "X-Ouinet-Data-Size")
            .unwrap();
        assert_eq!(data_size.1, "13");
        let digest = trailer.iter().find(|(k, _)| k == "Digest").unwrap();
        assert_eq!(digest.1, "SHA-256=3/1gIbsr1bCvZ2KQgJ7DpTGR3YHH9wpLKGiKNiGCmG8=");
    }

    #[test]
    fn empty_body_yields_one_zero_size_chunk_header() {
        let signer = Ed25519Signer::from_seed([0x02; 32]);
        let injection = InjectionMeta {
            id: "id".to_string(),
            ts: 1,
        };
        let head = ResponseHead::new(200, "OK");
        let parts = sign_response(head, b"", "http://example.com/a", &injection, 8, &signer).unwrap();
        let chunk_headers: Vec<_> = parts
            .iter()
            .filter(|p| matches!(p, Part::ChunkHeader { .. }))
            .collect();
        assert_eq!(chunk_headers.len(), 1);
        assert!(matches!(chunk_headers[0], Part::ChunkHeader { size: 0, .. }));
    }

    #[test]
    fn rejects_oversized_block_size() {
        let signer = Ed25519Signer::from_seed([0x03; 32]);
        let injection = InjectionMeta {
            id: "id".to_string(),
            ts: 1,
        };
        let head = ResponseHead::new(200, "OK");
        let err = sign_response(head, b"x", "http://example.com/a", &injection, MAX_BLOCK_SIZE + 1, &signer)
            .unwrap_err();
        assert_eq!(err, SignError::InvalidArgument("block_size out of range"));
    }
}
