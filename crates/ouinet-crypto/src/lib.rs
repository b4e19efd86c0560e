//! Cryptographic primitives for the signed-response codec: Ed25519
//! signing/verification, the chained block-hash, and the HTTP
//! signature-string builder (draft-cavage-http-signatures-11 subset).

pub mod chain_hash;
pub mod http_sig;
pub mod signing;

pub use chain_hash::{ChainHash, ChainHasher, Sha512Digest};
pub use http_sig::{build_signing_string, HttpSigError, SignatureParams};
pub use signing::{Ed25519Signer, Ed25519Verifier, Signer, SigningError, Verifier};
