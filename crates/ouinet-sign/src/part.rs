use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::SignError;
use crate::head::ResponseHead;

/// Chunk extension describing the *previous* block's signature and chained
/// hash, carried on the chunk header that follows it: `;ouisig="<b64
/// sig>";ouihash="<b64 chash>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkExts {
    pub sig: [u8; 64],
    pub chash: [u8; 64],
}

impl ChunkExts {
    pub fn to_wire(&self) -> String {
        format!(
            ";ouisig=\"{}\";ouihash=\"{}\"",
            BASE64.encode(self.sig),
            BASE64.encode(self.chash)
        )
    }

    pub fn from_wire(s: &str) -> Result<Self, SignError> {
        let mut sig = None;
        let mut chash = None;
        for ext in s.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = ext.split_once('=').ok_or(SignError::BadMessage)?;
            let value = value.trim_matches('"');
            match key {
                "ouisig" => {
                    let bytes = BASE64.decode(value).map_err(|_| SignError::BadMessage)?;
                    sig = Some(bytes.try_into().map_err(|_| SignError::BadMessage)?);
                }
                "ouihash" => {
                    let bytes = BASE64.decode(value).map_err(|_| SignError::BadMessage)?;
                    chash = Some(bytes.try_into().map_err(|_| SignError::BadMessage)?);
                }
                _ => {}
            }
        }
        Ok(ChunkExts {
            sig: sig.ok_or(SignError::BadMessage)?,
            chash: chash.ok_or(SignError::BadMessage)?,
        })
    }
}

/// One element of a signed HTTP response stream, in strict emission order:
/// `Head`, then `(ChunkHeader, ChunkBody)*`, a zero-size `ChunkHeader`, a
/// `Trailer`, and finally `End`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Head(ResponseHead),
    ChunkHeader { size: u64, exts: Option<ChunkExts> },
    ChunkBody(Vec<u8>),
    Trailer(Vec<(String, String)>),
    End,
}
