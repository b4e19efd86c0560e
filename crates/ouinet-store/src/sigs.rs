use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::StoreError;

/// Byte length of one on-disk sig record: a 16-hex-digit offset, three
/// standard-padded base64(64-byte) fields, three separating spaces and a
/// trailing newline. `16 + 1 + 88 + 1 + 88 + 1 + 88 + 1 = 284`, fixed once
/// `sig`/`dhash`/`chash_prev` are all 64-byte fields.
pub const SIG_RECORD_LEN: usize = 16 + 1 + 88 + 1 + 88 + 1 + 88 + 1;

/// One block's entry in a `sigs` file: the block's byte offset, its
/// signature, its data hash, and the chained hash of the block *before*
/// it (all-zero for the first block).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigRecord {
    pub offset: u64,
    pub sig: [u8; 64],
    pub dhash: [u8; 64],
    pub chash_prev: [u8; 64],
}

impl SigRecord {
    /// Encodes into the fixed-width on-disk form.
    pub fn to_bytes(&self) -> [u8; SIG_RECORD_LEN] {
        let mut out = [0u8; SIG_RECORD_LEN];
        let line = format!(
            "{:016x} {} {} {}\n",
            self.offset,
            BASE64.encode(self.sig),
            BASE64.encode(self.dhash),
            BASE64.encode(self.chash_prev),
        );
        debug_assert_eq!(line.len(), SIG_RECORD_LEN);
        out.copy_from_slice(line.as_bytes());
        out
    }

    /// Decodes a fixed-width record as written by [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != SIG_RECORD_LEN {
            return Err(StoreError::MalformedSigRecord);
        }
        let line = std::str::from_utf8(bytes).map_err(|_| StoreError::MalformedSigRecord)?;
        let line = line.strip_suffix('\n').ok_or(StoreError::MalformedSigRecord)?;
        let mut fields = line.split(' ');
        let offset_hex = fields.next().ok_or(StoreError::MalformedSigRecord)?;
        let sig_b64 = fields.next().ok_or(StoreError::MalformedSigRecord)?;
        let dhash_b64 = fields.next().ok_or(StoreError::MalformedSigRecord)?;
        let chash_b64 = fields.next().ok_or(StoreError::MalformedSigRecord)?;
        if fields.next().is_some() {
            return Err(StoreError::MalformedSigRecord);
        }

        let offset = u64::from_str_radix(offset_hex, 16).map_err(|_| StoreError::MalformedSigRecord)?;
        let sig = decode_64(sig_b64)?;
        let dhash = decode_64(dhash_b64)?;
        let chash_prev = decode_64(chash_b64)?;

        Ok(SigRecord {
            offset,
            sig,
            dhash,
            chash_prev,
        })
    }
}

fn decode_64(s: &str) -> Result<[u8; 64], StoreError> {
    let bytes = BASE64.decode(s).map_err(|_| StoreError::MalformedSigRecord)?;
    bytes.try_into().map_err(|_| StoreError::MalformedSigRecord)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_exactly_sig_record_len_bytes() {
        let record = SigRecord {
            offset: 0,
            sig: [1u8; 64],
            dhash: [2u8; 64],
            chash_prev: [0u8; 64],
        };
        assert_eq!(record.to_bytes().len(), SIG_RECORD_LEN);
    }

    #[test]
    fn round_trips_through_bytes() {
        let record = SigRecord {
            offset: 8192,
            sig: [0xAB; 64],
            dhash: [0xCD; 64],
            chash_prev: [0xEF; 64],
        };
        let bytes = record.to_bytes();
        let decoded = SigRecord::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            SigRecord::from_bytes(&[0u8; 10]),
            Err(StoreError::MalformedSigRecord)
        ));
    }

    #[test]
    fn offset_is_zero_padded_lowercase_hex() {
        let record = SigRecord {
            offset: 255,
            sig: [0u8; 64],
            dhash: [0u8; 64],
            chash_prev: [0u8; 64],
        };
        let bytes = record.to_bytes();
        let line = std::str::from_utf8(&bytes).unwrap();
        assert!(line.starts_with("00000000000000ff "));
    }
}
