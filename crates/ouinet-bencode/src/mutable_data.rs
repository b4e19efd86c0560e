/// Builds the BEP-0044 mutable-data item signature buffer: the exact byte
/// string an ed25519 signature is computed over (and later checked
/// against). Hand-assembled rather than built through [`crate::value::encode`]
/// because the buffer is not itself a valid bencoded dictionary — it omits
/// the `d`/`e` wrapper and any unsigned fields (`token`, `id`, …) a real
/// `put` message carries alongside `seq`/`v`/`sig`.
///
/// `bencoded_value` is the already-bencoded `v` payload (e.g.
/// `encode(&BValue::bytes(...))`), not the raw value bytes.
pub fn signature_buffer(salt: Option<&[u8]>, seq: i64, bencoded_value: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(salt) = salt {
        buf.extend_from_slice(format!("4:salt{}:", salt.len()).as_bytes());
        buf.extend_from_slice(salt);
    }
    buf.extend_from_slice(format!("3:seqi{seq}e").as_bytes());
    buf.extend_from_slice(b"1:v");
    buf.extend_from_slice(bencoded_value);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{encode, BValue};

    #[test]
    fn matches_the_bep44_example_without_salt() {
        let v = encode(&BValue::bytes("bar"));
        let buf = signature_buffer(None, 1, &v);
        assert_eq!(buf, b"3:seqi1e1:v3:bar");
    }

    #[test]
    fn matches_the_bep44_example_with_salt() {
        let v = encode(&BValue::bytes("bar"));
        let buf = signature_buffer(Some(b"foobar"), 1, &v);
        assert_eq!(buf, b"4:salt6:foobar3:seqi1e1:v3:bar");
    }

    #[test]
    fn covers_the_value_bencoding_verbatim_for_compound_values() {
        let v = encode(&BValue::List(vec![BValue::bytes("a"), BValue::Int(2)]));
        let buf = signature_buffer(None, 4, &v);
        assert_eq!(buf, b"3:seqi4e1:vl1:ai2ee");
    }
}
