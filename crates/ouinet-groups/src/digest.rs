use sha1::{Digest, Sha1};

/// Lowercase hex SHA-1 of `s`, used to derive the bounded on-disk file
/// names for group and item names of arbitrary length.
pub fn sha1_hex(s: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic_and_forty_chars() {
        let a = sha1_hex("ed25519:abc/v6/uri/front-page");
        let b = sha1_hex("ed25519:abc/v6/uri/front-page");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
    }
}
