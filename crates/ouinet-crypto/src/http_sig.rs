use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

/// Errors parsing or building an HTTP signature (draft-cavage-http-signatures-11
/// subset, restricted to the `hs2019` / Ed25519-over-SHA-512 algorithm).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HttpSigError {
    /// The signature parameter string was not well-formed `key=value` pairs.
    #[error("malformed signature parameters")]
    Malformed,
    /// A required parameter (`keyId`, `algorithm`, `headers`, `signature`) was absent.
    #[error("missing signature parameter: {0}")]
    MissingParam(&'static str),
    /// `algorithm` was present but not `hs2019`.
    #[error("unsupported signature algorithm")]
    UnsupportedAlgorithm,
    /// `signature` was not valid base64.
    #[error("signature is not valid base64")]
    InvalidBase64,
    /// One of the header names referenced a pseudo-header or real header
    /// this implementation does not know how to resolve.
    #[error("unresolvable header in signing string: {0}")]
    UnresolvableHeader(String),
}

/// Parsed parameters of an `X-Ouinet-Sig0`/`X-Ouinet-Sig1` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParams {
    pub key_id: String,
    pub created: Option<i64>,
    pub expires: Option<i64>,
    pub headers: Vec<String>,
    pub signature: [u8; 64],
}

impl SignatureParams {
    /// Parses a comma-separated `key="value"` (or bare-numeric) parameter
    /// string as carried in a signature header.
    pub fn parse(s: &str) -> Result<Self, HttpSigError> {
        let mut key_id = None;
        let mut algorithm = None;
        let mut created = None;
        let mut expires = None;
        let mut headers = None;
        let mut signature = None;

        for part in split_params(s) {
            let (k, v) = part.split_once('=').ok_or(HttpSigError::Malformed)?;
            let v = unquote(v.trim());
            match k.trim() {
                "keyId" => key_id = Some(v),
                "algorithm" => algorithm = Some(v),
                "created" => created = Some(v.parse().map_err(|_| HttpSigError::Malformed)?),
                "expires" => expires = Some(v.parse().map_err(|_| HttpSigError::Malformed)?),
                "headers" => headers = Some(v.split(' ').map(str::to_string).collect()),
                "signature" => {
                    let bytes = BASE64.decode(&v).map_err(|_| HttpSigError::InvalidBase64)?;
                    let arr: [u8; 64] = bytes
                        .try_into()
                        .map_err(|_| HttpSigError::InvalidBase64)?;
                    signature = Some(arr);
                }
                _ => {}
            }
        }

        match algorithm.as_deref() {
            Some("hs2019") => {}
            Some(_) => return Err(HttpSigError::UnsupportedAlgorithm),
            None => return Err(HttpSigError::MissingParam("algorithm")),
        }

        Ok(SignatureParams {
            key_id: key_id.ok_or(HttpSigError::MissingParam("keyId"))?,
            created,
            expires,
            headers: headers.ok_or(HttpSigError::MissingParam("headers"))?,
            signature: signature.ok_or(HttpSigError::MissingParam("signature"))?,
        })
    }

    /// Serializes back into the `key="value"` parameter string, in the
    /// canonical field order used throughout this codebase.
    pub fn to_header_value(&self) -> String {
        let mut out = format!("keyId=\"{}\",algorithm=\"hs2019\"", self.key_id);
        if let Some(created) = self.created {
            out.push_str(&format!(",created={created}"));
        }
        if let Some(expires) = self.expires {
            out.push_str(&format!(",expires={expires}"));
        }
        out.push_str(&format!(",headers=\"{}\"", self.headers.join(" ")));
        out.push_str(&format!(",signature=\"{}\"", BASE64.encode(self.signature)));
        out
    }
}

/// Builds the signing string: the `\n`-joined, lower-cased, trimmed
/// `name: value` lines for exactly the header names in `params.headers`,
/// resolved via `resolve` (which must also handle the pseudo-headers
/// `(response-status)`, `(created)`, `(expires)`, `(request-target)`).
pub fn build_signing_string(
    headers: &[String],
    mut resolve: impl FnMut(&str) -> Option<String>,
) -> Result<String, HttpSigError> {
    let mut lines = Vec::with_capacity(headers.len());
    for name in headers {
        let lower = name.to_ascii_lowercase();
        let value = resolve(&lower).ok_or_else(|| HttpSigError::UnresolvableHeader(lower.clone()))?;
        lines.push(format!("{}: {}", lower, value.trim()));
    }
    Ok(lines.join("\n"))
}

fn split_params(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn unquote(s: &str) -> String {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_params_roundtrip() {
        let params = SignatureParams {
            key_id: "ed25519=abcd".to_string(),
            created: Some(1700000000),
            expires: None,
            headers: vec!["(response-status)".to_string(), "x-ouinet-uri".to_string()],
            signature: [7u8; 64],
        };
        let header_value = params.to_header_value();
        let parsed = SignatureParams::parse(&header_value).unwrap();
        assert_eq!(parsed, params);
    }

    #[test]
    fn parse_rejects_unsupported_algorithm() {
        let s = "keyId=\"x\",algorithm=\"rsa-sha256\",headers=\"a\",signature=\"AA==\"";
        assert_eq!(
            SignatureParams::parse(s),
            Err(HttpSigError::UnsupportedAlgorithm)
        );
    }

    #[test]
    fn parse_rejects_missing_headers() {
        let s = "keyId=\"x\",algorithm=\"hs2019\",signature=\"AA==\"";
        assert!(matches!(
            SignatureParams::parse(s),
            Err(HttpSigError::MissingParam("headers"))
        ));
    }

    #[test]
    fn build_signing_string_lowercases_and_trims() {
        let headers = vec!["(response-status)".to_string(), "X-Ouinet-URI".to_string()];
        let s = build_signing_string(&headers, |name| match name {
            "(response-status)" => Some("200".to_string()),
            "x-ouinet-uri" => Some("  http://example.com/a  ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(s, "(response-status): 200\nx-ouinet-uri: http://example.com/a");
    }

    #[test]
    fn build_signing_string_fails_on_unresolved_header() {
        let headers = vec!["missing".to_string()];
        let err = build_signing_string(&headers, |_| None).unwrap_err();
        assert_eq!(err, HttpSigError::UnresolvableHeader("missing".to_string()));
    }

    #[test]
    fn base64_roundtrip_matches_known_vector() {
        // SHA-256("Hello, World!"), used as a cross-check against the
        // signed-response test vector.
        let digest = [
            0xdf, 0xfd, 0x60, 0x21, 0xbb, 0x2b, 0xd5, 0xb0, 0xaf, 0x67, 0x62, 0x90, 0x80, 0x9e,
            0xc3, 0xa5, 0x31, 0x91, 0xdd, 0x81, 0xc7, 0xf7, 0x0a, 0x4b, 0x28, 0x68, 0x8a, 0x36,
            0x22, 0x82, 0x98, 0x6f,
        ];
        assert_eq!(BASE64.encode(digest), "3/1gIbsr1bCvZ2KQgJ7DpTGR3YHH9wpLKGiKNiGCmG8=");
        assert_eq!(BASE64.decode("3/1gIbsr1bCvZ2KQgJ7DpTGR3YHH9wpLKGiKNiGCmG8=").unwrap(), digest);
    }
}
