use ouinet_crypto::http_sig::SignatureParams;

use crate::head::ResponseHead;

/// Strips every header not covered by the `headers=` list of any signature
/// present on `head` (`X-Ouinet-Sig0`, plus `X-Ouinet-Sig1` once merged in
/// from the trailer). A peer re-serving a response through an intermediary
/// that does not understand Ouinet signatures must not be able to smuggle
/// in or preserve a header the origin never actually signed.
///
/// The signature headers themselves, and the handful of framing headers
/// every signed response carries, always survive.
pub fn keep_signed(head: &ResponseHead) -> ResponseHead {
    let mut covered: Vec<String> = Vec::new();
    for sig_header in ["X-Ouinet-Sig0", "X-Ouinet-Sig1"] {
        if let Some(value) = head.get(sig_header) {
            if let Ok(params) = SignatureParams::parse(value) {
                covered.extend(params.headers.into_iter().map(|h| h.to_ascii_lowercase()));
            }
        }
    }

    let always_keep = [
        "x-ouinet-version",
        "x-ouinet-uri",
        "x-ouinet-injection",
        "x-ouinet-bsigs",
        "x-ouinet-sig0",
        "x-ouinet-sig1",
        "x-ouinet-data-size",
        "digest",
    ];

    let mut out = ResponseHead::new(head.status, head.reason.clone());
    for (name, value) in &head.headers {
        let lower = name.to_ascii_lowercase();
        if covered.contains(&lower) || always_keep.contains(&lower.as_str()) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}
