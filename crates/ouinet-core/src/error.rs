use thiserror::Error;

/// Shared lightweight error type for core naming/addressing operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A URL, group name, or swarm name did not parse.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// A hex-encoded digest had the wrong length or invalid characters.
    #[error("malformed digest: {0}")]
    MalformedDigest(&'static str),
}

#[cfg(test)]
mod tests {
    use super::CoreError;

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(
            CoreError::InvalidInput("empty url").to_string(),
            "invalid input: empty url"
        );
        assert_eq!(
            CoreError::MalformedDigest("wrong length").to_string(),
            "malformed digest: wrong length"
        );
    }
}
