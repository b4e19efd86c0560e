use std::time::{Duration, Instant};

use rand::RngCore;
use sha1::{Digest, Sha1};

use crate::node_id::NodeId;

/// Lifetime of a single write-token secret before it is rotated out.
pub const SECRET_ROTATION_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Rotating secret used to compute and validate BEP5 write-tokens without
/// keeping per-peer state: `token = SHA-1(secret ‖ address ‖ node_id)`.
/// Two secrets (current and previous) are kept live at once so tokens
/// handed out just before a rotation remain valid for one more period.
pub struct TokenSecret {
    current: [u8; 16],
    previous: Option<[u8; 16]>,
    rotated_at: Instant,
}

impl TokenSecret {
    /// Creates a secret seeded with fresh randomness.
    pub fn new() -> Self {
        Self::new_at(Instant::now())
    }

    fn new_at(now: Instant) -> Self {
        let mut secret = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut secret);
        TokenSecret {
            current: secret,
            previous: None,
            rotated_at: now,
        }
    }

    /// Rotates the secret if more than [`SECRET_ROTATION_PERIOD`] has
    /// elapsed since the last rotation.
    pub fn rotate_if_due(&mut self, now: Instant) {
        if now.duration_since(self.rotated_at) >= SECRET_ROTATION_PERIOD {
            let mut fresh = [0u8; 16];
            rand::thread_rng().fill_bytes(&mut fresh);
            self.previous = Some(self.current);
            self.current = fresh;
            self.rotated_at = now;
        }
    }

    /// Computes the token a peer at `address` (opaque bytes, typically an
    /// encoded `SocketAddr`) querying with `node_id` should present back.
    pub fn compute(&self, address: &[u8], node_id: &NodeId) -> [u8; 20] {
        Self::compute_with(&self.current, address, node_id)
    }

    /// True if `token` matches either the current or the previous secret.
    pub fn validate(&self, address: &[u8], node_id: &NodeId, token: &[u8]) -> bool {
        if Self::compute_with(&self.current, address, node_id).as_slice() == token {
            return true;
        }
        if let Some(prev) = &self.previous {
            if Self::compute_with(prev, address, node_id).as_slice() == token {
                return true;
            }
        }
        false
    }

    fn compute_with(secret: &[u8; 16], address: &[u8], node_id: &NodeId) -> [u8; 20] {
        let mut hasher = Sha1::new();
        hasher.update(secret);
        hasher.update(address);
        hasher.update(node_id.as_bytes());
        hasher.finalize().into()
    }
}

impl Default for TokenSecret {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_deterministic_for_same_secret() {
        let secret = TokenSecret::new();
        let node = NodeId::from_bytes([1u8; 20]);
        let a = secret.compute(b"1.2.3.4:6881", &node);
        let b = secret.compute(b"1.2.3.4:6881", &node);
        assert_eq!(a, b);
    }

    #[test]
    fn token_depends_on_address_and_node_id() {
        let secret = TokenSecret::new();
        let node_a = NodeId::from_bytes([1u8; 20]);
        let node_b = NodeId::from_bytes([2u8; 20]);
        let t1 = secret.compute(b"1.2.3.4:6881", &node_a);
        let t2 = secret.compute(b"1.2.3.4:6881", &node_b);
        let t3 = secret.compute(b"5.6.7.8:6881", &node_a);
        assert_ne!(t1, t2);
        assert_ne!(t1, t3);
    }

    #[test]
    fn previous_secret_still_validates_after_rotation() {
        let mut secret = TokenSecret::new_at(Instant::now());
        let node = NodeId::from_bytes([3u8; 20]);
        let old_token = secret.compute(b"addr", &node);

        secret.rotate_if_due(secret.rotated_at + SECRET_ROTATION_PERIOD);
        assert!(secret.validate(b"addr", &node, &old_token));

        // A second rotation evicts the original secret entirely.
        secret.rotate_if_due(secret.rotated_at + SECRET_ROTATION_PERIOD);
        assert!(!secret.validate(b"addr", &node, &old_token));
    }

    #[test]
    fn rotation_is_a_no_op_before_the_period_elapses() {
        let mut secret = TokenSecret::new_at(Instant::now());
        let before = secret.current;
        secret.rotate_if_due(secret.rotated_at + Duration::from_secs(1));
        assert_eq!(secret.current, before);
    }
}
