//! Host PIN hashing and verification.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Lowercase hex SHA-256 of `"{game_id}:{pin}"`.
pub fn hash_host_pin(game_id: Uuid, pin: &str) -> String {
    format!("{:x}", Sha256::digest(format!("{game_id}:{pin}").as_bytes()))
}

/// Compare `pin` against a stored hash in constant time.
pub fn verify_host_pin(game_id: Uuid, pin: &str, expected_hash: &str) -> bool {
    let candidate = hash_host_pin(game_id, pin);
    candidate.as_bytes().ct_eq(expected_hash.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_salted_with_game_id() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(hash_host_pin(a, "1234").len(), 64);
        assert_ne!(hash_host_pin(a, "1234"), hash_host_pin(b, "1234"));
    }

    #[test]
    fn known_vector() {
        let id = Uuid::nil();
        let expected = format!(
            "{:x}",
            Sha256::digest(b"00000000-0000-0000-0000-000000000000:1234")
        );
        assert_eq!(hash_host_pin(id, "1234"), expected);
    }

    #[test]
    fn verify_accepts_only_the_right_pin() {
        let id = Uuid::new_v4();
        let stored = hash_host_pin(id, "4321");
        assert!(verify_host_pin(id, "4321", &stored));
        assert!(!verify_host_pin(id, "4322", &stored));
        assert!(!verify_host_pin(id, "4321", ""));
    }
}
