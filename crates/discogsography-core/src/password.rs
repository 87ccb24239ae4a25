//! PBKDF2-HMAC-SHA256 password hashing, stored as `{salt_hex}:{key_hex}`.
//!
//! The teacher repo hashes passwords with bcrypt; this domain's account
//! store predates that choice and is pinned to PBKDF2 for compatibility
//! with rows already written by the original implementation.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = derive(password, &salt);
    format!("{}:{}", hex::encode(salt), hex::encode(digest))
}

/// Verify `password` against a stored `{salt_hex}:{key_hex}` hash. Returns
/// `false` (rather than erroring) on a malformed stored hash, since that
/// should never happen outside of data corruption and should fail closed.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, key_hex)) = stored.split_once(':') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected_key) = hex::decode(key_hex) else {
        return false;
    };

    let actual_key = derive(password, &salt);
    constant_time_eq(&actual_key, &expected_key)
}

fn derive(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, ITERATIONS, &mut key);
    key
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_verifies() {
        let hash = hash_password("correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &hash));
    }

    #[test]
    fn wrong_password_fails() {
        let hash = hash_password("correct horse battery staple");
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn same_password_hashes_differently_each_time() {
        let a = hash_password("same input");
        let b = hash_password("same input");
        assert_ne!(a, b, "salts should differ");
        assert!(verify_password("same input", &a));
        assert!(verify_password("same input", &b));
    }

    #[test]
    fn malformed_stored_hash_fails_closed() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
        assert!(!verify_password("anything", "zz:zz"));
    }
}
