//! Password digests.
//!
//! New credentials use a random salt and an iterated BLAKE3 key derivation.
//! Digests written by earlier releases were a single unsalted SHA-256 pass;
//! [`legacy_matches`] still accepts those so existing users can log in and
//! be migrated.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::constants::{KDF_CONTEXT_PASSWORD, SALT_SIZE};

pub type Salt = [u8; SALT_SIZE];

pub fn generate_salt() -> Salt {
    let mut salt = [0u8; SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

// BLAKE3 KDF with domain separation, chained `rounds` times
pub fn derive_password_hash(password: &[u8], salt: &[u8], rounds: u32) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_PASSWORD);
    hasher.update(salt);
    hasher.update(password);
    let mut digest = *hasher.finalize().as_bytes();

    for _ in 1..rounds.max(1) {
        let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_PASSWORD);
        hasher.update(&digest);
        hasher.update(salt);
        digest = *hasher.finalize().as_bytes();
    }
    digest
}

/// A salted digest as persisted in the credential file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordDigest {
    /// Hex-encoded 32-byte derived key.
    pub password_hash: String,
    /// Hex-encoded random salt.
    pub salt: String,
    /// Number of derivation rounds used.
    pub rounds: u32,
}

impl PasswordDigest {
    /// Digest `password` under a fresh random salt.
    pub fn new(password: &str, rounds: u32) -> Self {
        let salt = generate_salt();
        let hash = derive_password_hash(password.as_bytes(), &salt, rounds);
        Self {
            password_hash: hex::encode(hash),
            salt: hex::encode(salt),
            rounds,
        }
    }

    /// Constant-time check of `password` against this digest.
    ///
    /// A record whose hex fields do not decode never matches.
    pub fn matches(&self, password: &str) -> bool {
        let (Ok(salt), Ok(expected)) = (hex::decode(&self.salt), hex::decode(&self.password_hash))
        else {
            return false;
        };
        let actual = derive_password_hash(password.as_bytes(), &salt, self.rounds);
        expected.len() == actual.len() && actual.ct_eq(&expected).unwrap_u8() == 1
    }
}

/// Hex SHA-256 of the password, the format written by earlier releases.
pub fn legacy_sha256_hex(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn legacy_matches(stored_hex: &str, password: &str) -> bool {
    let actual = legacy_sha256_hex(password);
    let stored = stored_hex.trim().to_ascii_lowercase();
    stored.len() == actual.len() && actual.as_bytes().ct_eq(stored.as_bytes()).unwrap_u8() == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_own_password() {
        let digest = PasswordDigest::new("pw1", 8);
        assert!(digest.matches("pw1"));
        assert!(!digest.matches("pw2"));
        assert!(!digest.matches(""));
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = PasswordDigest::new("secret", 4);
        let b = PasswordDigest::new("secret", 4);
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn rounds_change_the_digest() {
        let salt = [7u8; SALT_SIZE];
        assert_ne!(
            derive_password_hash(b"pw", &salt, 1),
            derive_password_hash(b"pw", &salt, 2)
        );
        assert_eq!(
            derive_password_hash(b"pw", &salt, 0),
            derive_password_hash(b"pw", &salt, 1)
        );
    }

    #[test]
    fn corrupt_record_never_matches() {
        let mut digest = PasswordDigest::new("pw", 2);
        digest.salt = "not hex".into();
        assert!(!digest.matches("pw"));
    }

    #[test]
    fn legacy_sha256_known_vector() {
        // sha256("abc")
        let abc = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert_eq!(legacy_sha256_hex("abc"), abc);
        assert!(legacy_matches(abc, "abc"));
        assert!(legacy_matches(&abc.to_uppercase(), "abc"));
        assert!(!legacy_matches(abc, "abd"));
        assert!(!legacy_matches("short", "abc"));
    }
}
