//! Password credential hashing.
//!
//! Credentials are stored as PBKDF2-HMAC-SHA256 with a per-credential random salt, encoded as
//!
//! ```text
//! pbkdf2-sha256$<iterations>$<salt, base64>$<derived key, base64>
//! ```
//!
//! The iteration count travels with the hash so it can be raised later without invalidating
//! existing credentials.

use crate::{AccountError, AccountResult};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Encoded password hash as stored on the account document.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

impl PasswordHash {
    /// Hashes `password` with a fresh random salt.
    pub fn generate(password: &str, iterations: u32) -> AccountResult<Self> {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        let derived = pbkdf2_sha256(password.as_bytes(), &salt, iterations);

        Ok(Self(format!(
            "{SCHEME}${iterations}${}${}",
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(derived)
        )))
    }

    /// Checks `candidate` against this hash. The final comparison is constant time.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::MalformedPasswordHash` if the stored value cannot be decoded.
    pub fn verify(&self, candidate: &str) -> AccountResult<bool> {
        let (iterations, salt, expected) = self.decode()?;
        let derived = pbkdf2_sha256(candidate.as_bytes(), &salt, iterations);
        Ok(constant_time_eq(&derived, &expected))
    }

    fn decode(&self) -> AccountResult<(u32, Vec<u8>, Vec<u8>)> {
        let mut parts = self.0.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(key), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(AccountError::MalformedPasswordHash);
        };

        if scheme != SCHEME {
            return Err(AccountError::MalformedPasswordHash);
        }
        let iterations: u32 = iterations
            .parse()
            .map_err(|_| AccountError::MalformedPasswordHash)?;
        if iterations == 0 {
            return Err(AccountError::MalformedPasswordHash);
        }
        let salt = STANDARD_NO_PAD
            .decode(salt)
            .map_err(|_| AccountError::MalformedPasswordHash)?;
        let key = STANDARD_NO_PAD
            .decode(key)
            .map_err(|_| AccountError::MalformedPasswordHash)?;
        if key.len() != KEY_LEN {
            return Err(AccountError::MalformedPasswordHash);
        }

        Ok((iterations, salt, key))
    }
}

fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut out = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);
    out
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_pbkdf2_matches_known_vectors() {
        let one = pbkdf2_sha256(b"password", b"salt", 1);
        assert_eq!(
            one.to_vec(),
            from_hex("120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b")
        );

        let two = pbkdf2_sha256(b"password", b"salt", 2);
        assert_eq!(
            two.to_vec(),
            from_hex("ae4d0c95af6b46d32d0adff928f06dd02a303f8ef3c251dfd6e2d85a95474c43")
        );
    }

    #[test]
    fn test_verify_accepts_correct_and_rejects_wrong_password() {
        let hash = PasswordHash::generate("correct horse", 10).unwrap();
        assert!(hash.verify("correct horse").unwrap());
        assert!(!hash.verify("correct horsE").unwrap());
        assert!(!hash.verify("").unwrap());
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let a = PasswordHash::generate("secret1", 2).unwrap();
        let b = PasswordHash::generate("secret1", 2).unwrap();
        assert_ne!(a, b);
        assert!(a.verify("secret1").unwrap());
        assert!(b.verify("secret1").unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        for raw in [
            "",
            "plaintext-password",
            "bcrypt$10$abc$def",
            "pbkdf2-sha256$0$c2FsdA$AAAA",
            "pbkdf2-sha256$ten$c2FsdA$AAAA",
            "pbkdf2-sha256$1$c2FsdA$AAAA",
            "pbkdf2-sha256$1$c2FsdA$AAAA$extra",
        ] {
            let hash = PasswordHash(raw.to_string());
            assert!(
                matches!(hash.verify("x"), Err(AccountError::MalformedPasswordHash)),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_debug_does_not_leak_hash() {
        let hash = PasswordHash::generate("secret1", 1).unwrap();
        assert_eq!(format!("{hash:?}"), "PasswordHash(<redacted>)");
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
