//! Password hashing, session tokens, and credential validation rules

use crate::error::{Result, StudyBuddyError};
use chrono::{DateTime, Duration, Utc};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

const PBKDF2_ROUNDS: u32 = 100_000;

/// Identity attached to a verified session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub email: String,
}

/// Body of `POST /auth/register`. Missing fields default to empty strings
/// so validation can answer with the expected messages instead of a
/// deserialization rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// 16 random bytes, hex-encoded.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex(&bytes)
}

/// Opaque session token: 32 random bytes, hex-encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex(&bytes)
}

/// PBKDF2-HMAC-SHA256 over the password, salted with the salt's text bytes.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut key);
    hex(&key)
}

pub fn verify_password(password: &str, stored_hash: &str, salt: &str) -> bool {
    hash_password(password, salt) == stored_hash
}

/// When a session issued now should stop working.
pub fn session_expiry(ttl_days: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(ttl_days)
}

/// Registration field rules, checked before touching storage.
pub fn validate_registration(username: &str, email: &str, password: &str) -> Result<()> {
    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(StudyBuddyError::Validation {
            message: "All fields are required".to_string(),
        });
    }
    if username.chars().count() < 3 {
        return Err(StudyBuddyError::Validation {
            message: "Username must be at least 3 characters".to_string(),
        });
    }
    if password.chars().count() < 6 {
        return Err(StudyBuddyError::Validation {
            message: "Password must be at least 6 characters".to_string(),
        });
    }
    Ok(())
}

pub fn validate_login(username: &str, password: &str) -> Result<()> {
    if username.is_empty() || password.is_empty() {
        return Err(StudyBuddyError::Validation {
            message: "Username and password are required".to_string(),
        });
    }
    Ok(())
}

/// Extract the session token from an `Authorization` header value.
/// A bare token without the `Bearer ` prefix is accepted too.
pub fn bearer_token(header: Option<&str>) -> Option<String> {
    let token = header?.replace("Bearer ", "");
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_deterministic_per_salt() {
        let salt = "00112233445566778899aabbccddeeff";
        let first = hash_password("testpass123", salt);
        let second = hash_password("testpass123", salt);
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));

        let other_salt = hash_password("testpass123", "ffeeddccbbaa99887766554433221100");
        assert_ne!(first, other_salt);
    }

    #[test]
    fn verification_accepts_only_the_right_password() {
        let salt = generate_salt();
        let hash = hash_password("correct horse", &salt);
        assert!(verify_password("correct horse", &hash, &salt));
        assert!(!verify_password("wrong horse", &hash, &salt));
    }

    #[test]
    fn salts_and_tokens_are_hex_and_unique() {
        let salt = generate_salt();
        assert_eq!(salt.len(), 32);
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));

        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn registration_rules_report_the_first_failure() {
        let err = validate_registration("", "a@b.c", "secret1").unwrap_err();
        assert_eq!(err.to_string(), "All fields are required");

        let err = validate_registration("ab", "a@b.c", "secret1").unwrap_err();
        assert_eq!(err.to_string(), "Username must be at least 3 characters");

        let err = validate_registration("alice", "a@b.c", "short").unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 6 characters");

        assert!(validate_registration("alice", "a@b.c", "secret1").is_ok());
    }

    #[test]
    fn bearer_tokens_strip_the_prefix_but_accept_bare_values() {
        assert_eq!(bearer_token(Some("Bearer abc123")), Some("abc123".into()));
        assert_eq!(bearer_token(Some("abc123")), Some("abc123".into()));
        assert_eq!(bearer_token(Some("")), None);
        assert_eq!(bearer_token(None), None);
    }
}
