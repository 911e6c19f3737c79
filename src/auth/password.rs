//! Password hashing and verification (Argon2id) plus strength rules.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Character classes a password is missing, in display order
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PasswordWeakness {
    pub too_short: bool,
    pub missing_lowercase: bool,
    pub missing_uppercase: bool,
    pub missing_digit: bool,
    pub missing_symbol: bool,
}

impl PasswordWeakness {
    #[cfg(test)]
    pub fn is_strong(&self) -> bool {
        *self == PasswordWeakness::default()
    }

    /// Human-readable messages, one per failed rule
    pub fn messages(&self) -> Vec<&'static str> {
        let mut messages = Vec::new();
        if self.too_short {
            messages.push("Password must be at least 8 characters.");
        }
        if self.missing_lowercase {
            messages.push("Password must contain a lowercase letter.");
        }
        if self.missing_uppercase {
            messages.push("Password must contain an uppercase letter.");
        }
        if self.missing_digit {
            messages.push("Password must contain a number.");
        }
        if self.missing_symbol {
            messages.push("Password must contain a symbol.");
        }
        messages
    }
}

/// Check length and the four required character classes
pub fn check_password_strength(password: &str) -> PasswordWeakness {
    let length = password.chars().count();
    PasswordWeakness {
        too_short: length < MIN_PASSWORD_LENGTH,
        missing_lowercase: !password.chars().any(|c| c.is_ascii_lowercase()),
        missing_uppercase: !password.chars().any(|c| c.is_ascii_uppercase()),
        missing_digit: !password.chars().any(|c| c.is_ascii_digit()),
        missing_symbol: !password.chars().any(|c| !c.is_ascii_alphanumeric()),
    }
}

/// Hash a password using Argon2id. Returns a PHC-format string.
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| format!("Failed to hash password: {}", e))
}

/// Verify a password against a PHC-format hash string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| format!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

fn dummy_hash() -> Option<&'static str> {
    DUMMY_HASH
        .get_or_init(|| hash_password("no-account-placeholder").ok())
        .as_deref()
}

/// Spend the same Argon2 work as a real check when there is no stored hash
///
/// Keeps unknown-email and passwordless logins as slow as a wrong password.
pub fn verify_dummy(password: &str) {
    if let Some(hash) = dummy_hash() {
        let _ = verify_password(password, hash);
    }
}
