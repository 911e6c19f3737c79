// src/common/id_generator.rs
//! Prefixed record ids: `U_` users, `S_` refresh sessions, `O_` OAuth links,
//! followed by ten Crockford Base32 characters (50 bits from the OS CSPRNG).

use rand::{rngs::OsRng, RngCore};

const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const ID_CHARS: usize = 10;

#[derive(Debug, Clone, Copy)]
enum EntityPrefix {
    User,
    Session,
    OAuthAccount,
}

impl EntityPrefix {
    fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::Session => "S",
            EntityPrefix::OAuthAccount => "O",
        }
    }
}

/// Encode the low `5 * ID_CHARS` bits of `bits`, most significant group first
fn encode_crockford(bits: u64) -> String {
    (0..ID_CHARS)
        .rev()
        .map(|group| CROCKFORD_ALPHABET[((bits >> (group * 5)) & 0x1f) as usize] as char)
        .collect()
}

fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), encode_crockford(OsRng.next_u64()))
}

pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

pub fn generate_session_id() -> String {
    generate_id(EntityPrefix::Session)
}

pub fn generate_oauth_account_id() -> String {
    generate_id(EntityPrefix::OAuthAccount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_is_fixed_width_crockford() {
        assert_eq!(encode_crockford(0), "0000000000");
        assert_eq!(encode_crockford(31), "000000000Z");
        // Bits above the 50 encoded ones are dropped
        assert_eq!(encode_crockford(u64::MAX), "ZZZZZZZZZZ");
        assert_eq!(encode_crockford(1 << 50), "0000000000");
    }

    #[test]
    fn test_prefixes_and_shape() {
        for (id, prefix) in [
            (generate_user_id(), "U_"),
            (generate_session_id(), "S_"),
            (generate_oauth_account_id(), "O_"),
        ] {
            assert!(id.starts_with(prefix));
            assert_eq!(id.len(), 2 + ID_CHARS);
            assert!(id[2..].bytes().all(|b| CROCKFORD_ALPHABET.contains(&b)));
        }
        assert_ne!(generate_user_id(), generate_user_id());
    }
}
