// pseudonym/token.rs: salted SHA-256 tokens for client identity
use sha2::{Digest, Sha256};
use std::fmt;

use super::salt::Salt;

/// Number of hex characters kept from the digest (first 8 bytes).
pub const TOKEN_LEN: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash `salt material + source_addr + user_agent`, no separators between the
/// three. Inputs are raw bytes so non-UTF-8 agents keep distinct tokens.
pub fn tokenize(salt: &Salt, source_addr: impl AsRef<[u8]>, user_agent: impl AsRef<[u8]>) -> Token {
    let mut h = Sha256::new();
    h.update(salt.material().as_bytes());
    h.update(source_addr.as_ref());
    h.update(user_agent.as_ref());
    let digest = h.finalize();
    Token(hex::encode(&digest[..TOKEN_LEN / 2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn salt(y: i32, m: u32, d: u32, secret: &str) -> Salt {
        Salt::new(NaiveDate::from_ymd_opt(y, m, d).unwrap(), secret)
    }

    fn is_token_shape(t: &Token) -> bool {
        t.as_str().len() == TOKEN_LEN && t.as_str().bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    #[test]
    fn known_answer() {
        // sha256("2024-01-01-s1.2.3.4MyAgent/1")
        let t = tokenize(&salt(2024, 1, 1, "s"), "1.2.3.4", "MyAgent/1");
        assert_eq!(t.as_str(), "2a30843f54d4370a");
    }

    #[test]
    fn deterministic_and_well_shaped() {
        let s = salt(2024, 1, 1, "pepper");
        let t1 = tokenize(&s, "10.0.0.1", "curl/8.0");
        let t2 = tokenize(&s, "10.0.0.1", "curl/8.0");
        assert_eq!(t1, t2);
        assert!(is_token_shape(&t1));
        // empty inputs are hashed like anything else
        assert!(is_token_shape(&tokenize(&s, "", "")));
    }

    #[test]
    fn day_change_rotates_tokens() {
        let a = tokenize(&salt(2024, 1, 1, "s"), "1.2.3.4", "MyAgent/1");
        let b = tokenize(&salt(2024, 1, 2, "s"), "1.2.3.4", "MyAgent/1");
        assert_ne!(a, b);
    }

    #[test]
    fn secret_and_agent_both_matter() {
        let base = tokenize(&salt(2024, 1, 1, "s"), "1.2.3.4", "A");
        assert_ne!(base, tokenize(&salt(2024, 1, 1, "t"), "1.2.3.4", "A"));
        assert_ne!(base, tokenize(&salt(2024, 1, 1, "s"), "1.2.3.4", "B"));
        assert_ne!(base, tokenize(&salt(2024, 1, 1, "s"), "1.2.3.5", "A"));
    }

    #[test]
    fn distinct_invalid_utf8_agents_get_distinct_tokens() {
        let s = salt(2024, 1, 1, "s");
        let a = tokenize(&s, b"1.2.3.4", b"Agent\xff");
        let b = tokenize(&s, b"1.2.3.4", b"Agent\xfe");
        assert_ne!(a, b);
        // same bytes, whether passed as str or slice
        assert_eq!(tokenize(&s, "1.2.3.4", "MyAgent/1"), tokenize(&s, b"1.2.3.4", b"MyAgent/1"));
    }
}
