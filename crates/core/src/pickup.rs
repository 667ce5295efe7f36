//! Pickup codes for anonymous share retrieval.
//!
//! Codes are short random tokens meant to be read over the phone or typed
//! from a screenshot, so the alphabet drops the characters people confuse:
//! digits 2-9 plus uppercase A-Z minus I and O. 32 characters at the
//! default length of 8 gives 32^8 (about 1.1e12) combinations.

use rand::RngCore;
use rand::rngs::OsRng;

/// The pickup code alphabet: 8 digits + 24 letters = 32 characters.
pub const ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Default pickup code length.
pub const DEFAULT_LENGTH: usize = 8;

/// Generate a random pickup code of the given length.
///
/// Uses the OS RNG. The alphabet length divides 256 evenly, so a plain
/// modulo over random bytes is unbiased.
pub fn generate(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
        .collect()
}

/// Validate a pickup code against the expected length and alphabet.
pub fn validate(code: &str, expected_length: usize) -> crate::Result<()> {
    if code.len() != expected_length {
        return Err(crate::Error::InvalidPickupCode(format!(
            "expected {} characters, got {}",
            expected_length,
            code.len()
        )));
    }
    if let Some(c) = code.bytes().find(|b| !ALPHABET.contains(b)) {
        return Err(crate::Error::InvalidPickupCode(format!(
            "invalid character {:?}",
            c as char
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_has_32_characters() {
        assert_eq!(ALPHABET.len(), 32);
        for forbidden in [b'0', b'O', b'1', b'I'] {
            assert!(!ALPHABET.contains(&forbidden));
        }
    }

    #[test]
    fn generator_output_validates() {
        for _ in 0..100 {
            let code = generate(DEFAULT_LENGTH);
            assert_eq!(code.len(), DEFAULT_LENGTH);
            validate(&code, DEFAULT_LENGTH).unwrap();
        }
    }

    #[test]
    fn generated_codes_differ() {
        let a = generate(DEFAULT_LENGTH);
        let b = generate(DEFAULT_LENGTH);
        assert_ne!(a, b);
    }

    #[test]
    fn validator_rejects_bad_codes() {
        assert!(validate("ABCD2345", 8).is_ok());
        assert!(validate("ABCD234", 8).is_err());
        assert!(validate("ABCD23456", 8).is_err());
        assert!(validate("ABCD234O", 8).is_err());
        assert!(validate("ABCD2340", 8).is_err());
        assert!(validate("ABCD234I", 8).is_err());
        assert!(validate("ABCD2341", 8).is_err());
        assert!(validate("abcd2345", 8).is_err());
    }
}
