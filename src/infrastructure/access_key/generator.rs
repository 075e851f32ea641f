//! Access key generation
//!
//! Keys are a human-readable prefix followed by a random decimal suffix.
//! Generators never check uniqueness; the store absorbs collisions.

use std::fmt::Debug;
use std::sync::Mutex;

use rand::Rng;

use crate::domain::DomainError;

/// Default prefix for issued keys
pub const DEFAULT_KEY_PREFIX: &str = "B-Team_";

/// Default number of random suffix digits
pub const DEFAULT_SUFFIX_DIGITS: u32 = 6;

/// Widest suffix that still fits in a u64 range
pub const MAX_SUFFIX_DIGITS: u32 = 18;

/// Source of candidate tokens
pub trait KeyGenerator: Send + Sync + Debug {
    fn generate(&self) -> String;
}

/// Generator for random prefixed keys
#[derive(Debug, Clone)]
pub struct RandomKeyGenerator {
    /// Prefix for all generated keys (e.g., "B-Team_")
    prefix: String,
    /// Smallest suffix, inclusive
    min: u64,
    /// Largest suffix, inclusive
    max: u64,
}

impl RandomKeyGenerator {
    /// Create a generator with the default 6-digit suffix
    pub fn new(prefix: impl Into<String>) -> Self {
        let (min, max) = suffix_range(DEFAULT_SUFFIX_DIGITS);
        Self {
            prefix: prefix.into(),
            min,
            max,
        }
    }

    /// Set the number of suffix digits
    pub fn with_suffix_digits(mut self, digits: u32) -> Result<Self, DomainError> {
        if !(1..=MAX_SUFFIX_DIGITS).contains(&digits) {
            return Err(DomainError::configuration(format!(
                "suffix digits must be between 1 and {}, got {}",
                MAX_SUFFIX_DIGITS, digits
            )));
        }

        (self.min, self.max) = suffix_range(digits);
        Ok(self)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of distinct keys this generator can produce
    pub fn keyspace(&self) -> u64 {
        self.max - self.min + 1
    }
}

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self) -> String {
        let suffix = rand::thread_rng().gen_range(self.min..=self.max);
        format!("{}{}", self.prefix, suffix)
    }
}

impl Default for RandomKeyGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

/// Inclusive range of numbers with exactly `digits` decimal digits
fn suffix_range(digits: u32) -> (u64, u64) {
    (10u64.pow(digits - 1), 10u64.pow(digits) - 1)
}

/// Always returns the same token
#[derive(Debug, Clone)]
pub struct FixedKeyGenerator {
    token: String,
}

impl FixedKeyGenerator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl KeyGenerator for FixedKeyGenerator {
    fn generate(&self) -> String {
        self.token.clone()
    }
}

/// Cycles through a fixed list of tokens
#[derive(Debug)]
pub struct SequenceKeyGenerator {
    tokens: Vec<String>,
    next: Mutex<usize>,
}

impl SequenceKeyGenerator {
    /// Panics if `tokens` is empty
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        assert!(!tokens.is_empty(), "SequenceKeyGenerator needs at least one token");

        Self {
            tokens,
            next: Mutex::new(0),
        }
    }
}

impl KeyGenerator for SequenceKeyGenerator {
    fn generate(&self) -> String {
        let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
        let token = self.tokens[*next % self.tokens.len()].clone();
        *next += 1;
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffix_of<'a>(key: &'a str, prefix: &str) -> &'a str {
        key.strip_prefix(prefix).expect("key should carry the prefix")
    }

    #[test]
    fn test_generate_key() {
        let generator = RandomKeyGenerator::default();
        let key = generator.generate();

        let suffix = suffix_of(&key, "B-Team_");
        assert_eq!(suffix.len(), 6);

        let value: u64 = suffix.parse().unwrap();
        assert!((100_000..=999_999).contains(&value));
    }

    #[test]
    fn test_suffix_stays_in_range() {
        let generator = RandomKeyGenerator::default();

        for _ in 0..1_000 {
            let key = generator.generate();
            let value: u64 = suffix_of(&key, "B-Team_").parse().unwrap();
            assert!((100_000..=999_999).contains(&value), "out of range: {}", key);
        }
    }

    #[test]
    fn test_keyspace() {
        assert_eq!(RandomKeyGenerator::default().keyspace(), 900_000);

        let wide = RandomKeyGenerator::default().with_suffix_digits(12).unwrap();
        assert_eq!(wide.keyspace(), 900_000_000_000);
    }

    #[test]
    fn test_custom_prefix_and_digits() {
        let generator = RandomKeyGenerator::new("ops_").with_suffix_digits(9).unwrap();
        let key = generator.generate();

        assert_eq!(generator.prefix(), "ops_");
        assert_eq!(suffix_of(&key, "ops_").len(), 9);
    }

    #[test]
    fn test_single_digit_suffix() {
        let generator = RandomKeyGenerator::new("k").with_suffix_digits(1).unwrap();
        assert_eq!(generator.keyspace(), 9);

        for _ in 0..200 {
            let key = generator.generate();
            let value: u64 = suffix_of(&key, "k").parse().unwrap();
            assert!((1..=9).contains(&value), "out of range: {}", key);
        }
    }

    #[test]
    fn test_invalid_digits_rejected() {
        assert!(RandomKeyGenerator::default().with_suffix_digits(0).is_err());
        assert!(RandomKeyGenerator::default().with_suffix_digits(19).is_err());
        assert!(RandomKeyGenerator::default().with_suffix_digits(18).is_ok());
    }

    #[test]
    fn test_fixed_generator() {
        let generator = FixedKeyGenerator::new("B-Team_123456");
        assert_eq!(generator.generate(), "B-Team_123456");
        assert_eq!(generator.generate(), "B-Team_123456");
    }

    #[test]
    fn test_sequence_generator_cycles() {
        let generator = SequenceKeyGenerator::new(["a", "b"]);
        assert_eq!(generator.generate(), "a");
        assert_eq!(generator.generate(), "b");
        assert_eq!(generator.generate(), "a");
    }
}
