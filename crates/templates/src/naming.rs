use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of every generated identifier
pub const FRESH_NAME_LEN: usize = 10;

/// Random alphabetic identifiers for variables and target names.
///
/// No bookkeeping of issued names: with 52^10 possibilities collisions are
/// not a practical concern.
#[derive(Debug, Clone)]
pub struct FreshNames {
    rng: StdRng,
}

impl Default for FreshNames {
    fn default() -> Self {
        Self::new()
    }
}

impl FreshNames {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence, for tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_name(&mut self) -> String {
        (0..FRESH_NAME_LEN)
            .map(|_| LETTERS[self.rng.gen_range(0..LETTERS.len())] as char)
            .collect()
    }

    /// A fresh name as a string literal: `'abcdefghij'`
    pub fn next_quoted(&mut self) -> String {
        format!("'{}'", self.next_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_alphabetic_and_fixed_length() {
        let mut names = FreshNames::new();
        for _ in 0..100 {
            let name = names.next_name();
            assert_eq!(name.len(), FRESH_NAME_LEN);
            assert!(name.chars().all(|c| c.is_ascii_alphabetic()), "{name}");
        }
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let mut a = FreshNames::seeded(7);
        let mut b = FreshNames::seeded(7);
        assert_eq!(a.next_name(), b.next_name());
        assert_eq!(a.next_quoted(), b.next_quoted());
    }

    #[test]
    fn test_quoted() {
        let quoted = FreshNames::seeded(1).next_quoted();
        assert!(quoted.starts_with('\'') && quoted.ends_with('\''));
        assert_eq!(quoted.len(), FRESH_NAME_LEN + 2);
    }
}
