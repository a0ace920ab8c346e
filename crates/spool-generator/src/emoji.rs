use crate::Generator;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{RngCore, SeedableRng};
use spool_core::emoji::{alphabet, MAX_EMOJI_SYMBOLS};
use spool_core::{Namespace, ShortCode};
use std::sync::{Mutex, PoisonError};

/// Number of emoji in a generated emoji code.
pub const DEFAULT_LENGTH: usize = 3;

/// Generates codes of `length` emoji drawn from the curated alphabet in
/// [`spool_core::emoji`], concatenated without separators.
#[derive(Debug)]
pub struct EmojiGenerator<R = StdRng> {
    rng: Mutex<R>,
    length: usize,
}

impl EmojiGenerator<StdRng> {
    /// Creates a generator seeded from the operating system.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl Default for EmojiGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + Send + 'static> EmojiGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
            length: DEFAULT_LENGTH,
        }
    }

    /// Sets the number of emoji per code, clamped to `1..=MAX_EMOJI_SYMBOLS`
    /// so every generated code still classifies as an emoji sequence.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length.clamp(1, MAX_EMOJI_SYMBOLS);
        self
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl<R: RngCore + Send + 'static> Generator for EmojiGenerator<R> {
    fn namespace(&self) -> Namespace {
        Namespace::Emoji
    }

    fn generate(&self) -> ShortCode {
        let symbols = alphabet();
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let code: String = (0..self.length)
            .filter_map(|_| symbols.choose(&mut *rng))
            .collect();
        ShortCode::new_unchecked(Namespace::Emoji, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spool_core::emoji::{is_emoji_sequence, split_emoji};

    #[test]
    fn generates_exactly_length_symbols() {
        let generator = EmojiGenerator::new();
        for _ in 0..1_000 {
            let code = generator.generate();
            let symbols = split_emoji(code.as_str()).expect("generated code must be emoji");
            assert_eq!(symbols.len(), DEFAULT_LENGTH, "{code}");
            assert!(symbols.iter().all(|s| s.chars().count() == 1));
            assert!(is_emoji_sequence(code.as_str()));
        }
    }

    #[test]
    fn custom_length() {
        let generator = EmojiGenerator::with_rng(StdRng::seed_from_u64(1)).with_length(5);
        let code = generator.generate();
        assert_eq!(split_emoji(code.as_str()).map(|s| s.len()), Some(5));
        assert_eq!(code.namespace(), Namespace::Emoji);
    }

    #[test]
    fn length_is_clamped_to_classifiable_range() {
        let long = EmojiGenerator::with_rng(StdRng::seed_from_u64(2)).with_length(40);
        assert_eq!(long.length(), MAX_EMOJI_SYMBOLS);
        assert!(is_emoji_sequence(long.generate().as_str()));

        let empty = EmojiGenerator::with_rng(StdRng::seed_from_u64(2)).with_length(0);
        assert_eq!(empty.length(), 1);
    }

    #[test]
    fn symbols_come_from_alphabet() {
        let generator = EmojiGenerator::with_rng(StdRng::seed_from_u64(9));
        let alphabet = alphabet();
        for _ in 0..1_000 {
            let code = generator.generate();
            assert!(code.as_str().chars().all(|c| alphabet.contains(&c)));
        }
    }

    #[test]
    fn same_seed_same_codes() {
        let a = EmojiGenerator::with_rng(StdRng::seed_from_u64(3));
        let b = EmojiGenerator::with_rng(StdRng::seed_from_u64(3));
        for _ in 0..100 {
            assert_eq!(a.generate(), b.generate());
        }
    }
}
