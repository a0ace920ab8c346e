use crate::Generator;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use spool_core::{Namespace, ShortCode};
use std::sync::{Mutex, PoisonError};

/// The 62-symbol alphabet generated codes are drawn from.
pub const ALPHABET: &[u8; 62] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated alphanumeric codes.
pub const DEFAULT_LENGTH: usize = 6;

/// Generates uniformly random `[a-zA-Z0-9]` codes.
///
/// The random source is injected so tests can use a seeded RNG.
#[derive(Debug)]
pub struct AlphanumericGenerator<R = StdRng> {
    rng: Mutex<R>,
    length: usize,
}

impl AlphanumericGenerator<StdRng> {
    /// Creates a generator seeded from the operating system.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl Default for AlphanumericGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + Send + 'static> AlphanumericGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
            length: DEFAULT_LENGTH,
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl<R: RngCore + Send + 'static> Generator for AlphanumericGenerator<R> {
    fn namespace(&self) -> Namespace {
        Namespace::Alphanumeric
    }

    fn generate(&self) -> ShortCode {
        // RNG state stays valid even if another holder panicked.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let code: String = (0..self.length)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        ShortCode::new_unchecked(Namespace::Alphanumeric, code)
    }
}
