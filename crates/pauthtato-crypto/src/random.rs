//! Injectable random sources.
//!
//! Production code draws from the operating system CSPRNG. Tests swap in a
//! [`SeededRandom`] so generated identifiers are reproducible.

use std::sync::Mutex;

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

use crate::error::{CryptoError, CryptoResult};

/// A source of random bytes.
pub trait RandomSource: Send + Sync {
    /// Fill `dest` with random bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::RandomUnavailable`] if the source cannot
    /// produce bytes.
    fn fill(&self, dest: &mut [u8]) -> CryptoResult<()>;
}

/// Draw `N` bytes from `source`.
///
/// # Errors
///
/// Returns [`CryptoError::RandomUnavailable`] if the source cannot produce
/// bytes.
pub fn random_bytes<const N: usize>(source: &dyn RandomSource) -> CryptoResult<[u8; N]> {
    let mut out = [0u8; N];
    source.fill(&mut out)?;
    Ok(out)
}

/// The operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> CryptoResult<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| CryptoError::RandomUnavailable(e.to_string()))
    }
}

/// Deterministic random source seeded from a `u64` (tests only).
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Create a source that replays the same byte stream for the same seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn fill(&self, dest: &mut [u8]) -> CryptoResult<()> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|e| CryptoError::RandomUnavailable(e.to_string()))?;
        rng.fill_bytes(dest);
        Ok(())
    }
}
