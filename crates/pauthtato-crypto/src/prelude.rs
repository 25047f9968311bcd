//! Prelude module - commonly used types for convenient import.
//!
//! Use `use pauthtato_crypto::prelude::*;` to import all essential types.

// Errors
pub use crate::{CryptoError, CryptoResult};

// Hashing
pub use crate::ContentHash;

// Randomness
pub use crate::{OsRandom, RandomSource, SeededRandom, random_bytes};
