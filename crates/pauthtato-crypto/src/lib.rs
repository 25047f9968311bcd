//! Pauthtato Crypto - Hashing and randomness for the identity ledger.
//!
//! This crate provides:
//! - SHA-256 content hashing for block linking and self-consistency checks
//! - An injectable [`RandomSource`] so identifier generation can be made
//!   deterministic in tests
//!
//! # Example
//!
//! ```
//! use pauthtato_crypto::{ContentHash, OsRandom, RandomSource};
//!
//! let hash = ContentHash::hash(b"abc");
//! assert_eq!(hash.to_hex().len(), 64);
//!
//! let mut suffix = [0u8; 3];
//! OsRandom.fill(&mut suffix).unwrap();
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod hash;
mod random;

pub use error::{CryptoError, CryptoResult};
pub use hash::ContentHash;
pub use random::{OsRandom, RandomSource, SeededRandom, random_bytes};
