//! Ledger error types.

use pauthtato_crypto::{ContentHash, CryptoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a [`LedgerStore`](crate::LedgerStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store's head is no longer the one the writer expected.
    ///
    /// Nothing was written.
    #[error("chain head changed (expected head index {expected:?})")]
    HeadMismatch {
        /// Index of the head the writer expected (`None` for an empty chain).
        expected: Option<u64>,
    },

    /// The new block does not directly follow the expected head.
    #[error("block index {actual} does not follow head (expected {expected})")]
    OutOfSequence {
        /// The index the new block should have carried.
        expected: u64,
        /// The index it carried.
        actual: u64,
    },

    /// I/O failure in the backing medium.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored state is unreadable or inconsistent.
    #[error("corrupt ledger state: {0}")]
    Corrupt(String),

    /// A store operation did not finish within its time budget.
    #[error("store operation {operation} timed out after {millis}ms")]
    Timeout {
        /// The operation that timed out.
        operation: &'static str,
        /// The budget in milliseconds.
        millis: u64,
    },

    /// A lock guarding in-memory state was poisoned.
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while appending to the chain.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Concurrent writers kept winning the race until retries ran out.
    ///
    /// Nothing was written; the caller may retry the whole operation.
    #[error("append conflict: head kept changing after {attempts} attempts")]
    Conflict {
        /// Number of attempts made.
        attempts: u32,
    },

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Identifier generation failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The chain has reached `u64::MAX` blocks.
    #[error("block index overflow")]
    IndexOverflow,
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// The kind of integrity violation found by verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    /// A block's index does not match its position.
    IndexGap,
    /// A block's `previousHash` does not match its predecessor.
    BrokenLink,
    /// A block's `hash` does not match its own payload.
    HashMismatch,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexGap => write!(f, "IndexGap"),
            Self::BrokenLink => write!(f, "BrokenLink"),
            Self::HashMismatch => write!(f, "HashMismatch"),
        }
    }
}

/// The first integrity violation found in a chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The block at `index` carries a different index.
    #[error("index gap at position {index}: block claims index {found}")]
    IndexGap {
        /// Position in the chain.
        index: u64,
        /// Index stored in the block.
        found: u64,
    },

    /// The block at `index` does not link to its predecessor.
    #[error("broken link at index {index}: expected previous hash {expected}, found {actual}")]
    BrokenLink {
        /// Position in the chain.
        index: u64,
        /// Recomputed hash of the predecessor (or the zero sentinel).
        expected: ContentHash,
        /// `previousHash` stored in the block.
        actual: ContentHash,
    },

    /// The block at `index` has been altered since it was sealed.
    #[error("hash mismatch at index {index}: payload hashes to {expected}, block says {actual}")]
    HashMismatch {
        /// Position in the chain.
        index: u64,
        /// Hash recomputed from the block's fields.
        expected: ContentHash,
        /// Hash stored in the block.
        actual: ContentHash,
    },
}

impl VerificationError {
    /// Position of the failing block.
    #[must_use]
    pub fn index(&self) -> u64 {
        match self {
            Self::IndexGap { index, .. }
            | Self::BrokenLink { index, .. }
            | Self::HashMismatch { index, .. } => *index,
        }
    }

    /// Kind of violation.
    #[must_use]
    pub fn kind(&self) -> ViolationKind {
        match self {
            Self::IndexGap { .. } => ViolationKind::IndexGap,
            Self::BrokenLink { .. } => ViolationKind::BrokenLink,
            Self::HashMismatch { .. } => ViolationKind::HashMismatch,
        }
    }
}
