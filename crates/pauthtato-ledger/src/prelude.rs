//! Prelude module - commonly used types for convenient import.
//!
//! Use `use pauthtato_ledger::prelude::*;` to import all essential types.

// Errors
pub use crate::{LedgerError, LedgerResult, StoreError, StoreResult, VerificationError};

// Data model
pub use crate::{Block, BlockData, IdentityBundle};

// Generation and appending
pub use crate::{BundleGenerator, ChainAppender, Clock, RetryPolicy, SystemClock};

// Storage
pub use crate::{FileLedgerStore, LedgerStore, MemoryLedgerStore};

// Verification
pub use crate::{ChainReport, verify_chain, verify_store};
