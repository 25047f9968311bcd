//! Pauthtato Ledger - Hash-chained registration ledger.
//!
//! This crate provides:
//! - Identity bundle generation from an injectable random source
//! - Blocks with a fixed-order canonical serialization and SHA-256 hashes
//! - The [`LedgerStore`] compare-and-append contract, with in-memory and
//!   file-per-block adapters
//! - A [`ChainAppender`] that resolves concurrent writers through bounded retry
//! - Fail-fast chain verification
//!
//! # Ordering Model
//!
//! The store's head is the only shared mutable state. Every append goes
//! through [`LedgerStore::append_if_head`], which commits only when the head
//! still equals what the writer read. A writer that loses the race re-reads
//! the head and tries again, so the committed chain is always a single
//! contiguous sequence.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pauthtato_ledger::{BundleGenerator, ChainAppender, MemoryLedgerStore, verify_chain};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = Arc::new(MemoryLedgerStore::new());
//! let appender = ChainAppender::new(store.clone());
//! let generator = BundleGenerator::system();
//!
//! let bundle = generator.generate("acme").unwrap();
//! let block = appender.append(&bundle, "acme").await.unwrap();
//! assert_eq!(block.index, 0);
//!
//! let chain = store.snapshot().unwrap();
//! assert!(verify_chain(&chain).is_ok());
//! # });
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod appender;
mod backoff;
mod block;
mod bundle;
mod clock;
mod error;
mod file_store;
mod store;
mod verify;

pub use appender::{ChainAppender, RetryPolicy};
pub use block::{Block, BlockData, BlockRecord};
pub use bundle::{BundleGenerator, IdentityBundle, USER_ID_PREFIX};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{
    LedgerError, LedgerResult, StoreError, StoreResult, VerificationError, ViolationKind,
};
pub use file_store::FileLedgerStore;
pub use store::{LedgerStore, MemoryLedgerStore};
pub use verify::{ChainReport, Violation, verify_chain, verify_store};
