//! Pauthtato Test - Shared test utilities for the identity ledger.
//!
//! This crate provides deterministic fixtures and mock ledger stores that can
//! be used across Pauthtato crates as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! pauthtato-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pauthtato_ledger::{ChainAppender, MemoryLedgerStore};
//! use pauthtato_test::{ContendedStore, test_block_data};
//!
//! #[tokio::test(flavor = "multi_thread")]
//! async fn test_contention() {
//!     let store = Arc::new(ContendedStore::new(MemoryLedgerStore::new()));
//!     let appender = ChainAppender::new(store.clone());
//!     appender.append_data(test_block_data(0)).await.unwrap();
//!     assert_eq!(store.commits(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
