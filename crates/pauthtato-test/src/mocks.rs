//! Mock ledger stores for testing.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use pauthtato_ledger::{Block, LedgerStore, MemoryLedgerStore, StoreError, StoreResult};

/// Wraps a store and yields to the scheduler between reading the head and
/// committing, so concurrent writers interleave and lose races.
///
/// Counts commits and lost races so tests can assert that contention
/// actually happened.
#[derive(Debug, Default)]
pub struct ContendedStore<S> {
    inner: S,
    commits: AtomicU64,
    lost_races: AtomicU64,
}

impl<S: LedgerStore> ContendedStore<S> {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            commits: AtomicU64::new(0),
            lost_races: AtomicU64::new(0),
        }
    }

    /// The wrapped store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Appends that succeeded.
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Appends rejected with [`StoreError::HeadMismatch`].
    #[must_use]
    pub fn lost_races(&self) -> u64 {
        self.lost_races.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: LedgerStore> LedgerStore for ContendedStore<S> {
    async fn read_head(&self) -> StoreResult<Option<Block>> {
        let head = self.inner.read_head().await;
        tokio::task::yield_now().await;
        head
    }

    async fn append_if_head(&self, expected: Option<&Block>, block: &Block) -> StoreResult<()> {
        tokio::task::yield_now().await;
        let result = self.inner.append_if_head(expected, block).await;
        match &result {
            Ok(()) => {
                self.commits.fetch_add(1, Ordering::SeqCst);
            },
            Err(StoreError::HeadMismatch { .. }) => {
                self.lost_races.fetch_add(1, Ordering::SeqCst);
            },
            Err(_) => {},
        }
        result
    }

    async fn read_all(&self) -> StoreResult<Vec<Block>> {
        self.inner.read_all().await
    }
}

/// Reads succeed against an empty chain; every append loses the race.
#[derive(Debug, Default)]
pub struct AlwaysConflictStore {
    attempts: AtomicU64,
}

impl AlwaysConflictStore {
    /// Create the store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends attempted so far.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerStore for AlwaysConflictStore {
    async fn read_head(&self) -> StoreResult<Option<Block>> {
        Ok(None)
    }

    async fn append_if_head(&self, expected: Option<&Block>, _block: &Block) -> StoreResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::HeadMismatch {
            expected: expected.map(|b| b.index),
        })
    }

    async fn read_all(&self) -> StoreResult<Vec<Block>> {
        Ok(Vec::new())
    }
}

/// How a [`FailingStore`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Appends fail with an I/O error.
    Io,
    /// Appends never complete.
    Stall,
}

/// Reads go to an in-memory chain; appends fail as configured.
#[derive(Debug)]
pub struct FailingStore {
    inner: MemoryLedgerStore,
    failure: Failure,
}

impl FailingStore {
    /// Appends fail with an I/O error.
    #[must_use]
    pub fn io() -> Self {
        Self::with_failure(Failure::Io)
    }

    /// Appends hang until cancelled.
    #[must_use]
    pub fn stalled() -> Self {
        Self::with_failure(Failure::Stall)
    }

    /// Create a store with the given failure mode.
    #[must_use]
    pub fn with_failure(failure: Failure) -> Self {
        Self {
            inner: MemoryLedgerStore::new(),
            failure,
        }
    }
}

#[async_trait]
impl LedgerStore for FailingStore {
    async fn read_head(&self) -> StoreResult<Option<Block>> {
        self.inner.read_head().await
    }

    async fn append_if_head(&self, _expected: Option<&Block>, _block: &Block) -> StoreResult<()> {
        match self.failure {
            Failure::Io => Err(StoreError::Io("injected write failure".to_string())),
            Failure::Stall => std::future::pending().await,
        }
    }

    async fn read_all(&self) -> StoreResult<Vec<Block>> {
        self.inner.read_all().await
    }
}
