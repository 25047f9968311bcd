//! Chain appender.
//!
//! Builds the next block from the current head and commits it through
//! [`LedgerStore::append_if_head`]. A writer that loses the race re-reads the
//! head and rebuilds, up to [`RetryPolicy::max_attempts`] times.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pauthtato_crypto::ContentHash;
use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::block::{Block, BlockData};
use crate::bundle::IdentityBundle;
use crate::clock::{Clock, SystemClock};
use crate::error::{LedgerError, LedgerResult, StoreError, StoreResult};
use crate::store::LedgerStore;

/// Default per-call store timeout.
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimum budget for finding out whether a timed-out append landed.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Bounds on the append retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff base delay.
    pub base_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Retry `max_attempts` times with no delay between attempts.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

/// Appends blocks to a [`LedgerStore`].
///
/// Holds no chain state of its own; the store's head is read on every
/// attempt.
#[derive(Clone)]
pub struct ChainAppender {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    store_timeout: Duration,
}

impl ChainAppender {
    /// Create an appender with the system clock and default policy.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            retry: RetryPolicy::default(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Use a different clock for block timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a different retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Bound every store call by `timeout`.
    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// The retry policy in effect.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Record a bundle issued to `service_name` as the next block.
    ///
    /// # Errors
    ///
    /// See [`append_data`](Self::append_data).
    pub async fn append(&self, bundle: &IdentityBundle, service_name: &str) -> LedgerResult<Block> {
        self.append_data(BlockData::from_bundle(service_name, bundle))
            .await
    }

    /// Commit `data` as the next block.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Conflict`] if every attempt lost the race
    /// - [`LedgerError::Store`] on a store failure or timeout
    /// - [`LedgerError::IndexOverflow`] if the chain is full
    pub async fn append_data(&self, data: BlockData) -> LedgerResult<Block> {
        let mut backoff = Backoff::new(self.retry.base_delay, self.retry.max_delay);
        let mut attempt: u32 = 0;

        while attempt < self.retry.max_attempts {
            attempt = attempt.saturating_add(1);

            let head = self
                .bounded("read_head", self.store.read_head())
                .await
                .inspect_err(|e| error!(error = %e, "Failed to read chain head"))?;
            let block = self.next_block(head.as_ref(), data.clone())?;
            debug!(attempt, index = block.index, "Attempting append");

            match self
                .bounded("append_if_head", self.store.append_if_head(head.as_ref(), &block))
                .await
            {
                Ok(()) => {
                    info!(
                        index = block.index,
                        hash = %block.hash,
                        service = %block.data.service_name,
                        attempt,
                        "Block committed"
                    );
                    return Ok(block);
                },
                Err(StoreError::HeadMismatch { .. }) => {
                    if attempt < self.retry.max_attempts {
                        let delay = backoff.next_delay();
                        warn!(
                            attempt,
                            index = block.index,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "Chain head moved, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                },
                Err(timeout @ StoreError::Timeout { .. }) => {
                    return self.settle(block, timeout).await;
                },
                Err(e) => {
                    error!(error = %e, index = block.index, "Append failed");
                    return Err(e.into());
                },
            }
        }

        warn!(attempts = attempt, "Append retries exhausted");
        Err(LedgerError::Conflict { attempts: attempt })
    }

    /// Build the block that would follow `head`.
    fn next_block(&self, head: Option<&Block>, data: BlockData) -> LedgerResult<Block> {
        let (index, previous_hash) = match head {
            Some(h) => (
                h.index.checked_add(1).ok_or(LedgerError::IndexOverflow)?,
                h.compute_hash(),
            ),
            None => (0, ContentHash::zero()),
        };
        Ok(Block::seal(
            index,
            previous_hash,
            data,
            self.clock.now_millis(),
        ))
    }

    /// Resolve an append that outlived its budget.
    ///
    /// The store may have committed the block anyway. Re-read the chain and
    /// report success if it is there; otherwise the timeout stands.
    async fn settle(&self, block: Block, timeout: StoreError) -> LedgerResult<Block> {
        let budget = self.store_timeout.max(SETTLE_TIMEOUT);
        let landed = match tokio::time::timeout(budget, self.store.read_all()).await {
            Ok(Ok(chain)) => usize::try_from(block.index)
                .ok()
                .and_then(|i| chain.get(i))
                .is_some_and(|stored| stored == &block),
            Ok(Err(e)) => {
                error!(error = %e, index = block.index, "Failed to settle timed-out append");
                false
            },
            Err(_) => {
                error!(index = block.index, "Timed out settling timed-out append");
                false
            },
        };

        if landed {
            warn!(index = block.index, hash = %block.hash, "Append timed out but committed");
            Ok(block)
        } else {
            error!(error = %timeout, index = block.index, "Append failed");
            Err(timeout.into())
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation,
                millis: u64::try_from(self.store_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

impl std::fmt::Debug for ChainAppender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainAppender")
            .field("retry", &self.retry)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}
