//! Ledger storage trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use crate::block::Block;
use crate::error::{StoreError, StoreResult};

/// Durable, append-only storage for the chain.
///
/// Implementations must be thread-safe and linearize appends: when several
/// writers call [`append_if_head`](Self::append_if_head) against the same
/// expected head, at most one of them succeeds.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// The latest committed block, or `None` for an empty chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read.
    async fn read_head(&self) -> StoreResult<Option<Block>>;

    /// Commit `block` only if the current head equals `expected`.
    ///
    /// Heads are compared by index and hash. On mismatch nothing is written
    /// and [`StoreError::HeadMismatch`] is returned.
    ///
    /// If the returned future is dropped before it completes, the block must
    /// either never be committed or be visible to the next `read_*` call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::HeadMismatch`] if another writer committed
    /// first, [`StoreError::OutOfSequence`] if `block` does not directly
    /// follow `expected`, or a backend error.
    async fn append_if_head(&self, expected: Option<&Block>, block: &Block) -> StoreResult<()>;

    /// Every committed block in index order, as one consistent snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read or a record
    /// cannot be decoded.
    async fn read_all(&self) -> StoreResult<Vec<Block>>;
}

/// Index the block after `expected` must carry.
pub(crate) fn next_index(expected: Option<&Block>) -> StoreResult<u64> {
    match expected {
        Some(head) => head
            .index
            .checked_add(1)
            .ok_or_else(|| StoreError::Corrupt("block index overflow".to_string())),
        None => Ok(0),
    }
}

/// Reject blocks that do not sit directly after `expected`.
pub(crate) fn check_sequence(expected: Option<&Block>, block: &Block) -> StoreResult<()> {
    let want = next_index(expected)?;
    if block.index == want {
        Ok(())
    } else {
        Err(StoreError::OutOfSequence {
            expected: want,
            actual: block.index,
        })
    }
}

/// Whether two heads denote the same chain state.
pub(crate) fn same_head(expected: Option<&Block>, actual: Option<&Block>) -> bool {
    match (expected, actual) {
        (None, None) => true,
        (Some(e), Some(a)) => e.index == a.index && e.hash == a.hash,
        _ => false,
    }
}

/// In-memory ledger store for testing and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    blocks: RwLock<Vec<Block>>,
}

impl MemoryLedgerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing blocks, unchecked.
    ///
    /// Used to load historical or deliberately damaged chains for auditing.
    #[must_use]
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: RwLock::new(blocks),
        }
    }

    /// Wrap in an Arc for sharing.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Copy of the current chain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if a writer panicked while holding
    /// the lock.
    pub fn snapshot(&self) -> StoreResult<Vec<Block>> {
        let blocks = self
            .blocks
            .read()
            .map_err(|e| StoreError::Poisoned(format!("Failed to read blocks: {e}")))?;
        Ok(blocks.clone())
    }

    /// Number of committed blocks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the lock is poisoned.
    pub fn len(&self) -> StoreResult<usize> {
        let blocks = self
            .blocks
            .read()
            .map_err(|e| StoreError::Poisoned(format!("Failed to read blocks: {e}")))?;
        Ok(blocks.len())
    }

    /// Whether the chain is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the lock is poisoned.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn read_head(&self) -> StoreResult<Option<Block>> {
        let blocks = self
            .blocks
            .read()
            .map_err(|e| StoreError::Poisoned(format!("Failed to read blocks: {e}")))?;
        Ok(blocks.last().cloned())
    }

    async fn append_if_head(&self, expected: Option<&Block>, block: &Block) -> StoreResult<()> {
        check_sequence(expected, block)?;

        // Compare and push under one guard.
        let mut blocks = self
            .blocks
            .write()
            .map_err(|e| StoreError::Poisoned(format!("Failed to write blocks: {e}")))?;
        if !same_head(expected, blocks.last()) {
            return Err(StoreError::HeadMismatch {
                expected: expected.map(|b| b.index),
            });
        }
        blocks.push(block.clone());
        Ok(())
    }

    async fn read_all(&self) -> StoreResult<Vec<Block>> {
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockData;
    use pauthtato_crypto::ContentHash;
    use uuid::Uuid;

    fn data(n: u8) -> BlockData {
        BlockData {
            user_id: format!("pauthtato-{n:06x}"),
            service_name: "svc".to_string(),
            service_id: format!("svc-bundle-{n:06x}"),
            uuid: Uuid::from_bytes([n; 16]),
            public_key: hex::encode([n; 32]),
            obkup_id: hex::encode([n; 32]),
        }
    }

    fn genesis() -> Block {
        Block::seal(0, ContentHash::zero(), data(0), 10)
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = MemoryLedgerStore::new();
        assert!(store.read_head().await.unwrap().is_none());
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_on_empty_head() {
        let store = MemoryLedgerStore::new();
        let block = genesis();
        store.append_if_head(None, &block).await.unwrap();

        assert_eq!(store.read_head().await.unwrap(), Some(block));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stale_head_rejected_without_side_effects() {
        let store = MemoryLedgerStore::new();
        let first = genesis();
        store.append_if_head(None, &first).await.unwrap();

        // A second writer that also saw the empty chain loses.
        let rival = Block::seal(0, ContentHash::zero(), data(1), 11);
        let err = store.append_if_head(None, &rival).await.unwrap_err();
        assert!(matches!(err, StoreError::HeadMismatch { expected: None }));
        assert_eq!(store.snapshot().unwrap(), vec![first]);
    }

    #[tokio::test]
    async fn test_same_index_different_hash_rejected() {
        let store = MemoryLedgerStore::new();
        let first = genesis();
        store.append_if_head(None, &first).await.unwrap();

        let forged_head = Block::seal(0, ContentHash::zero(), data(9), 99);
        let next = Block::seal(1, forged_head.compute_hash(), data(2), 12);
        let err = store
            .append_if_head(Some(&forged_head), &next)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::HeadMismatch { expected: Some(0) }));
    }

    #[tokio::test]
    async fn test_out_of_sequence_rejected() {
        let store = MemoryLedgerStore::new();
        let skipping = Block::seal(5, ContentHash::zero(), data(1), 11);
        let err = store.append_if_head(None, &skipping).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::OutOfSequence {
                expected: 0,
                actual: 5
            }
        ));
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_read_all_is_a_snapshot() {
        let store = MemoryLedgerStore::new();
        let first = genesis();
        store.append_if_head(None, &first).await.unwrap();

        let snapshot = store.read_all().await.unwrap();
        let second = Block::seal(1, first.compute_hash(), data(1), 20);
        store.append_if_head(Some(&first), &second).await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.read_all().await.unwrap().len(), 2);
    }
}
