//! Chain verification.
//!
//! Checks each block in order and stops at the first violation:
//! index contiguity, then the link to the predecessor, then the block's own
//! hash. Nothing is repaired.

use pauthtato_crypto::ContentHash;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::block::Block;
use crate::error::{LedgerResult, VerificationError, ViolationKind};
use crate::store::LedgerStore;

/// Verify a full chain, starting at index 0.
///
/// An empty chain is valid.
///
/// # Errors
///
/// Returns the first [`VerificationError`] found.
pub fn verify_chain(blocks: &[Block]) -> Result<(), VerificationError> {
    let mut prev: Option<&Block> = None;
    let mut position: u64 = 0;

    for block in blocks {
        if block.index != position {
            return Err(VerificationError::IndexGap {
                index: position,
                found: block.index,
            });
        }

        let expected_link = prev.map_or_else(ContentHash::zero, Block::compute_hash);
        if block.previous_hash != expected_link {
            return Err(VerificationError::BrokenLink {
                index: position,
                expected: expected_link,
                actual: block.previous_hash,
            });
        }

        let recomputed = block.compute_hash();
        if block.hash != recomputed {
            return Err(VerificationError::HashMismatch {
                index: position,
                expected: recomputed,
                actual: block.hash,
            });
        }

        prev = Some(block);
        position = position.saturating_add(1);
    }

    Ok(())
}

/// A single violation, as reported to audit surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Position of the failing block.
    pub index: u64,
    /// What went wrong.
    pub kind: ViolationKind,
    /// Human-readable description.
    pub detail: String,
}

impl From<&VerificationError> for Violation {
    fn from(err: &VerificationError) -> Self {
        Self {
            index: err.index(),
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

/// Outcome of verifying a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainReport {
    /// Whether the chain passed every check.
    pub valid: bool,
    /// Blocks checked before stopping.
    pub blocks_verified: u64,
    /// The first violation, if any.
    pub violation: Option<Violation>,
}

impl ChainReport {
    /// Verify `blocks` and summarize the result.
    #[must_use]
    pub fn from_blocks(blocks: &[Block]) -> Self {
        match verify_chain(blocks) {
            Ok(()) => Self {
                valid: true,
                blocks_verified: u64::try_from(blocks.len()).unwrap_or(u64::MAX),
                violation: None,
            },
            Err(err) => Self {
                valid: false,
                blocks_verified: err.index(),
                violation: Some(Violation::from(&err)),
            },
        }
    }
}

/// Read the whole chain from `store` and verify it.
///
/// # Errors
///
/// Returns an error only if the store cannot be read. Integrity failures are
/// reported in the [`ChainReport`].
pub async fn verify_store(store: &dyn LedgerStore) -> LedgerResult<ChainReport> {
    let blocks = store.read_all().await?;
    let report = ChainReport::from_blocks(&blocks);
    match &report.violation {
        None => info!(blocks = report.blocks_verified, "Chain verified"),
        Some(v) => warn!(index = v.index, kind = %v.kind, detail = %v.detail, "Chain verification failed"),
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockData;
    use crate::store::MemoryLedgerStore;
    use uuid::Uuid;

    fn data(n: u8) -> BlockData {
        BlockData {
            user_id: format!("pauthtato-{n:06x}"),
            service_name: "audit".to_string(),
            service_id: format!("audit-bundle-{n:06x}"),
            uuid: Uuid::from_bytes([n; 16]),
            public_key: hex::encode([n; 32]),
            obkup_id: hex::encode([n; 32]),
        }
    }

    fn chain(len: u8) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::new();
        for n in 0..len {
            let prev = blocks.last().map_or_else(ContentHash::zero, Block::compute_hash);
            let timestamp = 1_000_u64.saturating_add(u64::from(n));
            blocks.push(Block::seal(u64::from(n), prev, data(n), timestamp));
        }
        blocks
    }

    #[test]
    fn test_empty_chain_is_valid() {
        assert!(verify_chain(&[]).is_ok());
    }

    #[test]
    fn test_valid_chain() {
        assert!(verify_chain(&chain(6)).is_ok());
    }

    #[test]
    fn test_genesis_needs_zero_sentinel() {
        let mut blocks = chain(1);
        blocks[0] = Block::seal(0, ContentHash::hash(b"x"), data(0), 1);
        let err = verify_chain(&blocks).unwrap_err();
        assert_eq!(err.kind(), ViolationKind::BrokenLink);
        assert_eq!(err.index(), 0);
    }

    #[test]
    fn test_tampered_data_is_hash_mismatch_at_that_block() {
        for k in 0..5 {
            let mut blocks = chain(5);
            blocks[k].data.service_name = "mallory".to_string();
            let err = verify_chain(&blocks).unwrap_err();
            assert_eq!(err.kind(), ViolationKind::HashMismatch);
            assert_eq!(err.index(), u64::try_from(k).unwrap());
        }
    }

    #[test]
    fn test_every_payload_field_is_covered_by_the_hash() {
        let edits: [(&str, fn(&mut Block)); 8] = [
            ("user_id", |b| b.data.user_id = "pauthtato-ffffff".to_string()),
            ("service_name", |b| b.data.service_name = "mallory".to_string()),
            ("service_id", |b| b.data.service_id = "audit-bundle-ffffff".to_string()),
            ("uuid", |b| b.data.uuid = Uuid::from_bytes([0xee; 16])),
            ("public_key", |b| b.data.public_key = "ab".repeat(32)),
            ("obkup_id", |b| b.data.obkup_id = "cd".repeat(32)),
            ("timestamp", |b| b.timestamp = 42),
            ("hash", |b| b.hash = ContentHash::hash(b"forged")),
        ];

        for (field, edit) in edits {
            for k in 0..5_u8 {
                let mut blocks = chain(5);
                edit(&mut blocks[usize::from(k)]);

                let err = verify_chain(&blocks).unwrap_err();
                assert!(
                    matches!(err, VerificationError::HashMismatch { index, .. } if index == u64::from(k)),
                    "{field} edited at {k}: {err:?}"
                );
            }
        }
    }

    #[test]
    fn test_tampered_timestamp_is_hash_mismatch() {
        let mut blocks = chain(3);
        blocks[1].timestamp = 0;
        let err = verify_chain(&blocks).unwrap_err();
        assert!(matches!(err, VerificationError::HashMismatch { index: 1, .. }));
    }

    #[test]
    fn test_resealed_block_breaks_successor_link() {
        let mut blocks = chain(4);
        // Rewrite block 1 and fix up its own hash; block 2 still points at the
        // old one.
        let mut forged = blocks[1].clone();
        forged.data.user_id = "pauthtato-ffffff".to_string();
        blocks[1] = Block::seal(forged.index, forged.previous_hash, forged.data, forged.timestamp);

        let err = verify_chain(&blocks).unwrap_err();
        assert!(matches!(err, VerificationError::BrokenLink { index: 2, .. }));
    }

    #[test]
    fn test_tampered_previous_hash_is_broken_link() {
        let mut blocks = chain(3);
        blocks[2].previous_hash = ContentHash::hash(b"elsewhere");
        let err = verify_chain(&blocks).unwrap_err();
        assert!(matches!(err, VerificationError::BrokenLink { index: 2, .. }));
    }

    #[test]
    fn test_missing_block_is_index_gap() {
        let mut blocks = chain(4);
        blocks.remove(2);
        let err = verify_chain(&blocks).unwrap_err();
        assert_eq!(
            err,
            VerificationError::IndexGap {
                index: 2,
                found: 3
            }
        );
    }

    #[test]
    fn test_index_checked_before_link() {
        let mut blocks = chain(3);
        blocks[1].index = 9;
        blocks[1].previous_hash = ContentHash::zero();
        let err = verify_chain(&blocks).unwrap_err();
        assert_eq!(err.kind(), ViolationKind::IndexGap);
    }

    #[test]
    fn test_report_shape() {
        let mut blocks = chain(3);
        assert_eq!(
            ChainReport::from_blocks(&blocks),
            ChainReport {
                valid: true,
                blocks_verified: 3,
                violation: None
            }
        );

        blocks[2].data.public_key = "00".repeat(32);
        let report = ChainReport::from_blocks(&blocks);
        assert!(!report.valid);
        assert_eq!(report.blocks_verified, 2);
        let violation = report.violation.clone().unwrap();
        assert_eq!(violation.index, 2);
        assert_eq!(violation.kind, ViolationKind::HashMismatch);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["blocksVerified"], 2);
        assert_eq!(json["violation"]["kind"], "HashMismatch");
    }

    #[tokio::test]
    async fn test_verify_store() {
        let store = MemoryLedgerStore::from_blocks(chain(4));
        let report = verify_store(&store).await.unwrap();
        assert!(report.valid);
        assert_eq!(report.blocks_verified, 4);
    }
}
