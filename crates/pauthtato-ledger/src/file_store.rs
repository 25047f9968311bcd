//! File-per-block ledger store.
//!
//! Each block lives in `block_<index>.json` (index zero-padded to 20 digits)
//! as a [`BlockRecord`]. A record is written to a temp file first and then
//! published with a hard link to its index-named path. Linking fails if the
//! path exists, which makes the index a uniqueness constraint: two writers
//! racing for the same position cannot both succeed, even across processes.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::block::{Block, BlockRecord};
use crate::error::{StoreError, StoreResult};
use crate::store::{LedgerStore, check_sequence, same_head};

const BLOCK_PREFIX: &str = "block_";
const BLOCK_SUFFIX: &str = ".json";
const TEMP_PREFIX: &str = ".tmp-";

/// Ledger store backed by a directory of JSON records.
///
/// Publishing runs on the blocking pool and finishes even if the caller's
/// future is dropped. A dropped append either never publishes or, if the
/// link was already underway, is visible to the next read: reads wait on
/// `publish` while a link is in progress.
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    dir: PathBuf,
    publish: Arc<RwLock<()>>,
}

impl FileLedgerStore {
    /// Open (creating if needed) a ledger directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, &e))?;
        debug!(path = %dir.display(), "Opened file ledger store");
        Ok(Self {
            dir,
            publish: Arc::new(RwLock::new(())),
        })
    }

    /// Directory holding the block records.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn block_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{BLOCK_PREFIX}{index:020}{BLOCK_SUFFIX}"))
    }

    /// Indices of all published blocks, ascending.
    async fn indices(&self) -> StoreResult<Vec<u64>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, &e))?;
        let mut indices = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.dir, &e))?
        {
            let name = entry.file_name();
            if let Some(index) = name.to_str().and_then(parse_block_name) {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    /// Decode the record stored under `index`, as written.
    async fn read_record(&self, index: u64) -> StoreResult<Block> {
        let path = self.block_path(index);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| io_error(&path, &e))?;
        let record: BlockRecord = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::Corrupt(format!("unreadable record {}: {e}", path.display()))
        })?;
        Ok(record.into())
    }
}

#[async_trait::async_trait]
impl LedgerStore for FileLedgerStore {
    async fn read_head(&self) -> StoreResult<Option<Block>> {
        let _published = self.publish.read().await;
        let Some(&index) = self.indices().await?.last() else {
            return Ok(None);
        };
        let head = self.read_record(index).await?;
        // Appending after a mislabelled head would fork the numbering.
        if head.index != index {
            return Err(StoreError::Corrupt(format!(
                "record {} carries index {}",
                self.block_path(index).display(),
                head.index
            )));
        }
        Ok(Some(head))
    }

    async fn append_if_head(&self, expected: Option<&Block>, block: &Block) -> StoreResult<()> {
        check_sequence(expected, block)?;

        let current = self.read_head().await?;
        if !same_head(expected, current.as_ref()) {
            return Err(StoreError::HeadMismatch {
                expected: expected.map(|b| b.index),
            });
        }

        let bytes = serde_json::to_vec_pretty(&BlockRecord::from(block))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let target = self.block_path(block.index);

        let ticket = Arc::new(CommitTicket::default());
        let _abandon = AbandonOnDrop(Arc::clone(&ticket));
        let task = {
            let dir = self.dir.clone();
            let target = target.clone();
            let publish = Arc::clone(&self.publish);
            tokio::task::spawn_blocking(move || {
                publish_record(&dir, &target, &bytes, &publish, &ticket)
            })
        };
        let published = task
            .await
            .map_err(|e| StoreError::Io(format!("record publisher failed: {e}")))?
            .map_err(|e| io_error(&target, &e))?;

        match published {
            Published::Linked => Ok(()),
            Published::Taken => Err(StoreError::HeadMismatch {
                expected: expected.map(|b| b.index),
            }),
            Published::Abandoned => Err(StoreError::Io(format!(
                "publication of {} was abandoned",
                target.display()
            ))),
        }
    }

    /// Records are returned as stored, so a mislabelled index surfaces as a
    /// verification failure rather than a read error.
    async fn read_all(&self) -> StoreResult<Vec<Block>> {
        let _published = self.publish.read().await;
        let indices = self.indices().await?;
        let mut blocks = Vec::with_capacity(indices.len());
        for index in indices {
            blocks.push(self.read_record(index).await?);
        }
        Ok(blocks)
    }
}

const PENDING: u8 = 0;
const PUBLISHING: u8 = 1;
const ABANDONED: u8 = 2;

/// Decides, exactly once, whether a prepared record may be published.
#[derive(Debug, Default)]
struct CommitTicket(AtomicU8);

impl CommitTicket {
    /// Claim the right to publish. Fails if the caller already gave up.
    fn claim(&self) -> bool {
        self.0
            .compare_exchange(PENDING, PUBLISHING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Give up, unless publishing has already started.
    fn abandon(&self) {
        let _ = self
            .0
            .compare_exchange(PENDING, ABANDONED, Ordering::AcqRel, Ordering::Acquire);
    }
}

/// Abandons the ticket when the appending future goes away.
struct AbandonOnDrop(Arc<CommitTicket>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.abandon();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Published {
    Linked,
    Taken,
    Abandoned,
}

/// A synced temp file, removed on drop.
struct TempRecord {
    path: PathBuf,
}

impl TempRecord {
    fn create(dir: &Path, bytes: &[u8]) -> std::io::Result<Self> {
        let path = dir.join(format!("{TEMP_PREFIX}{}{BLOCK_SUFFIX}", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path)?;
        let record = Self { path };
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(record)
    }
}

impl Drop for TempRecord {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove temp record");
        }
    }
}

/// Write the record beside `target` and link it into place.
///
/// Runs on the blocking pool. The link happens under the exclusive publish
/// lock, and only if `ticket` can still be claimed.
fn publish_record(
    dir: &Path,
    target: &Path,
    bytes: &[u8],
    publish: &RwLock<()>,
    ticket: &CommitTicket,
) -> std::io::Result<Published> {
    let temp = TempRecord::create(dir, bytes)?;
    let _exclusive = publish.blocking_write();
    if !ticket.claim() {
        debug!(path = %target.display(), "Append abandoned before publishing");
        return Ok(Published::Abandoned);
    }
    match std::fs::hard_link(&temp.path, target) {
        Ok(()) => Ok(Published::Linked),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(Published::Taken),
        Err(e) => Err(e),
    }
}

fn parse_block_name(name: &str) -> Option<u64> {
    name.strip_prefix(BLOCK_PREFIX)?
        .strip_suffix(BLOCK_SUFFIX)?
        .parse()
        .ok()
}

fn io_error(path: &Path, e: &std::io::Error) -> StoreError {
    StoreError::Io(format!("{}: {e}", path.display()))
}
