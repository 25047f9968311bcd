//! Test fixtures for ledger types.

use std::sync::Arc;

use pauthtato_crypto::{ContentHash, SeededRandom};
use pauthtato_ledger::{
    Block, BlockData, BundleGenerator, ChainAppender, FixedClock, IdentityBundle, LedgerStore,
    RetryPolicy,
};
use uuid::Uuid;

/// Timestamp every fixture clock starts at (2023-11-14T22:13:20Z).
pub const TEST_EPOCH_MS: u64 = 1_700_000_000_000;

/// API key used by gateway fixtures.
pub const TEST_API_KEY: &str = "test-api-key";

/// A clock frozen at [`TEST_EPOCH_MS`].
#[must_use]
pub fn test_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(TEST_EPOCH_MS))
}

/// A bundle generator with seeded randomness and a frozen clock.
#[must_use]
pub fn test_generator(seed: u64) -> BundleGenerator {
    BundleGenerator::new(Arc::new(SeededRandom::new(seed)), test_clock())
}

/// A deterministic bundle for `service_name`.
///
/// # Panics
///
/// Never in practice; seeded randomness cannot fail.
#[must_use]
pub fn test_bundle(service_name: &str) -> IdentityBundle {
    test_generator(7)
        .generate(service_name)
        .unwrap_or_else(|e| panic!("seeded generation failed: {e}"))
}

/// Block payload whose fields are derived from `n`.
#[must_use]
pub fn test_block_data(n: u8) -> BlockData {
    BlockData {
        user_id: format!("pauthtato-{:06x}", u32::from(n)),
        service_name: format!("service-{n}"),
        service_id: format!("service-{n}-bundle-{:06x}", u32::from(n)),
        uuid: Uuid::from_bytes([n; 16]),
        public_key: hex::encode([n; 32]),
        obkup_id: hex::encode([n.wrapping_add(0x80); 32]),
    }
}

/// A valid chain of `len` blocks with timestamps one second apart.
#[must_use]
pub fn build_chain(len: u8) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::with_capacity(usize::from(len));
    let mut timestamp = TEST_EPOCH_MS;
    for n in 0..len {
        let previous = blocks
            .last()
            .map_or_else(ContentHash::zero, Block::compute_hash);
        blocks.push(Block::seal(
            u64::from(n),
            previous,
            test_block_data(n),
            timestamp,
        ));
        timestamp = timestamp.saturating_add(1000);
    }
    blocks
}

/// An appender that retries `max_attempts` times without sleeping.
#[must_use]
pub fn test_appender(store: Arc<dyn LedgerStore>, max_attempts: u32) -> ChainAppender {
    ChainAppender::new(store)
        .with_clock(test_clock())
        .with_retry(RetryPolicy::immediate(max_attempts))
}

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pauthtato_ledger::verify_chain;

    #[test]
    fn test_build_chain_is_valid() {
        let chain = build_chain(10);
        assert_eq!(chain.len(), 10);
        assert!(verify_chain(&chain).is_ok());
    }

    #[test]
    fn test_bundle_is_deterministic() {
        assert_eq!(test_bundle("acme"), test_bundle("acme"));
        assert_eq!(test_bundle("acme").timestamp, TEST_EPOCH_MS);
    }

    #[test]
    fn test_block_data_differs_per_n() {
        assert_ne!(test_block_data(1), test_block_data(2));
    }
}
