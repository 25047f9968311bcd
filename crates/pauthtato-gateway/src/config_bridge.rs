//! Bridge from `pauthtato_config::Config` to domain types.
//!
//! The config crate has no dependencies on other internal crates. This module
//! translates its sections into the ledger, telemetry, and server types, so
//! both `serve` and `verify` build their store the same way.

use std::sync::Arc;
use std::time::Duration;

use pauthtato_config::{Config, LedgerBackend};
use pauthtato_ledger::{
    ChainAppender, FileLedgerStore, LedgerStore, MemoryLedgerStore, RetryPolicy, StoreResult,
};
use pauthtato_telemetry::{LogConfig, LogTarget};
use tracing::info;

use crate::error::{GatewayError, GatewayResult};
use crate::handlers::AppState;
use crate::registrar::Registrar;

/// File name prefix for rotated log files.
const LOG_FILE_PREFIX: &str = "pauthtato";

/// Convert `[logging]` to a [`LogConfig`].
///
/// Unknown formats fall back to compact and unknown targets to stderr;
/// validation rejects both before this runs.
#[must_use]
pub fn to_log_config(cfg: &Config) -> LogConfig {
    let logging = &cfg.logging;
    let log_config = LogConfig::new(&logging.level)
        .with_format(logging.format.parse().unwrap_or_default())
        .with_directives(logging.directives.iter().cloned());

    match logging.target.as_str() {
        "stdout" => log_config.with_target(LogTarget::Stdout),
        "file" => log_config.with_file_logging(&logging.directory, LOG_FILE_PREFIX),
        _ => log_config.with_target(LogTarget::Stderr),
    }
}

/// Convert `[ledger.retry]` to a [`RetryPolicy`].
#[must_use]
pub fn to_retry_policy(cfg: &Config) -> RetryPolicy {
    let retry = &cfg.ledger.retry;
    RetryPolicy {
        max_attempts: retry.max_attempts,
        base_delay: Duration::from_millis(retry.base_delay_ms),
        max_delay: Duration::from_millis(retry.max_delay_ms),
    }
}

/// Per-call store budget from `[timeouts]`.
#[must_use]
pub fn store_timeout(cfg: &Config) -> Duration {
    Duration::from_millis(cfg.timeouts.store_ms)
}

/// Open the configured ledger store.
///
/// # Errors
///
/// Returns a store error if the file backend's directory cannot be created.
pub async fn build_store(cfg: &Config) -> StoreResult<Arc<dyn LedgerStore>> {
    match cfg.ledger.backend {
        LedgerBackend::Memory => {
            info!("Using in-memory ledger store");
            Ok(Arc::new(MemoryLedgerStore::new()))
        },
        LedgerBackend::File => {
            let store = FileLedgerStore::open(&cfg.ledger.path).await?;
            info!(path = %store.dir().display(), "Using file ledger store");
            Ok(Arc::new(store))
        },
    }
}

/// An appender over `store` with the configured retry and timeout.
#[must_use]
pub fn build_appender(cfg: &Config, store: Arc<dyn LedgerStore>) -> ChainAppender {
    ChainAppender::new(store)
        .with_retry(to_retry_policy(cfg))
        .with_store_timeout(store_timeout(cfg))
}

/// Everything the HTTP handlers need.
///
/// # Errors
///
/// - [`GatewayError::MissingApiKey`] if no API key is configured
/// - [`GatewayError::Store`] if the store cannot be opened
pub async fn build_state(cfg: &Config) -> GatewayResult<Arc<AppState>> {
    let api_key = cfg
        .auth
        .api_key
        .clone()
        .ok_or(GatewayError::MissingApiKey)?;
    let store = build_store(cfg).await?;
    let registrar = Registrar::new(api_key, build_appender(cfg, store));
    Ok(Arc::new(AppState::new(registrar, store_timeout(cfg))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pauthtato_config::AuthSection;
    use pauthtato_telemetry::LogFormat;

    fn config_with_key() -> Config {
        Config {
            auth: AuthSection {
                api_key: Some("k".to_string()),
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_to_log_config() {
        let mut cfg = Config::default();
        cfg.logging.level = "debug".to_string();
        cfg.logging.format = "json".to_string();
        cfg.logging.directives = vec!["pauthtato_ledger=trace".to_string()];

        let log = to_log_config(&cfg);
        assert_eq!(log.level, "debug");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.directives, vec!["pauthtato_ledger=trace"]);
    }

    #[test]
    fn test_unknown_format_falls_back_to_compact() {
        let mut cfg = Config::default();
        cfg.logging.format = "fancy".to_string();
        assert_eq!(to_log_config(&cfg).format, LogFormat::Compact);
    }

    #[test]
    fn test_log_targets() {
        let mut cfg = Config::default();
        assert_eq!(to_log_config(&cfg).target, LogTarget::Stderr);

        cfg.logging.target = "stdout".to_string();
        assert_eq!(to_log_config(&cfg).target, LogTarget::Stdout);

        cfg.logging.target = "file".to_string();
        cfg.logging.directory = "/var/log/pauthtato".to_string();
        let log = to_log_config(&cfg);
        assert_eq!(
            log.target,
            LogTarget::File(std::path::PathBuf::from("/var/log/pauthtato"))
        );
        assert_eq!(log.file_prefix, "pauthtato");
        assert!(!log.ansi);
    }

    #[test]
    fn test_to_retry_policy() {
        let mut cfg = Config::default();
        cfg.ledger.retry.max_attempts = 8;
        cfg.ledger.retry.base_delay_ms = 5;
        cfg.ledger.retry.max_delay_ms = 50;

        let policy = to_retry_policy(&cfg);
        assert_eq!(policy.max_attempts, 8);
        assert_eq!(policy.base_delay, Duration::from_millis(5));
        assert_eq!(policy.max_delay, Duration::from_millis(50));
        assert_eq!(
            build_appender(&cfg, Arc::new(MemoryLedgerStore::new())).retry_policy(),
            policy
        );
    }

    #[tokio::test]
    async fn test_build_state_requires_api_key() {
        let err = build_state(&Config::default()).await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingApiKey));
        assert!(build_state(&config_with_key()).await.is_ok());
    }

    #[tokio::test]
    async fn test_build_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config_with_key();
        cfg.ledger.backend = LedgerBackend::File;
        cfg.ledger.path = dir.path().join("ledger").display().to_string();

        let store = build_store(&cfg).await.unwrap();
        assert!(store.read_head().await.unwrap().is_none());
        assert!(dir.path().join("ledger").is_dir());
    }
}
