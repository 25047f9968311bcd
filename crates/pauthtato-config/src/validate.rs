//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, LedgerBackend};

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_server(config)?;
    validate_auth(config)?;
    validate_ledger(config)?;
    validate_timeouts(config)?;
    validate_logging(config)?;
    Ok(())
}

/// Upper bound on append attempts.
const MAX_ATTEMPTS_UPPER_BOUND: u32 = 100;

/// Upper bound on any single backoff delay (1 minute).
const MAX_DELAY_UPPER_BOUND_MS: u64 = 60_000;

/// Upper bound on the per-call store timeout (5 minutes).
const STORE_TIMEOUT_UPPER_BOUND_MS: u64 = 300_000;

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_server(config: &Config) -> ConfigResult<()> {
    if config.server.host.trim().is_empty() {
        return Err(invalid("server.host", "host must not be empty"));
    }
    Ok(())
}

fn validate_auth(config: &Config) -> ConfigResult<()> {
    if let Some(key) = &config.auth.api_key
        && key.is_empty()
    {
        return Err(invalid(
            "auth.api_key",
            "api_key must not be empty; unset it instead",
        ));
    }
    Ok(())
}

fn validate_ledger(config: &Config) -> ConfigResult<()> {
    let l = &config.ledger;

    if l.backend == LedgerBackend::File && l.path.trim().is_empty() {
        return Err(invalid(
            "ledger.path",
            "path is required for the file backend",
        ));
    }

    let r = &l.retry;
    if r.max_attempts == 0 || r.max_attempts > MAX_ATTEMPTS_UPPER_BOUND {
        return Err(invalid(
            "ledger.retry.max_attempts",
            format!("max_attempts must be between 1 and {MAX_ATTEMPTS_UPPER_BOUND}"),
        ));
    }

    if r.max_delay_ms > MAX_DELAY_UPPER_BOUND_MS {
        return Err(invalid(
            "ledger.retry.max_delay_ms",
            format!("max_delay_ms must not exceed {MAX_DELAY_UPPER_BOUND_MS}"),
        ));
    }

    if r.base_delay_ms > r.max_delay_ms {
        return Err(invalid(
            "ledger.retry.base_delay_ms",
            format!(
                "base_delay_ms ({}) must not exceed max_delay_ms ({})",
                r.base_delay_ms, r.max_delay_ms
            ),
        ));
    }

    Ok(())
}

fn validate_timeouts(config: &Config) -> ConfigResult<()> {
    let ms = config.timeouts.store_ms;
    if ms == 0 || ms > STORE_TIMEOUT_UPPER_BOUND_MS {
        return Err(invalid(
            "timeouts.store_ms",
            format!("store_ms must be between 1 and {STORE_TIMEOUT_UPPER_BOUND_MS}"),
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let lg = &config.logging;

    if !matches!(
        lg.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: trace, debug, info, warn, error",
                lg.level
            ),
        ));
    }

    if !matches!(lg.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                lg.format
            ),
        ));
    }

    match lg.target.as_str() {
        "stderr" | "stdout" => {},
        "file" => {
            if lg.directory.trim().is_empty() {
                return Err(invalid(
                    "logging.directory",
                    "directory is required when target is \"file\"",
                ));
            }
        },
        other => {
            return Err(invalid(
                "logging.target",
                format!("unsupported target '{other}'; expected one of: stderr, stdout, file"),
            ));
        },
    }

    Ok(())
}
