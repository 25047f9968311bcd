//! Configuration types for the Pauthtato service.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working
//! configuration.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration for the Pauthtato service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings.
    pub server: ServerSection,
    /// Shared-secret authentication.
    pub auth: AuthSection,
    /// Ledger store selection and append retry policy.
    pub ledger: LedgerSection,
    /// Timeout budgets.
    pub timeouts: TimeoutsSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// ServerSection
// ---------------------------------------------------------------------------

/// HTTP listener address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Interface to bind.
    pub host: String,
    /// TCP port. Falls back to `PORT` when no file sets it.
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
        }
    }
}

impl ServerSection {
    /// `host:port` for binding.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// AuthSection
// ---------------------------------------------------------------------------

/// Shared API key that registering services must present.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// The expected key. Prefer `PAUTHTATO_API_KEY` over a file.
    pub api_key: Option<String>,
}

impl std::fmt::Debug for AuthSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSection")
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl Serialize for AuthSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // The key itself is never written out.
        let mut state = serializer.serialize_struct("AuthSection", 1)?;
        state.serialize_field("has_api_key", &self.api_key.is_some())?;
        state.end()
    }
}

// ---------------------------------------------------------------------------
// LedgerSection
// ---------------------------------------------------------------------------

/// Which ledger store adapter backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackend {
    /// Process-local, lost on restart.
    #[default]
    Memory,
    /// One JSON record per block under [`LedgerSection::path`].
    File,
}

/// Ledger store and append behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    /// Store adapter.
    pub backend: LedgerBackend,
    /// Directory for the `file` backend.
    pub path: String,
    /// Compare-and-append retry policy.
    pub retry: RetrySection,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Memory,
            path: "./data/ledger".to_owned(),
            retry: RetrySection::default(),
        }
    }
}

/// Bounded retry with exponential backoff for lost append races.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff base in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 10,
            max_delay_ms: 200,
        }
    }
}

// ---------------------------------------------------------------------------
// TimeoutsSection
// ---------------------------------------------------------------------------

/// Timeout budgets. All values are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsSection {
    /// Budget for each individual ledger store call.
    pub store_ms: u64,
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self { store_ms: 5000 }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["pauthtato_ledger=debug",
    /// "tower_http=warn"]`).
    pub directives: Vec<String>,
    /// Where logs go: `"stderr"`, `"stdout"`, or `"file"`.
    pub target: String,
    /// Directory for daily-rotated log files when `target = "file"`.
    pub directory: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            target: "stderr".to_owned(),
            directory: "./logs".to_owned(),
        }
    }
}
