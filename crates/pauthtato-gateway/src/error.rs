//! Gateway error types.

use pauthtato_config::ConfigError;
use pauthtato_crypto::CryptoError;
use pauthtato_ledger::{LedgerError, StoreError};
use thiserror::Error;

/// Why a registration was refused or failed.
///
/// `Auth` and `Validation` are raised before anything is generated or
/// written.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The API key was missing or wrong.
    #[error("invalid API key")]
    Auth,

    /// The request was malformed.
    #[error("{0}")]
    Validation(String),

    /// Concurrent registrations kept winning the append race.
    #[error("registration conflict: chain head changed on all {attempts} attempts")]
    Conflict {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// The ledger store failed or timed out.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Identifier generation failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<LedgerError> for RegistrationError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Conflict { attempts } => Self::Conflict { attempts },
            LedgerError::Store(e) => Self::Store(e),
            LedgerError::Crypto(e) => Self::Crypto(e),
            LedgerError::IndexOverflow => {
                Self::Store(StoreError::Corrupt("block index overflow".to_string()))
            },
        }
    }
}

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `serve` needs a key to check registrations against.
    #[error("no API key configured (set PAUTHTATO_API_KEY or [auth] api_key)")]
    MissingApiKey,

    /// The ledger store could not be opened.
    #[error("failed to open ledger store: {0}")]
    Store(#[from] StoreError),

    /// The listener could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address that was requested.
        address: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The server loop failed.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Result type for gateway startup.
pub type GatewayResult<T> = Result<T, GatewayError>;
