//! Identity bundle generation.
//!
//! A bundle is the set of identifiers and key material handed to a service
//! when it registers. All randomness comes from an injectable
//! [`RandomSource`].

use std::sync::Arc;

use pauthtato_crypto::{CryptoResult, OsRandom, RandomSource, random_bytes};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};

/// Prefix of every generated `userID`.
pub const USER_ID_PREFIX: &str = "pauthtato";

/// Infix between the service name and the `serviceID` suffix.
const SERVICE_ID_INFIX: &str = "bundle";

/// Freshly generated identifiers for one registered service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityBundle {
    /// `pauthtato-<6 hex>`.
    #[serde(rename = "userID")]
    pub user_id: String,
    /// `<serviceName>-bundle-<6 hex>`.
    #[serde(rename = "serviceID")]
    pub service_id: String,
    /// Random (v4) UUID.
    pub uuid: Uuid,
    /// 256-bit random value, hex.
    pub public_key: String,
    /// 256-bit random value, hex.
    #[serde(rename = "obkupID")]
    pub obkup_id: String,
    /// Generation time in epoch milliseconds.
    pub timestamp: u64,
}

/// Produces [`IdentityBundle`]s.
#[derive(Clone)]
pub struct BundleGenerator {
    random: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
}

impl BundleGenerator {
    /// Create a generator over the given random source and clock.
    #[must_use]
    pub fn new(random: Arc<dyn RandomSource>, clock: Arc<dyn Clock>) -> Self {
        Self { random, clock }
    }

    /// Generator backed by the OS CSPRNG and the system clock.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(OsRandom), Arc::new(SystemClock))
    }

    /// Generate a bundle for `service_name`.
    ///
    /// The caller is responsible for validating `service_name`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::RandomUnavailable`](pauthtato_crypto::CryptoError::RandomUnavailable)
    /// if the random source fails.
    pub fn generate(&self, service_name: &str) -> CryptoResult<IdentityBundle> {
        let user_suffix: [u8; 3] = random_bytes(self.random.as_ref())?;
        let service_suffix: [u8; 3] = random_bytes(self.random.as_ref())?;
        let uuid_bytes: [u8; 16] = random_bytes(self.random.as_ref())?;
        let public_key: [u8; 32] = random_bytes(self.random.as_ref())?;
        let obkup_id: [u8; 32] = random_bytes(self.random.as_ref())?;

        Ok(IdentityBundle {
            user_id: format!("{USER_ID_PREFIX}-{}", hex::encode(user_suffix)),
            service_id: format!(
                "{service_name}-{SERVICE_ID_INFIX}-{}",
                hex::encode(service_suffix)
            ),
            uuid: uuid::Builder::from_random_bytes(uuid_bytes).into_uuid(),
            public_key: hex::encode(public_key),
            obkup_id: hex::encode(obkup_id),
            timestamp: self.clock.now_millis(),
        })
    }
}

impl std::fmt::Debug for BundleGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleGenerator").finish_non_exhaustive()
    }
}
