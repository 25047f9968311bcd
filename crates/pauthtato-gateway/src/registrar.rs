//! Registration orchestration.
//!
//! Checks the caller's API key and the requested service name, then hands a
//! fresh identity bundle to the chain appender. Nothing is generated or
//! written until both checks pass.

use std::sync::Arc;

use pauthtato_ledger::{Block, BundleGenerator, ChainAppender, IdentityBundle, LedgerStore};
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::error::RegistrationError;

/// Longest accepted service name, in characters.
pub const MAX_SERVICE_NAME_LEN: usize = 128;

/// Registers services on the ledger.
pub struct Registrar {
    api_key: String,
    generator: BundleGenerator,
    appender: ChainAppender,
}

impl Registrar {
    /// Create a registrar that accepts `api_key` and generates bundles from
    /// the OS random source.
    #[must_use]
    pub fn new(api_key: impl Into<String>, appender: ChainAppender) -> Self {
        Self {
            api_key: api_key.into(),
            generator: BundleGenerator::system(),
            appender,
        }
    }

    /// Use a different bundle generator.
    #[must_use]
    pub fn with_generator(mut self, generator: BundleGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// The store registrations are appended to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        self.appender.store()
    }

    /// Register `service_name` and return the committed block.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::Auth`] if `api_key` is missing or wrong
    /// - [`RegistrationError::Validation`] if `service_name` is missing or
    ///   malformed
    /// - [`RegistrationError::Conflict`] if the append race was lost on every
    ///   attempt
    /// - [`RegistrationError::Store`] or [`RegistrationError::Crypto`] on
    ///   infrastructure failure
    pub async fn register(
        &self,
        api_key: Option<&str>,
        service_name: Option<&str>,
    ) -> Result<Block, RegistrationError> {
        self.authorize(api_key)?;
        let service_name = validate_service_name(service_name)?;

        let bundle = self.generator.generate(service_name)?;
        let block = self.appender.append(&bundle, service_name).await?;

        info!(
            index = block.index,
            service = service_name,
            user_id = %block.data.user_id,
            "Service registered"
        );
        Ok(block)
    }

    /// Generate a bundle for `service_name` without recording it.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register), minus the append failures.
    pub fn preview_bundle(
        &self,
        api_key: Option<&str>,
        service_name: Option<&str>,
    ) -> Result<IdentityBundle, RegistrationError> {
        self.authorize(api_key)?;
        let service_name = validate_service_name(service_name)?;

        let bundle = self.generator.generate(service_name)?;
        debug!(service = service_name, "Bundle previewed");
        Ok(bundle)
    }

    fn authorize(&self, presented: Option<&str>) -> Result<(), RegistrationError> {
        let Some(presented) = presented else {
            return Err(RegistrationError::Auth);
        };
        if bool::from(presented.as_bytes().ct_eq(self.api_key.as_bytes())) {
            Ok(())
        } else {
            Err(RegistrationError::Auth)
        }
    }
}

impl std::fmt::Debug for Registrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar")
            .field("api_key", &"<redacted>")
            .field("appender", &self.appender)
            .finish_non_exhaustive()
    }
}

/// Trim and check a requested service name.
///
/// The name becomes the prefix of the bundle's `serviceID`, so it may not be
/// empty, overlong, or contain whitespace or control characters.
///
/// # Errors
///
/// Returns [`RegistrationError::Validation`] describing the first rule the
/// name breaks.
pub fn validate_service_name(name: Option<&str>) -> Result<&str, RegistrationError> {
    let name = name.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(RegistrationError::Validation(
            "serviceName is required".to_string(),
        ));
    }
    if name.chars().count() > MAX_SERVICE_NAME_LEN {
        return Err(RegistrationError::Validation(format!(
            "serviceName must be at most {MAX_SERVICE_NAME_LEN} characters"
        )));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RegistrationError::Validation(
            "serviceName must not contain whitespace or control characters".to_string(),
        ));
    }
    Ok(name)
}
