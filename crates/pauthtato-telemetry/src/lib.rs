//! Pauthtato Telemetry - Logging and request tracing for the identity ledger
//! service.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and targets
//! - Request context for correlating the log lines of one HTTP call
//!
//! # Example
//!
//! ```rust,no_run
//! use pauthtato_telemetry::{LogConfig, LogFormat, RequestContext, setup_logging};
//!
//! # fn main() -> Result<(), pauthtato_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Json)
//!     .with_directive("pauthtato_ledger=trace");
//!
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("register").with_service_name("acme");
//! let span = ctx.span();
//! let _guard = span.enter();
//! tracing::info!("Registering");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::RequestContext;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_logging};
