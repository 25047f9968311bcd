//! Pauthtato Gateway - Registration service for the identity ledger.
//!
//! This crate wires the ledger to the outside world:
//! - [`Registrar`] checks credentials and service names, then appends a fresh
//!   identity bundle to the chain
//! - [`server::create_router`] exposes registration and chain audit over HTTP
//! - [`config_bridge`] turns a loaded [`pauthtato_config::Config`] into a store,
//!   appender, and log configuration
//!
//! # Routes
//!
//! ```text
//! POST /register      {apiKey, serviceName} -> Block
//! POST /bundle        {apiKey, serviceName} -> IdentityBundle (not recorded)
//! GET  /chain         -> [Block]
//! GET  /chain/head    -> Block | null
//! GET  /chain/verify  -> ChainReport
//! GET  /health        -> {status}
//! GET  /version       -> {name, version}
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config_bridge;
pub mod error;
pub mod handlers;
pub mod registrar;
pub mod server;

pub use error::{GatewayError, GatewayResult, RegistrationError};
pub use handlers::{ApiError, AppState, ErrorResponse, RegisterRequest};
pub use registrar::{MAX_SERVICE_NAME_LEN, Registrar, validate_service_name};
pub use server::{create_router, run};
