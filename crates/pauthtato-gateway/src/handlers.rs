//! Pauthtato REST API Handlers
//!
//! Registration, chain audit, and service status endpoints.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use pauthtato_ledger::{
    Block, ChainReport, IdentityBundle, LedgerError, LedgerStore, StoreError, StoreResult,
};
use pauthtato_telemetry::RequestContext;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, warn};

use crate::error::RegistrationError;
use crate::registrar::Registrar;

/// Header a caller may use to supply its own request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// ==================== API Types ====================

/// Body of `POST /register` and `POST /bundle`.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Shared API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Service to register. `service` is accepted too.
    #[serde(default, alias = "service")]
    pub service_name: Option<String>,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("has_api_key", &self.api_key.is_some())
            .field("service_name", &self.service_name)
            .finish()
    }
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// What went wrong.
    pub error: String,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the service answers.
    pub status: String,
}

/// Body of `GET /version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
}

/// Shared application state
#[derive(Debug)]
pub struct AppState {
    /// Registration orchestrator.
    pub registrar: Registrar,
    /// Budget for read-only store calls.
    pub store_timeout: Duration,
}

impl AppState {
    /// Bundle a registrar with the timeout used for audit reads.
    #[must_use]
    pub fn new(registrar: Registrar, store_timeout: Duration) -> Self {
        Self {
            registrar,
            store_timeout,
        }
    }

    fn store(&self) -> &dyn LedgerStore {
        self.registrar.store().as_ref()
    }

    /// Run a store read under the configured timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation,
                millis: u64::try_from(self.store_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

// ==================== Error Handling ====================

/// An error status with a JSON `{ "error": … }` body.
#[derive(Debug)]
pub struct ApiError(pub StatusCode, pub Json<ErrorResponse>);

impl ApiError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        ApiError(status, Json(ErrorResponse { error: msg.into() }))
    }

    /// 400 Bad Request.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// 401 Unauthorized.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    /// 404 Not Found.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// 405 Method Not Allowed.
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }

    /// 409 Conflict.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    /// 500 Internal Server Error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// The response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.0
    }
}

impl From<RegistrationError> for ApiError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::Auth => ApiError::unauthorized(e.to_string()),
            RegistrationError::Validation(msg) => ApiError::bad_request(msg),
            RegistrationError::Conflict { .. } => ApiError::conflict(e.to_string()),
            RegistrationError::Store(ref inner) => {
                error!(error = %inner, "Ledger store failure");
                ApiError::internal("ledger store unavailable")
            },
            RegistrationError::Crypto(ref inner) => {
                error!(error = %inner, "Identifier generation failure");
                ApiError::internal("identifier generation failed")
            },
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        RegistrationError::Store(e).into()
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        RegistrationError::from(e).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// Build the request context for `source`, honouring `x-request-id`.
fn request_context(source: &str, headers: &HeaderMap) -> RequestContext {
    RequestContext::new(source).with_request_id_header(
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    )
}

/// Run `work` inside the request span and log its outcome.
async fn traced<T>(
    ctx: RequestContext,
    work: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    let result = work.instrument(ctx.span()).await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status(),
    };
    ctx.finish(status.as_u16());
    result
}

// ==================== Status ====================

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// `GET /version`
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Any unsupported method on a known route.
pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

/// Any unknown route.
pub async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}

// ==================== Registration ====================

/// `POST /register`: record a new identity bundle on the chain.
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<Block>, ApiError> {
    let mut ctx = request_context("register", &headers).with_operation("append");
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return traced(ctx, std::future::ready(Err(ApiError::from(rejection)))).await;
        },
    };
    if let Some(name) = request.service_name.as_deref() {
        ctx = ctx.with_service_name(name.trim());
    }

    traced(ctx, async {
        let block = state
            .registrar
            .register(request.api_key.as_deref(), request.service_name.as_deref())
            .await?;
        Ok(Json(block))
    })
    .await
}

/// `POST /bundle`: generate a bundle without recording it.
pub async fn preview_bundle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<IdentityBundle>, ApiError> {
    let ctx = request_context("bundle", &headers).with_operation("preview");
    traced(ctx, async {
        let Json(request) = body?;
        let bundle = state
            .registrar
            .preview_bundle(request.api_key.as_deref(), request.service_name.as_deref())?;
        Ok(Json(bundle))
    })
    .await
}

// ==================== Chain Audit ====================

/// `GET /chain`: every block in index order.
pub async fn chain(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Block>>, ApiError> {
    let ctx = request_context("chain", &headers).with_operation("read_all");
    traced(ctx, async {
        let blocks = state.bounded("read_all", state.store().read_all()).await?;
        Ok(Json(blocks))
    })
    .await
}

/// `GET /chain/head`: the latest block, or `null`.
pub async fn chain_head(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Option<Block>>, ApiError> {
    let ctx = request_context("chain", &headers).with_operation("read_head");
    traced(ctx, async {
        let head = state
            .bounded("read_head", state.store().read_head())
            .await?;
        Ok(Json(head))
    })
    .await
}

/// `GET /chain/verify`: verify the stored chain.
///
/// Integrity failures are reported in the body with status 200; only an
/// unreadable store is an error.
pub async fn chain_verify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ChainReport>, ApiError> {
    let ctx = request_context("chain", &headers).with_operation("verify");
    traced(ctx, async {
        let blocks = state.bounded("read_all", state.store().read_all()).await?;
        let report = ChainReport::from_blocks(&blocks);
        if let Some(v) = &report.violation {
            warn!(index = v.index, kind = %v.kind, "Chain verification failed");
        }
        Ok(Json(report))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_accepts_service_alias() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"apiKey":"k","service":"acme"}"#).unwrap();
        assert_eq!(req.api_key.as_deref(), Some("k"));
        assert_eq!(req.service_name.as_deref(), Some("acme"));

        let req: RegisterRequest = serde_json::from_str(r#"{"serviceName":"acme"}"#).unwrap();
        assert!(req.api_key.is_none());
        assert_eq!(req.service_name.as_deref(), Some("acme"));
    }

    #[test]
    fn test_register_request_debug_hides_key() {
        let req = RegisterRequest {
            api_key: Some("super-secret".to_string()),
            service_name: Some("acme".to_string()),
        };
        assert!(!format!("{req:?}").contains("super-secret"));
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (RegistrationError::Auth, StatusCode::UNAUTHORIZED),
            (
                RegistrationError::Validation("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                RegistrationError::Conflict { attempts: 5 },
                StatusCode::CONFLICT,
            ),
            (
                RegistrationError::Store(StoreError::Io("disk".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_store_errors_are_not_leaked() {
        let ApiError(status, Json(body)) =
            ApiError::from(StoreError::Io("/var/secret/path".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.contains("/var/secret/path"));
    }
}
