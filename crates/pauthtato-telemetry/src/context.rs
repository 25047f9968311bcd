//! Request context for correlating log lines of one HTTP call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-request identity carried through a handler.
///
/// Handlers run their work inside [`span`](Self::span) so every event the
/// ledger emits during a registration carries the same `request_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: Uuid,
    /// When the request started.
    pub started_at: DateTime<Utc>,
    /// Route or component that created this context.
    pub source: String,
    /// Operation being performed.
    pub operation: Option<String>,
    /// Service named in the request body, once known.
    pub service_name: Option<String>,
}

impl RequestContext {
    /// Create a new request context.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
            service_name: None,
        }
    }

    /// Reuse a caller-supplied request ID.
    #[must_use]
    pub fn with_request_id(mut self, id: Uuid) -> Self {
        self.request_id = id;
        self
    }

    /// Adopt the ID from an `x-request-id` header value if it is a UUID.
    #[must_use]
    pub fn with_request_id_header(self, header: Option<&str>) -> Self {
        match header.and_then(|h| Uuid::parse_str(h.trim()).ok()) {
            Some(id) => self.with_request_id(id),
            None => self,
        }
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Record the service the request is about.
    #[must_use]
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    /// Milliseconds since the request started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// Create a tracing span with this context.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            source = %self.source,
            operation = self.operation.as_deref(),
            service = self.service_name.as_deref(),
        )
    }

    /// First eight characters of the request ID.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.request_id.simple().to_string().chars().take(8).collect()
    }

    /// Log the outcome of the request.
    pub fn finish(&self, status: u16) {
        let elapsed_ms = self.elapsed_ms();
        if status >= 500 {
            tracing::error!(request_id = %self.request_id, status, elapsed_ms, "Request failed");
        } else if status >= 400 {
            tracing::warn!(request_id = %self.request_id, status, elapsed_ms, "Request rejected");
        } else {
            tracing::debug!(request_id = %self.request_id, status, elapsed_ms, "Request completed");
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}
