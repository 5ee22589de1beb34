use serde::Serialize;
use utoipa::ToSchema;

/// Liveness report returned by `/healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" when an event store is installed, "degraded" otherwise.
    pub status: &'static str,
    /// Crate version serving the request.
    pub version: &'static str,
}

impl HealthResponse {
    fn with_status(status: &'static str) -> Self {
        Self {
            status,
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Storage is reachable.
    pub fn ok() -> Self {
        Self::with_status("ok")
    }

    /// No storage backend is installed.
    pub fn degraded() -> Self {
        Self::with_status("degraded")
    }

    /// Whether the report describes a usable backend.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
