use serde::Serialize;
use utoipa::ToSchema;

/// Coarse service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    /// No usable storage backend; storage-backed routes answer 503.
    Degraded,
}

/// Payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Whether snippet generation has a completion service configured.
    pub generation_enabled: bool,
}
