use tracing::warn;

use crate::{
    dto::health::{HealthResponse, HealthStatus},
    state::SharedState,
};

/// Probe the storage backend and report whether the service is degraded.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.content_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    let status = if state.is_degraded() {
        HealthStatus::Degraded
    } else {
        HealthStatus::Ok
    };

    HealthResponse {
        status,
        generation_enabled: state.completion().is_ok(),
    }
}
