use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::{instrument, warn};

use crate::app::AppState;

/// Health check endpoint handler. The cache is reported but never fails the check;
/// the catalog degrades to direct store reads without it.
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let cache_status = match state.cache.health_check().await {
        Ok(true) => "healthy",
        Ok(false) => "unhealthy",
        Err(e) => {
            warn!(error = %e, "Cache health check failed");
            "unreachable"
        }
    };

    Ok(Json(json!({
        "status": "healthy",
        "service": state.service_name.as_ref(),
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.storage_backend_name(),
        "cache": {
            "provider": state.cache.provider_name(),
            "status": cache_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
