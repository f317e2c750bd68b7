use axum::Json;

use crate::models::HealthResponse;

/// GET / - Liveness probe.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "API is running".to_string(),
    })
}
