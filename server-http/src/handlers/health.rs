use crate::api::responses::{HealthResponse, STATUS_GOOD};
use axum::Json;

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: STATUS_GOOD,
    })
}
