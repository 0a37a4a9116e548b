//! Axum route handlers for all API endpoints.

pub mod analytics;
pub mod events;
pub mod optimizations;
pub mod pricing;
pub mod projects;

use crate::api::models::projects::HealthResponse;
use axum::response::Json;
use chrono::Utc;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse),
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}
