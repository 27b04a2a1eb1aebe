//! HTTP request handlers

use crate::api::server::AppContext;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use snowlander_common::events::StatusView;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: String,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "snowlander-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /status - current snapshot, the same payload `status_update` carries
pub async fn status(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusView>, (StatusCode, Json<ErrorResponse>)> {
    match ctx.player.current_snapshot().await {
        Ok(view) => Ok(Json(view)),
        Err(e) => {
            error!("Failed to build status snapshot: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}
