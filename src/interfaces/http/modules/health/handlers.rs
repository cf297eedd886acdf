//! Liveness handlers

use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::interfaces::http::common::ErrorResponse;
use crate::interfaces::http::middleware::AuthenticatedUser;

/// Fixed acknowledgement plus server time.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
    /// Server time in Unix milliseconds
    pub t: i64,
}

impl HealthResponse {
    fn now() -> Self {
        Self {
            ok: true,
            t: Utc::now().timestamp_millis(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Process is reachable", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::now())
}

/// Same acknowledgement as `/health`, but behind the bearer middleware;
/// handy for checking that a token is accepted.
#[utoipa::path(
    get,
    path = "/protected/ping",
    tag = "Health",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Token accepted", body = HealthResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn protected_ping(_user: AuthenticatedUser) -> Json<HealthResponse> {
    Json(HealthResponse::now())
}
