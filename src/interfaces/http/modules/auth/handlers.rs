//! Authentication API handlers

use axum::{extract::State, Json};

use super::dto::{IdentityResponse, LoginRequest, LoginResponse};
use crate::application::AuthService;
use crate::interfaces::http::common::{ErrorResponse, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::shared::AppError;

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = LoginResponse),
        (status = 400, description = "Missing username or password", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    )
)]
pub async fn login(
    State(auth): State<AuthService>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let issued = auth.login(&request.username, &request.password).await?;
    Ok(Json(issued.into()))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user identity", body = IdentityResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn get_current_user(user: AuthenticatedUser) -> Json<IdentityResponse> {
    Json(user.into())
}
