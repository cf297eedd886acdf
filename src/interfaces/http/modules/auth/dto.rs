//! Authentication DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::infrastructure::crypto::jwt::IssuedToken;
use crate::interfaces::http::common::RequestBody;
use crate::interfaces::http::middleware::AuthenticatedUser;

// Absent fields deserialize as empty strings so they fail validation with
// the same message as empty ones.
#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "username/password required"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "username/password required"))]
    pub password: String,
}

impl RequestBody for LoginRequest {
    const UNREADABLE_MESSAGE: &'static str = "username/password required";
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: u64,
}

impl From<IssuedToken> for LoginResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            access_token: issued.access_token,
            token_type: "Bearer".to_string(),
            expires_in: issued.expires_in,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct IdentityResponse {
    pub id: String,
    pub username: String,
    pub roles: Vec<String>,
}

impl From<AuthenticatedUser> for IdentityResponse {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            id: user.user_id,
            username: user.username,
            roles: user.roles,
        }
    }
}
