//! Authentication service (application-layer orchestration)
//!
//! Login and token verification live here. HTTP handlers and middleware
//! are thin wrappers that delegate to this service.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::CredentialStore;
use crate::infrastructure::crypto::jwt::{ClaimsInput, IssuedToken, TokenClaims, TokenService};
use crate::infrastructure::crypto::password::{dummy_hash, verify_password_blocking};
use crate::shared::{AppError, AppResult, AuthError, CredentialFailure};

/// Checks credentials and mints/validates tokens.
///
/// The store sits behind `dyn CredentialStore` so a persistent backend can
/// replace the in-memory one without touching token handling.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    tokens: TokenService,
    dummy_hash: Arc<str>,
}

impl AuthService {
    /// `bcrypt_cost` should match the cost of the stored hashes so the
    /// unknown-user path takes as long as a real comparison.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: TokenService,
        bcrypt_cost: u32,
    ) -> AppResult<Self> {
        let dummy = dummy_hash(bcrypt_cost)
            .map_err(|e| AppError::internal(format!("failed to prepare dummy hash: {}", e)))?;

        Ok(Self {
            store,
            tokens,
            dummy_hash: Arc::from(dummy),
        })
    }

    // ── Authentication ──────────────────────────────────────────

    /// Authenticate by username + password and return a signed token.
    ///
    /// Unknown user and wrong password both surface as
    /// `AuthError::InvalidCredentials`; only the logs tell them apart.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<IssuedToken> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::Validation("username/password required".into()));
        }

        let user = self.store.find_by_username(username).await?;

        let Some(user) = user else {
            // Result ignored: only the elapsed time matters here.
            let _ = verify_password_blocking(password.to_owned(), self.dummy_hash.to_string()).await;
            return Err(reject(username, CredentialFailure::UnknownUser));
        };

        let valid = verify_password_blocking(password.to_owned(), user.password_hash.clone())
            .await
            .inspect_err(|_| record_login("error"))?;
        if !valid {
            return Err(reject(username, CredentialFailure::WrongPassword));
        }

        let issued = self
            .tokens
            .issue(&ClaimsInput::from(&user))
            .inspect_err(|_| record_login("error"))?;

        record_login("success");
        info!(user_id = %user.id, username = %user.username, "Login succeeded");
        Ok(issued)
    }

    // ── Token verification ──────────────────────────────────────

    /// Verify a presented token. The returned error keeps the precise
    /// failure reason for diagnostics.
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        match self.tokens.verify(token) {
            Ok(claims) => {
                metrics::counter!("auth_token_verify_total", "outcome" => "valid").increment(1);
                Ok(claims)
            }
            Err(err) => {
                metrics::counter!("auth_token_verify_total", "outcome" => err.kind())
                    .increment(1);
                debug!(reason = err.kind(), detail = %err, "Token rejected");
                Err(err)
            }
        }
    }
}

fn reject(username: &str, failure: CredentialFailure) -> AppError {
    record_login(failure.as_str());
    warn!(username = %username, reason = failure.as_str(), "Login rejected");
    AuthError::InvalidCredentials(failure).into()
}

fn record_login(outcome: &'static str) {
    metrics::counter!("auth_login_total", "outcome" => outcome).increment(1);
}
