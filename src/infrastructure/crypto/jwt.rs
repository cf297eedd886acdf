//! JWT token handling
//!
//! Access tokens are HS256 JWS compact strings. Each one carries the
//! subject, username and roles of the authenticated user, plus a fixed
//! audience and issuer that stop tokens minted for another service from
//! validating here.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::User;
use crate::shared::{AppError, AppResult, AuthError};

/// Audience embedded in and required of every token.
pub const TOKEN_AUDIENCE: &str = "utas-coursemate";
/// Issuer embedded in and required of every token.
pub const TOKEN_ISSUER: &str = "auth-service";
/// Default lifetime of an access token (15 minutes).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);
/// Longest accepted token lifetime (30 days).
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

const ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// How long an issued token stays valid
    pub ttl: Duration,
    /// Issuer claim
    pub issuer: String,
    /// Audience claim
    pub audience: String,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl: DEFAULT_TOKEN_TTL,
            issuer: TOKEN_ISSUER.to_string(),
            audience: TOKEN_AUDIENCE.to_string(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    /// Token lifetime in whole seconds, as reported in `expires_in`.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs()
    }

    /// Short SHA-256 prefix of the secret, safe to log for telling
    /// deployments apart.
    pub fn secret_fingerprint(&self) -> String {
        let digest = Sha256::digest(self.secret.as_bytes());
        hex::encode(&digest[..6])
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

/// Identity facts a token is minted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimsInput {
    pub subject: String,
    pub username: String,
    pub roles: BTreeSet<String>,
}

impl From<&User> for ClaimsInput {
    fn from(user: &User) -> Self {
        Self {
            subject: user.id.clone(),
            username: user.username.clone(),
            roles: user.roles.clone(),
        }
    }
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    pub roles: Vec<String>,
    pub aud: String,
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl TokenClaims {
    /// Build claims for `input` as of `now`. The output depends only on
    /// the input, the config and `now`. `None` when `exp` would not fit in
    /// a timestamp.
    pub fn new(input: &ClaimsInput, config: &JwtConfig, now: DateTime<Utc>) -> Option<Self> {
        let iat = now.timestamp();
        let exp = i64::try_from(config.ttl.as_secs())
            .ok()
            .and_then(|ttl| iat.checked_add(ttl))?;

        Some(Self {
            sub: input.subject.clone(),
            username: input.username.clone(),
            roles: input.roles.iter().cloned().collect(),
            aud: config.audience.clone(),
            iss: config.issuer.clone(),
            iat,
            exp,
        })
    }

    /// A token is valid strictly before `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: u64,
    pub claims: TokenClaims,
}

/// Issues and verifies access tokens with a fixed key and policy.
#[derive(Clone)]
pub struct TokenService {
    config: Arc<JwtConfig>,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl TokenService {
    pub fn new(config: JwtConfig) -> AppResult<Self> {
        if config.secret.is_empty() {
            return Err(AppError::internal("JWT secret is empty"));
        }
        if config.ttl.as_secs() == 0 {
            return Err(AppError::internal("token lifetime must be at least one second"));
        }
        if config.ttl > MAX_TOKEN_TTL {
            return Err(AppError::internal(format!(
                "token lifetime {}s exceeds the {}s maximum",
                config.ttl.as_secs(),
                MAX_TOKEN_TTL.as_secs()
            )));
        }

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        // Expiry is checked by hand in `verify_at` so that the boundary is
        // strict and the clock can be supplied by the caller.
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_audience(&[&config.audience]);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);

        Ok(Self {
            config: Arc::new(config),
            encoding_key: Arc::new(encoding_key),
            decoding_key: Arc::new(decoding_key),
            validation: Arc::new(validation),
        })
    }

    /// Create a token for `input`, valid from now for the configured TTL.
    pub fn issue(&self, input: &ClaimsInput) -> AppResult<IssuedToken> {
        self.issue_at(input, Utc::now())
    }

    pub fn issue_at(&self, input: &ClaimsInput, now: DateTime<Utc>) -> AppResult<IssuedToken> {
        let claims = TokenClaims::new(input, &self.config, now)
            .ok_or_else(|| AppError::internal("token expiry overflows the timestamp range"))?;
        let access_token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            access_token,
            expires_in: self.config.ttl_secs(),
            claims,
        })
    }

    /// Check structure, signature, audience/issuer and expiry, in that
    /// order, and return the embedded claims untouched.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, AuthError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(map_jwt_error)?;

        if data.claims.is_expired_at(now) {
            return Err(AuthError::Expired);
        }

        Ok(data.claims)
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidAudience => AuthError::InvalidToken("audience mismatch".into()),
        ErrorKind::InvalidIssuer => AuthError::InvalidToken("issuer mismatch".into()),
        ErrorKind::InvalidAlgorithm => AuthError::InvalidToken("unexpected algorithm".into()),
        ErrorKind::MissingRequiredClaim(claim) => {
            AuthError::InvalidToken(format!("missing claim `{}`", claim))
        }
        _ => AuthError::MalformedToken(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::Duration as ChronoDuration;

    fn service() -> TokenService {
        TokenService::new(JwtConfig::new("test-secret")).unwrap()
    }

    fn input() -> ClaimsInput {
        ClaimsInput {
            subject: "u1".into(),
            username: "user".into(),
            roles: ["student".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn test_create_and_verify_token() {
        let service = service();
        let issued = service.issue(&input()).unwrap();

        let claims = service.verify(&issued.access_token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.username, "user");
        assert_eq!(claims.roles, vec!["student"]);
        assert_eq!(claims.aud, TOKEN_AUDIENCE);
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(issued.expires_in, 900);
        assert_eq!(claims, issued.claims);
    }

    #[test]
    fn test_invalid_token() {
        let result = service().verify("invalid-token");
        assert!(matches!(result, Err(AuthError::MalformedToken(_))));
    }

    #[test]
    fn same_inputs_produce_identical_tokens() {
        let service = service();
        let now = Utc::now();
        let a = service.issue_at(&input(), now).unwrap();
        let b = service.issue_at(&input(), now).unwrap();
        assert_eq!(a.access_token, b.access_token);
    }

    #[test]
    fn claims_segment_has_expected_fields() {
        let issued = service().issue(&input()).unwrap();
        let payload = issued.access_token.split('.').nth(1).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        assert_eq!(json["sub"], "u1");
        assert_eq!(json["aud"], "utas-coursemate");
        assert_eq!(json["iss"], "auth-service");
        assert_eq!(json["roles"], serde_json::json!(["student"]));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let service = service();
        let token = service.issue(&input()).unwrap().access_token;
        let sig_start = token.rfind('.').unwrap() + 1;

        let mut bytes = token.into_bytes();
        bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert_eq!(service.verify(&tampered), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let other = TokenService::new(JwtConfig::new("another-secret")).unwrap();
        let token = other.issue(&input()).unwrap().access_token;
        assert_eq!(service().verify(&token), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn foreign_audience_is_rejected() {
        let other =
            TokenService::new(JwtConfig::new("test-secret").with_audience("another-app")).unwrap();
        let token = other.issue(&input()).unwrap().access_token;
        assert!(matches!(service().verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let other =
            TokenService::new(JwtConfig::new("test-secret").with_issuer("someone-else")).unwrap();
        let token = other.issue(&input()).unwrap().access_token;
        assert!(matches!(service().verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn token_expires_exactly_at_ttl() {
        let service = service();
        let issued_at = Utc::now();
        let token = service.issue_at(&input(), issued_at).unwrap().access_token;

        let just_before = issued_at + ChronoDuration::seconds(899);
        let at_expiry = issued_at + ChronoDuration::seconds(900);
        assert!(service.verify_at(&token, just_before).is_ok());
        assert_eq!(service.verify_at(&token, at_expiry), Err(AuthError::Expired));
    }

    #[test]
    fn token_issued_in_the_past_is_expired_now() {
        let service = service();
        let long_ago = Utc::now() - ChronoDuration::seconds(901);
        let token = service.issue_at(&input(), long_ago).unwrap().access_token;
        assert_eq!(service.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn verify_is_repeatable() {
        let service = service();
        let token = service.issue(&input()).unwrap().access_token;
        let first = service.verify(&token).unwrap();
        let second = service.verify(&token).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn custom_ttl_is_reported() {
        let service =
            TokenService::new(JwtConfig::new("test-secret").with_ttl(Duration::from_secs(60)))
                .unwrap();
        let issued = service.issue(&input()).unwrap();
        assert_eq!(issued.expires_in, 60);
        assert_eq!(issued.claims.exp - issued.claims.iat, 60);
    }

    #[test]
    fn oversized_ttl_is_refused() {
        for secs in [MAX_TOKEN_TTL.as_secs() + 1, i64::MAX as u64, u64::MAX] {
            let config = JwtConfig::new("test-secret").with_ttl(Duration::from_secs(secs));
            assert!(TokenService::new(config).is_err(), "accepted {}s", secs);
        }

        let longest = JwtConfig::new("test-secret").with_ttl(MAX_TOKEN_TTL);
        let service = TokenService::new(longest).unwrap();
        let issued = service.issue(&input()).unwrap();
        assert!(service.verify(&issued.access_token).is_ok());
    }

    #[test]
    fn expiry_past_timestamp_range_is_not_computed() {
        let config = JwtConfig::new("test-secret").with_ttl(Duration::from_secs(u64::MAX));
        assert!(TokenClaims::new(&input(), &config, Utc::now()).is_none());

        let config = JwtConfig::new("test-secret").with_ttl(Duration::from_secs(i64::MAX as u64));
        assert!(TokenClaims::new(&input(), &config, Utc::now()).is_none());
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(TokenService::new(JwtConfig::new("")).is_err());
    }

    #[test]
    fn debug_and_fingerprint_hide_secret() {
        let config = JwtConfig::new("test-secret");
        assert!(!format!("{:?}", config).contains("test-secret"));
        assert_eq!(config.secret_fingerprint().len(), 12);
        assert_ne!(
            config.secret_fingerprint(),
            JwtConfig::new("other").secret_fingerprint()
        );
    }
}
