//! Configuration module
//!
//! Settings come from an optional TOML file, then environment variables
//! override individual fields. The file lives at
//! `~/.config/coursemate-auth/config.toml` unless another path is given.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 3000
//!
//! [security]
//! jwt_secret = "change-me-to-32-random-bytes......"
//! token_ttl_secs = 900
//! bcrypt_cost = 10
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [[users]]
//! id = "u1"
//! username = "user"
//! password_hash = "$2b$10$..."
//! roles = ["student"]
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::User;
use crate::infrastructure::crypto::jwt::{JwtConfig, MAX_TOKEN_TTL};
use crate::infrastructure::crypto::password::{hash_password, DEFAULT_BCRYPT_COST};

/// Signing secret used only when development mode is explicitly enabled.
pub const DEV_FALLBACK_SECRET: &str = "dev-secret";

const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;
const RECOMMENDED_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("JWT_SECRET is not set; refusing to start outside development mode")]
    MissingSecret,
}

/// Default config file location (`~/.config/coursemate-auth/config.toml`).
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coursemate-auth")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub users: Vec<UserSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            shutdown_timeout: 10,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: u64,
    pub bcrypt_cost: u32,
    /// Enables the insecure fallback secret and plaintext seed passwords.
    pub development_mode: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: 900,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            development_mode: false,
        }
    }
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("development_mode", &self.development_mode)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// A user entry for the credential store.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSeed {
    pub id: String,
    pub username: String,
    pub password_hash: Option<String>,
    /// Plaintext, development mode only
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub roles: Vec<String>,
}

impl fmt::Debug for UserSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSeed")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "<redacted>"))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("roles", &self.roles)
            .finish()
    }
}

impl AppConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT `{}` is not a port", port)))?;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.security.jwt_secret = Some(secret);
        }
        if let Some(ttl) = lookup("JWT_EXPIRES_IN") {
            self.security.token_ttl_secs = parse_duration(&ttl)?.as_secs();
        }
        if let Some(cost) = lookup("BCRYPT_COST") {
            self.security.bcrypt_cost = cost
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("BCRYPT_COST `{}` is not a number", cost)))?;
        }
        if let Some(flag) = lookup("AUTH_DEV_MODE") {
            self.security.development_mode = parse_flag(&flag)?;
        }
        Ok(())
    }

    /// Reject configurations the service must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let security = &self.security;

        match security.jwt_secret.as_deref() {
            Some("") => return Err(ConfigError::Invalid("JWT secret is empty".into())),
            None if !security.development_mode => return Err(ConfigError::MissingSecret),
            _ => {}
        }
        if security.token_ttl_secs == 0 {
            return Err(ConfigError::Invalid("token lifetime must be positive".into()));
        }
        if security.token_ttl_secs > MAX_TOKEN_TTL.as_secs() {
            return Err(ConfigError::Invalid(format!(
                "token lifetime {}s exceeds the {}s maximum",
                security.token_ttl_secs,
                MAX_TOKEN_TTL.as_secs()
            )));
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&security.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "bcrypt cost {} outside {}..={}",
                security.bcrypt_cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
            )));
        }

        for seed in &self.users {
            if seed.id.is_empty() || seed.username.is_empty() {
                return Err(ConfigError::Invalid("user entries need an id and a username".into()));
            }
            match (&seed.password_hash, &seed.password) {
                (Some(hash), _) if !hash.starts_with("$2") => {
                    return Err(ConfigError::Invalid(format!(
                        "password_hash for `{}` is not a bcrypt hash",
                        seed.username
                    )));
                }
                (Some(_), _) => {}
                (None, Some(_)) if security.development_mode => {}
                (None, Some(_)) => {
                    return Err(ConfigError::Invalid(format!(
                        "plaintext password for `{}` is only accepted in development mode",
                        seed.username
                    )));
                }
                (None, None) => {
                    return Err(ConfigError::Invalid(format!(
                        "user `{}` has no password_hash",
                        seed.username
                    )));
                }
            }
        }
        Ok(())
    }

    /// Token settings, resolving the development fallback secret when
    /// (and only when) development mode is on.
    pub fn jwt_config(&self) -> Result<JwtConfig, ConfigError> {
        let secret = match &self.security.jwt_secret {
            Some(secret) if !secret.is_empty() => secret.clone(),
            Some(_) => return Err(ConfigError::Invalid("JWT secret is empty".into())),
            None if self.security.development_mode => {
                warn!("JWT_SECRET not set: using the INSECURE development secret. Never deploy like this.");
                DEV_FALLBACK_SECRET.to_string()
            }
            None => return Err(ConfigError::MissingSecret),
        };
        if secret.len() < RECOMMENDED_SECRET_LEN {
            warn!(
                "JWT secret is shorter than recommended ({} bytes)",
                RECOMMENDED_SECRET_LEN
            );
        }

        Ok(JwtConfig::new(secret).with_ttl(Duration::from_secs(self.security.token_ttl_secs)))
    }

    /// Turn the configured seeds into user records, hashing plaintext
    /// development passwords. Blocks on bcrypt; call off the async runtime.
    pub fn build_users(&self) -> Result<Vec<User>, ConfigError> {
        if self.users.is_empty() {
            if self.security.development_mode {
                warn!("No users configured: seeding the demo account `user` (development mode)");
                return Ok(vec![self.demo_user()?]);
            }
            warn!("No users configured: every login will be rejected");
            return Ok(Vec::new());
        }

        self.users
            .iter()
            .map(|seed| {
                let hash = match (&seed.password_hash, &seed.password) {
                    (Some(hash), _) => hash.clone(),
                    (None, Some(plain)) if self.security.development_mode => {
                        self.hash(plain)?
                    }
                    _ => {
                        return Err(ConfigError::Invalid(format!(
                            "user `{}` has no usable password",
                            seed.username
                        )))
                    }
                };
                Ok(User::new(&seed.id, &seed.username, hash, seed.roles.clone()))
            })
            .collect()
    }

    fn demo_user(&self) -> Result<User, ConfigError> {
        Ok(User::new("u1", "user", self.hash("pass123")?, ["student"]))
    }

    fn hash(&self, plain: &str) -> Result<String, ConfigError> {
        hash_password(plain, self.security.bcrypt_cost)
            .map_err(|e| ConfigError::Invalid(format!("failed to hash seed password: {}", e)))
    }
}

/// Parse `900`, `900s`, `15m`, `1h` or `1d`.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    let invalid = || ConfigError::Invalid(format!("`{}` is not a duration", value));

    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let amount: u64 = digits.parse().map_err(|_| invalid())?;

    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return Err(invalid()),
    };

    let secs = amount.checked_mul(multiplier).ok_or_else(invalid)?;
    if secs == 0 {
        return Err(ConfigError::Invalid("duration must be positive".into()));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_flag(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::Invalid(format!("`{}` is not a boolean", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn dev_config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.security.development_mode = true;
        cfg.security.bcrypt_cost = 4;
        cfg
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("900").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("2d").unwrap(), Duration::from_secs(172_800));
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("15 minutes").is_err());
        assert!(parse_duration("m").is_err());
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut cfg = AppConfig::default();
        cfg.apply_overrides_from(env(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("JWT_SECRET", "from-env"),
            ("JWT_EXPIRES_IN", "5m"),
            ("AUTH_DEV_MODE", "false"),
        ]))
        .unwrap();

        assert_eq!(cfg.server.address(), "127.0.0.1:8080");
        assert_eq!(cfg.security.jwt_secret.as_deref(), Some("from-env"));
        assert_eq!(cfg.security.token_ttl_secs, 300);
        assert!(!cfg.security.development_mode);
    }

    #[test]
    fn oversized_token_lifetime_is_rejected() {
        for ttl in ["9223372036854775807", "31d"] {
            let mut cfg = dev_config();
            cfg.apply_overrides_from(env(&[("JWT_EXPIRES_IN", ttl)])).unwrap();
            assert!(
                matches!(cfg.validate(), Err(ConfigError::Invalid(_))),
                "accepted JWT_EXPIRES_IN={}",
                ttl
            );
        }

        let mut cfg = dev_config();
        cfg.apply_overrides_from(env(&[("JWT_EXPIRES_IN", "30d")])).unwrap();
        cfg.validate().unwrap();
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut cfg = AppConfig::default();
        assert!(cfg.apply_overrides_from(env(&[("PORT", "http")])).is_err());
    }

    #[test]
    fn missing_secret_is_fatal_outside_dev_mode() {
        let cfg = AppConfig::default();
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingSecret)));
        assert!(matches!(cfg.jwt_config(), Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn dev_mode_falls_back_to_insecure_secret() {
        let cfg = dev_config();
        cfg.validate().unwrap();
        let jwt = cfg.jwt_config().unwrap();
        assert_eq!(jwt.secret, DEV_FALLBACK_SECRET);
        assert_eq!(jwt.ttl_secs(), 900);
    }

    #[test]
    fn empty_secret_is_rejected_even_in_dev_mode() {
        let mut cfg = dev_config();
        cfg.security.jwt_secret = Some(String::new());
        assert!(cfg.validate().is_err());
        assert!(cfg.jwt_config().is_err());
    }

    #[test]
    fn plaintext_seed_passwords_need_dev_mode() {
        let mut cfg = AppConfig::default();
        cfg.security.jwt_secret = Some("s".repeat(32));
        cfg.users.push(UserSeed {
            id: "u9".into(),
            username: "plain".into(),
            password: Some("hunter2".into()),
            roles: vec!["student".into()],
            ..Default::default()
        });
        assert!(cfg.validate().is_err());

        cfg.security.development_mode = true;
        cfg.validate().unwrap();
    }

    #[test]
    fn dev_mode_seeds_demo_user() {
        let users = dev_config().build_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "u1");
        assert_eq!(users[0].username, "user");
        assert!(users[0].roles.contains("student"));
        assert!(!users[0].password_hash.contains("pass123"));
    }

    #[test]
    fn parses_toml_file() {
        let raw = r#"
            [server]
            port = 4000

            [security]
            jwt_secret = "file-secret"
            token_ttl_secs = 120

            [logging]
            format = "json"

            [[users]]
            id = "u7"
            username = "tutor"
            password_hash = "$2b$04$abcdefghijklmnopqrstuu5Xs4Nk3a8oOCLIkDcJ3gRa6BPuXSuxW"
            roles = ["staff"]
        "#;
        let cfg: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.security.token_ttl_secs, 120);
        assert_eq!(cfg.logging.format, LogFormat::Json);
        cfg.validate().unwrap();

        let users = cfg.build_users().unwrap();
        assert_eq!(users[0].username, "tutor");
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = AppConfig::load(Path::new("/nonexistent/coursemate-auth.toml")).unwrap();
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut cfg = AppConfig::default();
        cfg.security.jwt_secret = Some("top-secret-value".into());
        assert!(!format!("{:?}", cfg).contains("top-secret-value"));
    }
}
