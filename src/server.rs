//! Reusable server runtime.
//!
//! Provides [`ServerHandle`] that encapsulates the full server lifecycle:
//! credential store seeding, token service setup, metrics, the HTTP
//! listener and graceful shutdown.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::application::AuthService;
use crate::config::{AppConfig, ConfigError, LogFormat};
use crate::domain::DomainError;
use crate::infrastructure::crypto::jwt::TokenService;
use crate::infrastructure::storage::InMemoryCredentialStore;
use crate::interfaces::http::{create_api_router, AppState};
use crate::shared::{listen_for_shutdown_signals, AppError, ShutdownSignal};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Credential store: {0}")]
    Store(#[from] DomainError),

    #[error("Startup: {0}")]
    Startup(#[from] AppError),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level. Safe to call more than once.
pub fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let result = match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    if result.is_err() {
        warn!("Tracing subscriber already installed; keeping the existing one");
    }
}

/// The global metrics recorder can only be installed once per process, so
/// later calls reuse the first handle.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("Prometheus metrics recorder installed");
                Some(handle)
            }
            Err(e) => {
                warn!("Metrics disabled, recorder install failed: {}", e);
                None
            }
        })
        .clone()
}

/// Wire the credential store, token service and auth service from config.
///
/// Blocking: hashes development seed passwords and the timing-equalisation
/// dummy with bcrypt.
pub fn build_auth_service(config: &AppConfig) -> Result<AuthService, ServerError> {
    config.validate()?;

    let jwt_config = config.jwt_config()?;
    info!(
        "JWT configured: {}s token lifetime, audience `{}`, issuer `{}`, secret fingerprint {}",
        jwt_config.ttl_secs(),
        jwt_config.audience,
        jwt_config.issuer,
        jwt_config.secret_fingerprint()
    );
    let tokens = TokenService::new(jwt_config)?;

    let store = InMemoryCredentialStore::new(config.build_users()?)?;
    info!("Credential store loaded with {} user(s)", store.len());

    Ok(AuthService::new(
        Arc::new(store),
        tokens,
        config.security.bcrypt_cost,
    )?)
}

/// Handle to a running auth service.
pub struct ServerHandle {
    /// Address the HTTP listener is bound to.
    pub local_addr: SocketAddr,
    /// The configuration the server was started with.
    pub config: AppConfig,

    shutdown: ShutdownSignal,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Validate configuration, build the services and start serving.
    ///
    /// Fails before binding if the configuration is unusable, e.g. no
    /// signing secret outside development mode.
    pub async fn start(config: AppConfig) -> Result<Self, ServerError> {
        info!("Starting CourseMate auth service...");

        let build_cfg = config.clone();
        let auth = tokio::task::spawn_blocking(move || build_auth_service(&build_cfg))
            .await
            .map_err(|e| AppError::internal(format!("startup task failed: {}", e)))??;

        let mut state = AppState::new(auth);
        if config.metrics.enabled {
            if let Some(handle) = prometheus_handle() {
                state = state.with_metrics(handle);
            }
        }
        let router = create_api_router(state);

        let listener = tokio::net::TcpListener::bind(config.server.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("HTTP API listening on http://{}", local_addr);

        let shutdown = ShutdownSignal::new();
        let api_shutdown = shutdown.clone();
        let api_task = tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                api_shutdown.wait().await;
                info!("HTTP API received shutdown signal");
            });
            if let Err(e) = server.await {
                error!("HTTP API server error: {}", e);
            }
        });

        Ok(Self {
            local_addr,
            config,
            shutdown,
            api_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Trigger shutdown on SIGINT/SIGTERM.
    pub fn install_signal_handler(&self) {
        let signal = self.shutdown.clone();
        tokio::spawn(listen_for_shutdown_signals(signal));
    }

    /// Trigger shutdown and wait for in-flight requests, up to the
    /// configured timeout.
    pub async fn shutdown(self) {
        self.shutdown.trigger();
        self.wait().await;
    }

    /// Wait for the server task to finish after shutdown was triggered.
    pub async fn wait(self) {
        let timeout = Duration::from_secs(self.config.server.shutdown_timeout);
        match tokio::time::timeout(timeout, self.api_task).await {
            Ok(Ok(())) => info!("HTTP API server stopped"),
            Ok(Err(e)) => error!("HTTP API task panicked: {}", e),
            Err(_) => warn!("Shutdown timed out after {}s", timeout.as_secs()),
        }
    }
}
