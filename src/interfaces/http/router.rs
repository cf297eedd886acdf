//! API router with OpenAPI documentation

use axum::{
    extract::FromRef,
    http::{header, Method},
    middleware,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::common::ErrorResponse;
use super::middleware::auth_middleware;
use super::modules::auth::{self, IdentityResponse, LoginRequest, LoginResponse};
use super::modules::health::{self, HealthResponse};
use super::modules::metrics::{http_metrics_middleware, prometheus_metrics};
use super::modules::request_id::request_id_middleware;
use crate::application::AuthService;

/// State shared by all routes.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    /// Present when the Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(auth: AuthService) -> Self {
        Self {
            auth,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::protected_ping,
        auth::login,
        auth::get_current_user,
    ),
    components(schemas(
        LoginRequest,
        LoginResponse,
        IdentityResponse,
        HealthResponse,
        ErrorResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login and identity"),
        (name = "Health", description = "Liveness probes"),
    ),
    info(title = "CourseMate Auth Service", version = "0.1.0")
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the full HTTP pipeline: public and protected routes, then the
/// metrics, request-id, trace and CORS layers around them.
pub fn create_api_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/login", post(auth::login))
        .route("/api-docs/openapi.json", get(openapi_json));

    let protected_routes = Router::new()
        .route("/me", get(auth::get_current_user))
        .route("/protected/ping", get(health::protected_ping))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ));

    let mut router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state.clone());

    if let Some(handle) = state.metrics {
        let metrics_routes = Router::new()
            .route("/metrics", get(prometheus_metrics))
            .with_state(handle);
        router = router.merge(metrics_routes);
    }

    // Reflects the caller's origin so browsers can send credentials.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    router
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
