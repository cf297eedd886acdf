//! Validated JSON extractor for Axum
//!
//! `ValidatedJson<T>` works like `axum::Json<T>`, but additionally runs
//! `validator::Validate::validate()` on the deserialized value.
//! Both unreadable bodies and failed validation are rejected with 400.
//! Deserializer detail is logged, never returned.

use std::collections::BTreeSet;

use axum::extract::FromRequest;
use axum::Json;
use serde::de::DeserializeOwned;
use tracing::debug;
use validator::Validate;

use crate::shared::AppError;

/// An extractor that deserializes JSON and validates it.
///
/// ```ignore
/// async fn handler(ValidatedJson(body): ValidatedJson<LoginRequest>) {
///     // `body` is guaranteed to pass validation
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

/// A JSON request body with a fixed client-facing message for bodies
/// that cannot be deserialized at all.
pub trait RequestBody {
    const UNREADABLE_MESSAGE: &'static str;
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + RequestBody,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                debug!(detail = %rejection.body_text(), "Rejected unreadable JSON body");
                AppError::Validation(T::UNREADABLE_MESSAGE.to_string())
            })?;

        value
            .validate()
            .map_err(|errors| AppError::Validation(validation_message(&errors)))?;

        Ok(ValidatedJson(value))
    }
}

/// Distinct field messages, joined in a stable order.
fn validation_message(errors: &validator::ValidationErrors) -> String {
    let messages: BTreeSet<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: {}", field, e.code))
            })
        })
        .collect();

    if messages.is_empty() {
        "Validation failed".to_string()
    } else {
        messages.into_iter().collect::<Vec<_>>().join("; ")
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;
    use tower::ServiceExt;
    use validator::Validate;

    #[derive(Debug, Deserialize, Validate)]
    struct TestBody {
        #[serde(default)]
        #[validate(length(min = 1, message = "name/code required"))]
        name: String,
        #[serde(default)]
        #[validate(length(min = 1, message = "name/code required"))]
        code: String,
    }

    impl RequestBody for TestBody {
        const UNREADABLE_MESSAGE: &'static str = "name/code required";
    }

    async fn handler(ValidatedJson(_body): ValidatedJson<TestBody>) -> &'static str {
        "ok"
    }

    fn app() -> Router {
        Router::new().route("/test", post(handler))
    }

    fn json_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/test")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn error_of(resp: axum::http::Response<Body>) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        json["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn valid_body_returns_ok() {
        let resp = app()
            .oneshot(json_request(r#"{"name": "Alice", "code": "x"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_json_returns_400_without_parser_detail() {
        let resp = app().oneshot(json_request("not json")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_of(resp).await, "name/code required");
    }

    #[tokio::test]
    async fn wrongly_typed_field_returns_fixed_message() {
        let resp = app()
            .oneshot(json_request(r#"{"name": 123, "code": "x"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_of(resp).await, "name/code required");
    }

    #[tokio::test]
    async fn missing_fields_return_400_with_single_message() {
        let resp = app().oneshot(json_request("{}")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_of(resp).await, "name/code required");
    }
}
