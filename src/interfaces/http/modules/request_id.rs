//! Request correlation ids
//!
//! Every request runs inside a `request` span tagged with an id, and the
//! same id is returned in `x-request-id`. A caller-supplied id is kept when
//! it is short printable ASCII; anything else is replaced by a fresh UUID.

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_INCOMING_LEN: usize = 128;

fn incoming_id(request: &Request<Body>) -> Option<HeaderValue> {
    let value = request.headers().get(&REQUEST_ID_HEADER)?;
    let text = value.to_str().ok()?;
    let usable = !text.is_empty()
        && text.len() <= MAX_INCOMING_LEN
        && text.bytes().all(|b| b.is_ascii_graphic());
    usable.then(|| value.clone())
}

fn generated_id() -> HeaderValue {
    // A hyphenated UUID is always a valid header value.
    HeaderValue::from_str(&Uuid::new_v4().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}

pub async fn request_id_middleware(request: Request<Body>, next: Next) -> Response {
    let header_value = incoming_id(&request).unwrap_or_else(generated_id);
    let id = header_value.to_str().unwrap_or("unknown").to_owned();

    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    response
        .headers_mut()
        .insert(REQUEST_ID_HEADER.clone(), header_value);
    response
}
