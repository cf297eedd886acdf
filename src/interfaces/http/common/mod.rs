//! Shared HTTP plumbing: error bodies and extractors.

pub mod error;
pub mod validated_json;

pub use error::ErrorResponse;
pub use validated_json::{RequestBody, ValidatedJson};
