//! Identity module: credential checks and token issuance
//!
//! Contains the `AuthService` which orchestrates login and token
//! verification.

pub mod service;

pub use service::AuthService;
