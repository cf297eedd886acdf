//! Liveness endpoints

pub mod handlers;

pub use handlers::*;
