//! Authentication module: login and identity query

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
