//! Password hashing and token signing primitives

pub mod jwt;
pub mod password;

pub use jwt::{ClaimsInput, IssuedToken, JwtConfig, TokenClaims, TokenService};
pub use password::{hash_password, verify_password, verify_password_blocking};
