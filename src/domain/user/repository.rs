use async_trait::async_trait;

use super::User;
use crate::domain::DomainResult;

/// Read-only lookup of user records by username.
///
/// `Ok(None)` is the normal "no such user" outcome. `Err` is reserved for
/// backends that can actually fail (I/O, connection loss); the in-memory
/// store never returns it.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Case-sensitive, exact-match lookup.
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>>;
}
