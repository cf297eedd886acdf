//! In-memory credential store

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{CredentialStore, DomainError, DomainResult, User};

/// Fixed set of users held for the lifetime of the process.
///
/// Built once at startup and never written afterwards, so lookups need no
/// locking.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: HashMap<String, User>,
}

impl InMemoryCredentialStore {
    /// Build the store, rejecting duplicate usernames and ids.
    pub fn new(users: impl IntoIterator<Item = User>) -> DomainResult<Self> {
        let mut by_username = HashMap::new();
        let mut ids = std::collections::HashSet::new();

        for user in users {
            if user.username.is_empty() {
                return Err(DomainError::InvalidRecord("empty username".into()));
            }
            if !ids.insert(user.id.clone()) {
                return Err(DomainError::InvalidRecord(format!(
                    "duplicate user id `{}`",
                    user.id
                )));
            }
            if by_username.contains_key(&user.username) {
                return Err(DomainError::InvalidRecord(format!(
                    "duplicate username `{}`",
                    user.username
                )));
            }
            by_username.insert(user.username.clone(), user);
        }

        Ok(Self { users: by_username })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self.users.get(username).cloned())
    }
}
