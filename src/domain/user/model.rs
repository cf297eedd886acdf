use std::collections::BTreeSet;
use std::fmt;

/// A user known to the credential store.
///
/// Records are built once at startup and never mutated. Only the bcrypt
/// hash of the password is kept.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub roles: BTreeSet<String>,
}

impl User {
    pub fn new<I, R>(
        id: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
        roles: I,
    ) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            id: id.into(),
            username: username.into(),
            password_hash: password_hash.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

// The hash is not plaintext, but it is still offline-attackable material.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_deduplicated_and_sorted() {
        let user = User::new("u1", "user", "$2b$10$x", ["tutor", "student", "tutor"]);
        let roles: Vec<_> = user.roles.iter().map(String::as_str).collect();
        assert_eq!(roles, ["student", "tutor"]);
        assert!(user.roles.contains("student"));
    }

    #[test]
    fn debug_output_hides_hash() {
        let user = User::new("u1", "user", "$2b$10$secrethash", ["student"]);
        let rendered = format!("{:?}", user);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("secrethash"));
    }
}
