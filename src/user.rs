use std::fmt;

use serde::Serialize;

#[derive(Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub username: String,
    #[serde(skip)]
    pub password: String, // argon2 PHC string, never the plaintext
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// A validated registration, password still in plaintext.
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}
