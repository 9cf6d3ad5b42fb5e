//! The signed-in actor

use serde::{Deserialize, Serialize};

/// An authenticated user as resolved by the identity provider
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable user id (`users/{uid}`)
    pub uid: String,
    /// Sign-in email
    pub email: String,
    /// Provider-issued session token
    pub id_token: String,
}

impl Actor {
    /// Create a new actor
    pub fn new(uid: impl Into<String>, email: impl Into<String>, id_token: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            id_token: id_token.into(),
        }
    }
}

impl std::fmt::Debug for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("id_token", &"<redacted>")
            .finish()
    }
}
