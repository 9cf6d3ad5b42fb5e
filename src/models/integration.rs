//! Linked platform credentials

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Platform;

/// A persisted credential linking one user to one platform
/// (`users/{uid}/integrations/{platform}`)
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    /// Owning user
    pub user_id: String,
    /// Linked platform
    pub platform: Platform,
    /// Opaque access token
    pub access_token: String,
    /// Refresh token, when the provider issues one
    pub refresh_token: Option<String>,
    /// Provider-side account id
    pub provider_user_id: Option<String>,
    /// Provider-side display name
    pub name: Option<String>,
    /// Provider-side email
    pub email: Option<String>,
    /// Granted scopes
    pub scopes: Vec<String>,
    /// Token expiry
    pub expires_at: Option<DateTime<Utc>>,
    /// Last write
    pub updated_at: DateTime<Utc>,
}

impl Integration {
    /// Whether the access token is past its expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl std::fmt::Debug for Integration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Integration")
            .field("user_id", &self.user_id)
            .field("platform", &self.platform)
            .field("access_token", &"<redacted>")
            .field("provider_user_id", &self.provider_user_id)
            .field("name", &self.name)
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// What a successful authorization hands back. Fields left `None` keep their
/// previously stored value on re-link.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Access token
    pub access_token: String,
    /// Refresh token
    pub refresh_token: Option<String>,
    /// Provider-side account id
    pub provider_user_id: Option<String>,
    /// Provider-side display name
    pub name: Option<String>,
    /// Provider-side email
    pub email: Option<String>,
    /// Granted scopes
    pub scopes: Option<Vec<String>>,
    /// Token expiry
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenPayload {
    /// Payload carrying only an access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for TokenPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPayload")
            .field("access_token", &"<redacted>")
            .field("provider_user_id", &self.provider_user_id)
            .field("name", &self.name)
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
