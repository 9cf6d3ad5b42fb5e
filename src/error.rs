//! Error taxonomy shared by every component
//!
//! Every failure is scoped to the user action that triggered it; nothing here
//! is fatal to the process. [`Error::code`] gives the stable status string
//! used by the callable RPC surface.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::Platform;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, Error>;

/// All errors surfaced by SocialDesk operations
#[derive(Debug, Error)]
pub enum Error {
    /// No active session
    #[error("You must be signed in to do that")]
    Unauthenticated,

    /// A required field is missing or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Third-party client credentials are missing
    #[error("Missing configuration: {0}")]
    Configuration(String),

    /// OAuth callback `state` did not match the in-flight attempt
    #[error("Authorization state mismatch for {0}; start linking again")]
    CsrfMismatch(Platform),

    /// Token exchange failed or the provider rejected the request
    #[error("Authorization with {platform} failed: {reason}")]
    AuthorizationFailed {
        /// Platform being linked
        platform: Platform,
        /// Provider or transport message
        reason: String,
    },

    /// Publishing needs a linked account that does not exist
    #[error("No {0} account is linked")]
    NotLinked(Platform),

    /// The query needs a composite index the store does not have
    #[error("Query requires index `{index}`. Create it with: {create}")]
    QueryRequiresIndex {
        /// Name of the missing index
        index: String,
        /// Statement that creates it
        create: String,
    },

    /// A post was scheduled for an instant that already passed
    #[error("Cannot schedule a post in the past ({0})")]
    InvalidSchedule(DateTime<Utc>),

    /// A bounded call ran out of time
    #[error("{0} timed out")]
    Timeout(String),

    /// The addressed document does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unexpected downstream failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Status code string used by the callable RPC surface
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidArgument(_) | Self::InvalidSchedule(_) => "invalid-argument",
            Self::Configuration(_) | Self::NotLinked(_) | Self::QueryRequiresIndex { .. } => {
                "failed-precondition"
            }
            Self::CsrfMismatch(_) | Self::AuthorizationFailed { .. } => "permission-denied",
            Self::Timeout(_) => "deadline-exceeded",
            Self::NotFound(_) => "not-found",
            Self::Internal(_) => "internal",
        }
    }

    /// Shorthand for [`Error::InvalidArgument`]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Internal(format!("storage: {e}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("json: {e}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(format!("io: {e}"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout("request".to_string())
        } else {
            Self::Internal(format!("http: {e}"))
        }
    }
}
