//! Publishing clients for the linked platforms

pub mod meta;
pub mod tiktok;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::models::{Platform, ScheduledPost};

pub use meta::MetaPublisher;
pub use tiktok::TikTokPublisher;

/// What a platform hands back for a published post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Platform-side id of the post
    pub external_id: String,
}

/// Why a publish attempt failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// Connection or timeout trouble
    #[error("network: {0}")]
    Network(String),
    /// The platform asked us to slow down
    #[error("rate-limited: {0}")]
    RateLimited(String),
    /// The platform had a server-side failure
    #[error("server: {0}")]
    Server(String),
    /// The token was refused
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The platform refused the post itself
    #[error("rejected: {0}")]
    Rejected(String),
}

impl PublishError {
    /// Whether another attempt might succeed
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited(_) | Self::Server(_))
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(message),
            s if s.is_server_error() => Self::Server(message),
            _ => Self::Rejected(message),
        }
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            Self::Network(e.to_string())
        } else if e.is_decode() {
            Self::Rejected(format!("unexpected response: {e}"))
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Publishes one post with one access token
#[allow(async_fn_in_trait)]
pub trait PublishApi {
    /// Publish `post` on its platform
    async fn publish(
        &self,
        token: &str,
        post: &ScheduledPost,
    ) -> std::result::Result<PublishReceipt, PublishError>;
}

/// Routes each post to its platform's client
#[derive(Debug, Clone)]
pub struct PlatformClients {
    /// Instagram and Facebook
    pub meta: MetaPublisher,
    /// TikTok
    pub tiktok: TikTokPublisher,
}

impl PublishApi for PlatformClients {
    async fn publish(
        &self,
        token: &str,
        post: &ScheduledPost,
    ) -> std::result::Result<PublishReceipt, PublishError> {
        match post.platform {
            Platform::Instagram | Platform::Facebook => self.meta.publish(token, post).await,
            Platform::TikTok => self.tiktok.publish(token, post).await,
        }
    }
}

/// Decode a JSON body, turning failures into [`PublishError`].
///
/// `describe` pulls a human message out of an error body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    describe: impl Fn(&serde_json::Value) -> Option<PublishError>,
) -> std::result::Result<T, PublishError> {
    let status = response.status();
    let body = response.text().await?;
    let value: serde_json::Value = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);

    if let Some(error) = describe(&value) {
        return Err(match (error, status) {
            (PublishError::Rejected(m), s) if !s.is_success() => PublishError::from_status(s, m),
            (error, _) => error,
        });
    }
    if !status.is_success() {
        return Err(PublishError::from_status(status, truncate(&body, 200)));
    }

    serde_json::from_value(value)
        .map_err(|e| PublishError::Rejected(format!("unexpected response: {e}")))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}
