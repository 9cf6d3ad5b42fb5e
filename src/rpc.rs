//! Callable functions: `generateContent` and `postToSocial`
//!
//! Requests and responses are JSON. Failures come back as
//! `{ "code": "...", "message": "..." }` using the codes from
//! [`Error::code`].

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::api::PublishApi;
use crate::error::Error;
use crate::generate::{ContentGateway, GenerationRequest, ImageGenerator, TextGenerator};
use crate::models::{Actor, PostStatus};
use crate::posts::PostStore;
use crate::publisher::Publisher;

/// Error payload of a failed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Status code (`unauthenticated`, `invalid-argument`, ...)
    pub code: String,
    /// Human readable message
    pub message: String,
}

impl From<Error> for RpcError {
    fn from(e: Error) -> Self {
        Self {
            code: e.code().to_string(),
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostToSocialRequest {
    post_id: String,
}

/// Dispatches callable functions by name
pub struct Functions<'a, T, I, A> {
    gateway: &'a ContentGateway<T, I>,
    publisher: &'a Publisher<A>,
    posts: &'a PostStore,
}

impl<'a, T, I, A> Functions<'a, T, I, A>
where
    T: TextGenerator,
    I: ImageGenerator,
    A: PublishApi,
{
    /// Bind the functions to their services
    pub const fn new(
        gateway: &'a ContentGateway<T, I>,
        publisher: &'a Publisher<A>,
        posts: &'a PostStore,
    ) -> Self {
        Self {
            gateway,
            publisher,
            posts,
        }
    }

    /// Invoke `name` with `payload` on behalf of `auth`
    pub async fn call(
        &self,
        name: &str,
        auth: Option<&Actor>,
        payload: Value,
    ) -> Result<Value, RpcError> {
        tracing::debug!(function = name, "rpc call");
        let result = match name {
            "generateContent" => self.generate_content(auth, payload).await,
            "postToSocial" => self.post_to_social(auth, payload).await,
            other => Err(Error::NotFound(format!("function {other}"))),
        };

        result.map_err(|e| {
            tracing::info!(function = name, code = e.code(), "rpc call failed: {e}");
            RpcError::from(e)
        })
    }

    async fn generate_content(&self, auth: Option<&Actor>, payload: Value) -> crate::Result<Value> {
        let actor = auth.ok_or(Error::Unauthenticated)?;
        let request: GenerationRequest = serde_json::from_value(payload)
            .map_err(|e| Error::invalid(format!("bad generateContent payload: {e}")))?;

        let content = self.gateway.generate(Some(actor), &request).await?;
        Ok(serde_json::to_value(content)?)
    }

    async fn post_to_social(&self, auth: Option<&Actor>, payload: Value) -> crate::Result<Value> {
        let actor = auth.ok_or(Error::Unauthenticated)?;
        let request: PostToSocialRequest = serde_json::from_value(payload)
            .map_err(|_| Error::invalid("\"postId\" is required"))?;
        let id = Uuid::parse_str(request.post_id.trim())
            .map_err(|_| Error::invalid(format!("\"{}\" is not a post id", request.post_id)))?;

        // Someone else's post looks the same as a missing one
        match self.posts.get(id).await? {
            Some(post) if post.user_id == actor.uid => {}
            _ => return Err(Error::NotFound(format!("posts/{id}"))),
        }

        let post = self.publisher.publish(id).await?;
        Ok(json!({
            "success": post.status == PostStatus::Posted,
            "postId": post.id,
            "platform": post.platform,
            "status": post.status,
            "externalId": post.external_id,
            "failureReason": post.failure_reason,
        }))
    }
}
