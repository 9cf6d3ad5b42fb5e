//! TikTok Content Posting API (photo posts pulled from a URL)

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::ScheduledPost;

use super::{PublishApi, PublishError, PublishReceipt, read_json};

/// Longest title TikTok accepts for photo posts
const TITLE_LIMIT: usize = 90;

/// Content Posting API client
#[derive(Debug, Clone)]
pub struct TikTokPublisher {
    client: Client,
    api_url: String,
}

#[derive(Serialize)]
struct InitRequest<'a> {
    post_info: PostInfo<'a>,
    source_info: SourceInfo<'a>,
    post_mode: &'a str,
    media_type: &'a str,
}

#[derive(Serialize)]
struct PostInfo<'a> {
    title: String,
    description: &'a str,
    privacy_level: &'a str,
    disable_comment: bool,
    auto_add_music: bool,
}

#[derive(Serialize)]
struct SourceInfo<'a> {
    source: &'a str,
    photo_cover_index: u32,
    photo_images: Vec<&'a str>,
}

#[derive(Deserialize)]
struct InitResponse {
    data: InitData,
}

#[derive(Deserialize)]
struct InitData {
    publish_id: String,
}

fn describe(body: &serde_json::Value) -> Option<PublishError> {
    let error = body.get("error")?;
    let code = error.get("code").and_then(serde_json::Value::as_str)?;
    if code == "ok" {
        return None;
    }

    let message = error
        .get("message")
        .and_then(serde_json::Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or(code);
    let message = format!("{code}: {message}");

    Some(match code {
        "access_token_invalid" | "scope_not_authorized" | "token_not_authorized_for_specified_user" => {
            PublishError::Unauthorized(message)
        }
        "rate_limit_exceeded" | "spam_risk_too_many_posts" => PublishError::RateLimited(message),
        "internal_error" => PublishError::Server(message),
        _ => PublishError::Rejected(message),
    })
}

impl TikTokPublisher {
    /// Create a client for an Open API base URL
    pub fn new(client: Client, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

impl PublishApi for TikTokPublisher {
    async fn publish(&self, token: &str, post: &ScheduledPost) -> Result<PublishReceipt, PublishError> {
        let image_url = post
            .image_url
            .as_deref()
            .ok_or_else(|| PublishError::Rejected("TikTok posts need an image".into()))?;

        let request = InitRequest {
            post_info: PostInfo {
                title: post.content.lines().next().unwrap_or_default().chars().take(TITLE_LIMIT).collect(),
                description: &post.content,
                privacy_level: "PUBLIC_TO_EVERYONE",
                disable_comment: false,
                auto_add_music: true,
            },
            source_info: SourceInfo {
                source: "PULL_FROM_URL",
                photo_cover_index: 0,
                photo_images: vec![image_url],
            },
            post_mode: "DIRECT_POST",
            media_type: "PHOTO",
        };

        let response = self
            .client
            .post(format!("{}/v2/post/publish/content/init/", self.api_url))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        let init: InitResponse = read_json(response, describe).await?;
        Ok(PublishReceipt {
            external_id: init.data.publish_id,
        })
    }
}
