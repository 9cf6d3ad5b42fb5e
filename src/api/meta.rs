//! Meta Graph API publishing (Facebook pages, Instagram professional accounts)

use reqwest::Client;
use serde::Deserialize;

use crate::models::{Platform, ScheduledPost};

use super::{PublishApi, PublishError, PublishReceipt, read_json};

/// Graph API client
#[derive(Debug, Clone)]
pub struct MetaPublisher {
    client: Client,
    graph_url: String,
}

#[derive(Deserialize)]
struct Accounts {
    #[serde(default)]
    data: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    id: String,
    access_token: String,
    #[serde(default)]
    instagram_business_account: Option<IgAccount>,
}

#[derive(Deserialize)]
struct IgAccount {
    id: String,
}

#[derive(Deserialize)]
struct Created {
    id: String,
    #[serde(default)]
    post_id: Option<String>,
}

/// Graph error codes meaning "slow down"
const THROTTLE_CODES: &[i64] = &[4, 17, 32, 613];
/// Graph error code for an invalid or expired token
const INVALID_TOKEN_CODE: i64 = 190;

fn describe(body: &serde_json::Value) -> Option<PublishError> {
    let error = body.get("error")?;
    let message = error
        .get("message")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown Graph API error")
        .to_string();
    let code = error.get("code").and_then(serde_json::Value::as_i64);
    let transient = error
        .get("is_transient")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);

    Some(match code {
        Some(INVALID_TOKEN_CODE) => PublishError::Unauthorized(message),
        Some(c) if THROTTLE_CODES.contains(&c) => PublishError::RateLimited(message),
        _ if transient => PublishError::Server(message),
        _ => PublishError::Rejected(message),
    })
}

impl MetaPublisher {
    /// Create a client for a Graph API base URL
    pub fn new(client: Client, graph_url: &str) -> Self {
        Self {
            client,
            graph_url: graph_url.trim_end_matches('/').to_string(),
        }
    }

    async fn first_page(&self, token: &str) -> Result<Page, PublishError> {
        let response = self
            .client
            .get(format!("{}/me/accounts", self.graph_url))
            .query(&[
                ("fields", "id,access_token,instagram_business_account"),
                ("access_token", token),
            ])
            .send()
            .await?;

        let accounts: Accounts = read_json(response, describe).await?;
        accounts
            .data
            .into_iter()
            .next()
            .ok_or_else(|| PublishError::Rejected("no Facebook page is managed by this account".into()))
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<Created, PublishError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.graph_url))
            .form(form)
            .send()
            .await?;
        read_json(response, describe).await
    }

    async fn publish_facebook(&self, token: &str, post: &ScheduledPost) -> Result<PublishReceipt, PublishError> {
        let page = self.first_page(token).await?;

        let created = match post.image_url.as_deref() {
            Some(url) => {
                self.post_form(
                    &format!("{}/photos", page.id),
                    &[
                        ("url", url),
                        ("caption", post.content.as_str()),
                        ("access_token", page.access_token.as_str()),
                    ],
                )
                .await?
            }
            None => {
                self.post_form(
                    &format!("{}/feed", page.id),
                    &[
                        ("message", post.content.as_str()),
                        ("access_token", page.access_token.as_str()),
                    ],
                )
                .await?
            }
        };

        Ok(PublishReceipt {
            external_id: created.post_id.unwrap_or(created.id),
        })
    }

    async fn publish_instagram(&self, token: &str, post: &ScheduledPost) -> Result<PublishReceipt, PublishError> {
        let image_url = post
            .image_url
            .as_deref()
            .ok_or_else(|| PublishError::Rejected("Instagram posts need an image".into()))?;

        let page = self.first_page(token).await?;
        let ig = page.instagram_business_account.ok_or_else(|| {
            PublishError::Rejected("the Facebook page has no Instagram professional account".into())
        })?;

        let container = self
            .post_form(
                &format!("{}/media", ig.id),
                &[
                    ("image_url", image_url),
                    ("caption", post.content.as_str()),
                    ("access_token", token),
                ],
            )
            .await?;

        let published = self
            .post_form(
                &format!("{}/media_publish", ig.id),
                &[("creation_id", container.id.as_str()), ("access_token", token)],
            )
            .await?;

        Ok(PublishReceipt {
            external_id: published.id,
        })
    }
}

impl PublishApi for MetaPublisher {
    async fn publish(&self, token: &str, post: &ScheduledPost) -> Result<PublishReceipt, PublishError> {
        match post.platform {
            Platform::Facebook => self.publish_facebook(token, post).await,
            Platform::Instagram => self.publish_instagram(token, post).await,
            Platform::TikTok => Err(PublishError::Rejected("not a Meta platform".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Draft, Topic};
    use chrono::Utc;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn post(platform: Platform, image: Option<&str>) -> ScheduledPost {
        ScheduledPost::new(
            "u1",
            Draft {
                topic: Topic::Promo,
                platform,
                content: "Promo umrah Ramadhan".into(),
                image_url: image.map(String::from),
            },
            Utc::now(),
        )
    }

    async fn mount_accounts(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/me/accounts"))
            .and(query_param("access_token", "user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "id": "page-1",
                    "access_token": "page-token",
                    "instagram_business_account": { "id": "ig-1" }
                }]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_facebook_feed_post_uses_page_token() {
        let server = MockServer::start().await;
        mount_accounts(&server).await;
        Mock::given(method("POST"))
            .and(path("/page-1/feed"))
            .and(body_string_contains("access_token=page-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "page-1_42" })))
            .mount(&server)
            .await;

        let publisher = MetaPublisher::new(Client::new(), &server.uri());
        let receipt = publisher
            .publish("user-token", &post(Platform::Facebook, None))
            .await
            .unwrap();
        assert_eq!(receipt.external_id, "page-1_42");
    }

    #[tokio::test]
    async fn test_instagram_container_then_publish() {
        let server = MockServer::start().await;
        mount_accounts(&server).await;
        Mock::given(method("POST"))
            .and(path("/ig-1/media"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "container-7" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/ig-1/media_publish"))
            .and(body_string_contains("creation_id=container-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "ig-media-9" })))
            .expect(1)
            .mount(&server)
            .await;

        let publisher = MetaPublisher::new(Client::new(), &server.uri());
        let receipt = publisher
            .publish("user-token", &post(Platform::Instagram, Some("https://img.example.com/a.jpg")))
            .await
            .unwrap();
        assert_eq!(receipt.external_id, "ig-media-9");
    }

    #[tokio::test]
    async fn test_instagram_requires_image() {
        let server = MockServer::start().await;
        let publisher = MetaPublisher::new(Client::new(), &server.uri());
        let err = publisher
            .publish("user-token", &post(Platform::Instagram, None))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/accounts"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "Error validating access token", "type": "OAuthException", "code": 190 }
            })))
            .mount(&server)
            .await;

        let publisher = MetaPublisher::new(Client::new(), &server.uri());
        let err = publisher
            .publish("user-token", &post(Platform::Facebook, None))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Unauthorized(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let publisher = MetaPublisher::new(Client::new(), &server.uri());
        let err = publisher
            .publish("user-token", &post(Platform::Facebook, None))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
