//! Authorization code exchange

use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::config::TikTokConfig;
use crate::error::{Error, Result};
use crate::models::{Platform, TokenPayload};

/// Trades an authorization code for tokens
#[allow(async_fn_in_trait)]
pub trait TokenExchange {
    /// Exchange `code` (with its PKCE verifier) for a token payload
    async fn exchange(&self, code: &str, code_verifier: Option<&str>) -> Result<TokenPayload>;
}

/// TikTok `/v2/oauth/token/` client
#[derive(Debug, Clone)]
pub struct TikTokTokenExchange {
    client: Client,
    config: TikTokConfig,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    open_id: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

fn failed(reason: impl Into<String>) -> Error {
    Error::AuthorizationFailed {
        platform: Platform::TikTok,
        reason: reason.into(),
    }
}

impl TikTokTokenExchange {
    /// Build from the `[tiktok]` section. Client credentials are resolved
    /// per exchange.
    pub fn from_config(config: &TikTokConfig, timeout: std::time::Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client, config.clone()))
    }

    /// Create an exchange with an existing HTTP client
    pub const fn new(client: Client, config: TikTokConfig) -> Self {
        Self { client, config }
    }
}

impl TokenExchange for TikTokTokenExchange {
    async fn exchange(&self, code: &str, code_verifier: Option<&str>) -> Result<TokenPayload> {
        let oauth = self.config.client()?;
        let url = format!("{}/v2/oauth/token/", self.config.api_url.trim_end_matches('/'));

        let mut form = vec![
            ("client_key", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", oauth.redirect_uri.as_str()),
        ];
        if let Some(verifier) = code_verifier {
            form.push(("code_verifier", verifier));
        }

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    failed("token exchange timed out")
                } else {
                    failed(format!("token exchange request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("unreadable token response ({status}): {e}")))?;

        if let Some(error) = body.error.filter(|e| !e.is_empty()) {
            let detail = body.error_description.unwrap_or_default();
            return Err(failed(format!("{error}: {detail}")));
        }
        if !status.is_success() {
            return Err(failed(format!("token endpoint returned {status}")));
        }

        let access_token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| failed("token response has no access_token"))?;

        Ok(TokenPayload {
            access_token,
            refresh_token: body.refresh_token,
            provider_user_id: body.open_id,
            name: None,
            email: None,
            scopes: body
                .scope
                .map(|s| s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect()),
            expires_at: body.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn exchange(server: &MockServer) -> TikTokTokenExchange {
        TikTokTokenExchange::new(
            Client::new(),
            TikTokConfig {
                client_key: Some("ck".into()),
                client_secret: Some("cs".into()),
                redirect_uri: Some("https://app.example.com/cb".into()),
                api_url: server.uri(),
                ..TikTokConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_exchange_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/oauth/token/"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code_verifier=v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "act.1",
                "refresh_token": "rft.1",
                "open_id": "open-1",
                "scope": "user.info.basic,video.publish",
                "expires_in": 86400,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let payload = exchange(&server).exchange("C1", Some("v1")).await.unwrap();
        assert_eq!(payload.access_token, "act.1");
        assert_eq!(payload.provider_user_id.as_deref(), Some("open-1"));
        assert_eq!(payload.scopes.map(|s| s.len()), Some(2));
        assert!(payload.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_exchange_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Authorization code is expired."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = exchange(&server).exchange("C1", None).await.unwrap_err();
        assert_eq!(err.code(), "permission-denied");
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_missing_credentials_is_configuration() {
        let exchange = TikTokTokenExchange::new(Client::new(), TikTokConfig::default());
        let err = exchange.exchange("C1", None).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("tiktok.client_key")));
    }
}
