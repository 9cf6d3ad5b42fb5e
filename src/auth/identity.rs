//! Password sign-in against the managed identity service

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::IdentityConfig;
use crate::error::{Error, Result};
use crate::models::Actor;

/// Anything that can turn credentials into an [`Actor`]
#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    /// Verify an email/password pair
    async fn sign_in(&self, email: &str, password: &str) -> Result<Actor>;
}

/// REST client for `accounts:signInWithPassword`
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    config: IdentityConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
    id_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpIdentityProvider {
    /// Build from the `[identity]` config section. The API key is checked
    /// on sign-in, so a restored session works without one.
    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Create a provider for an endpoint
    pub fn new(client: Client, endpoint: &str, api_key: &str) -> Self {
        Self {
            client,
            config: IdentityConfig {
                endpoint: endpoint.to_string(),
                api_key: Some(api_key.to_string()),
            },
        }
    }
}

impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Actor> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(Error::invalid("email and password are required"));
        }

        let api_key = self.config.api_key()?;
        let url = format!(
            "{}/accounts:signInWithPassword",
            self.config.endpoint.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&SignInRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let reason = response
                .json::<ErrorEnvelope>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| status.to_string());
            tracing::info!(%email, %reason, "sign-in rejected");
            return Err(Error::Unauthenticated);
        }
        if !status.is_success() {
            return Err(Error::Internal(format!("identity service returned {status}")));
        }

        let body: SignInResponse = response.json().await?;
        tracing::debug!(uid = %body.local_id, "signed in");
        Ok(Actor::new(body.local_id, body.email, body.id_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn provider(server: &MockServer) -> HttpIdentityProvider {
        HttpIdentityProvider::new(Client::new(), &server.uri(), "test-key")
    }

    #[tokio::test]
    async fn test_sign_in_maps_actor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signInWithPassword"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "email": "mitra@example.com",
                "returnSecureToken": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "localId": "uid-1",
                "email": "mitra@example.com",
                "idToken": "jwt"
            })))
            .mount(&server)
            .await;

        let actor = provider(&server)
            .await
            .sign_in("mitra@example.com", "pw")
            .await
            .unwrap();
        assert_eq!(actor.uid, "uid-1");
        assert_eq!(actor.id_token, "jwt");
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "INVALID_PASSWORD" }
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .await
            .sign_in("mitra@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
    }

    #[tokio::test]
    async fn test_empty_credentials_are_rejected_locally() {
        let server = MockServer::start().await;
        let err = provider(&server).await.sign_in(" ", "pw").await.unwrap_err();
        assert_eq!(err.code(), "invalid-argument");
    }

    #[tokio::test]
    async fn test_missing_api_key_detected_at_sign_in() {
        let provider = HttpIdentityProvider::from_config(&IdentityConfig::default()).unwrap();
        let err = provider.sign_in("mitra@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
