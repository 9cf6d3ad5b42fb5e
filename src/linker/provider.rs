//! Responses from the Meta login popup

use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::TokenPayload;

/// Outcome reported by a popup-style provider SDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResponse {
    /// The user granted access
    Authorized(TokenPayload),
    /// The user closed the popup or declined
    Cancelled,
    /// The SDK reported an error
    Failed(String),
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SdkAuth {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default, rename = "userID")]
    user_id: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    granted_scopes: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SdkResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    auth_response: Option<SdkAuth>,
    #[serde(flatten)]
    flat: SdkAuth,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl ProviderResponse {
    /// Parse the JSON handed back by the login SDK.
    ///
    /// Accepts both the flat shape (`accessToken`, `userID`, `name`, ...) and
    /// the nested `authResponse` shape. A response with no token and no error
    /// (including `status: "unknown"`) is a cancellation.
    pub fn from_sdk_json(json: &str) -> Result<Self> {
        let raw: SdkResponse = serde_json::from_str(json)
            .map_err(|e| Error::invalid(format!("unreadable login response: {e}")))?;

        if let Some(error) = raw.error.filter(|e| !e.is_null()) {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .map_or_else(|| error.to_string(), str::to_string);
            return Ok(Self::Failed(message));
        }

        let auth = raw.auth_response.unwrap_or(raw.flat);
        let token = auth.access_token.filter(|t| !t.is_empty());

        let Some(access_token) = token else {
            return Ok(match raw.status.as_deref() {
                Some("unknown" | "not_authorized") | None => Self::Cancelled,
                Some(other) => Self::Failed(format!("login status {other}")),
            });
        };

        Ok(Self::Authorized(TokenPayload {
            access_token,
            refresh_token: None,
            provider_user_id: auth.user_id,
            name: raw.name,
            email: raw.email,
            scopes: auth
                .granted_scopes
                .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()),
            expires_at: auth
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_response() {
        let response = ProviderResponse::from_sdk_json(
            r#"{"accessToken":"EAAB","userID":"1789","expiresIn":5183999,"name":"Al Amin Travel","email":"a@b.c"}"#,
        )
        .unwrap();

        let ProviderResponse::Authorized(payload) = response else {
            panic!("expected authorized");
        };
        assert_eq!(payload.access_token, "EAAB");
        assert_eq!(payload.provider_user_id.as_deref(), Some("1789"));
        assert_eq!(payload.name.as_deref(), Some("Al Amin Travel"));
        assert!(payload.expires_at.is_some());
    }

    #[test]
    fn test_nested_response() {
        let response = ProviderResponse::from_sdk_json(
            r#"{"status":"connected","authResponse":{"accessToken":"EAAC","userID":"9","grantedScopes":"pages_show_list,instagram_basic"}}"#,
        )
        .unwrap();
        let ProviderResponse::Authorized(payload) = response else {
            panic!("expected authorized");
        };
        assert_eq!(payload.scopes.map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_cancelled() {
        assert_eq!(
            ProviderResponse::from_sdk_json(r#"{"status":"unknown"}"#).unwrap(),
            ProviderResponse::Cancelled
        );
        assert_eq!(ProviderResponse::from_sdk_json("{}").unwrap(), ProviderResponse::Cancelled);
    }

    #[test]
    fn test_error() {
        let response =
            ProviderResponse::from_sdk_json(r#"{"error":{"message":"App not active"}}"#).unwrap();
        assert_eq!(response, ProviderResponse::Failed("App not active".into()));
    }

    #[test]
    fn test_garbage() {
        assert!(ProviderResponse::from_sdk_json("not json").is_err());
    }
}
