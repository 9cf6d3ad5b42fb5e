//! OAuth redirect helpers: anti-forgery state, PKCE, URL handling

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use url::{Position, Url};

use crate::config::OAuthClient;
use crate::error::{Error, Result};

/// How long an in-flight authorization stays valid
pub const STATE_TTL_MINUTES: i64 = 10;

/// Query parameters the provider appends to the redirect
const CALLBACK_PARAMS: &[&str] = &["code", "state", "error", "error_description", "scopes"];

/// Anchor for callbacks given as a path or a bare query string
const RELATIVE_BASE: &str = "http://callback.invalid/";

/// Random URL-safe token from `bytes` random bytes
pub fn random_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill(buf.as_mut_slice());
    URL_SAFE_NO_PAD.encode(buf)
}

/// Fresh 32-byte state value
pub fn new_state() -> String {
    random_token(32)
}

/// Fresh PKCE verifier (43 chars, within the 43..=128 allowed)
pub fn new_code_verifier() -> String {
    random_token(32)
}

/// S256 challenge for a verifier
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Whether a pending attempt created at `created_at` is still usable
pub fn state_is_fresh(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - created_at <= Duration::minutes(STATE_TTL_MINUTES)
}

/// Build the provider authorization URL
pub fn authorize_url(base: &str, client: &OAuthClient, state: &str, challenge: &str) -> Result<String> {
    let scope = client.scopes.join(",");
    let params = [
        ("client_key", client.client_id.as_str()),
        ("response_type", "code"),
        ("scope", scope.as_str()),
        ("redirect_uri", client.redirect_uri.as_str()),
        ("state", state),
        ("code_challenge", challenge),
        ("code_challenge_method", "S256"),
    ];

    Url::parse_with_params(base, &params)
        .map(String::from)
        .map_err(|e| Error::Configuration(format!("authorization URL `{base}`: {e}")))
}

/// Parameters read from a redirect callback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// Authorization code
    pub code: Option<String>,
    /// Echoed state
    pub state: Option<String>,
    /// Provider error code
    pub error: Option<String>,
    /// Provider error text
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse from a full callback URL, a path or a bare query string
    pub fn parse(input: &str) -> Self {
        let Some((url, _)) = resolve(input) else {
            return Self::default();
        };

        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            let slot = match key.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    /// Nothing to act on: a reload of an already-sanitized URL
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.error.is_none()
    }
}

/// How the callback was written, so it can be given back the same way
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    Absolute,
    Path,
    Query,
}

fn resolve(input: &str) -> Option<(Url, Form)> {
    if let Ok(url) = Url::parse(input) {
        return Some((url, Form::Absolute));
    }

    let base = Url::parse(RELATIVE_BASE).ok()?;
    if input.starts_with('/') || (input.contains('?') && !input.starts_with('?')) {
        return base.join(input).ok().map(|url| (url, Form::Path));
    }

    let mut url = base;
    url.set_query(Some(input.trim_start_matches('?')));
    Some((url, Form::Query))
}

/// Strip OAuth parameters from a callback URL, keeping everything else
pub fn sanitize_callback_url(input: &str) -> String {
    let Some((mut url, form)) = resolve(input) else {
        return input.to_string();
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !CALLBACK_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    match form {
        Form::Absolute => url.into(),
        Form::Path => url[Position::BeforePath..].to_string(),
        Form::Query => url.query().unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OAuthClient {
        OAuthClient {
            client_id: "ck_123".into(),
            client_secret: "shh".into(),
            redirect_uri: "https://app.example.com/settings".into(),
            scopes: vec!["user.info.basic".into(), "video.publish".into()],
        }
    }

    #[test]
    fn test_state_is_random_and_long() {
        let a = new_state();
        assert_ne!(a, new_state());
        assert_eq!(URL_SAFE_NO_PAD.decode(&a).unwrap().len(), 32);
    }

    #[test]
    fn test_pkce_rfc7636_vector() {
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCQaoeCUYnVHxWNpSt8yw5ZM"
        );
    }

    #[test]
    fn test_authorize_url() {
        let url =
            authorize_url("https://www.tiktok.com/v2/auth/authorize/", &client(), "S1", "CH").unwrap();
        assert!(url.starts_with("https://www.tiktok.com/v2/auth/authorize/?client_key=ck_123"));
        assert!(url.contains("scope=user.info.basic%2Cvideo.publish"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fsettings"));
        assert!(url.contains("state=S1"));
        assert!(url.contains("code_challenge_method=S256"));

        assert!(matches!(
            authorize_url("not a url", &client(), "S1", "CH"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_callback() {
        let params = CallbackParams::parse("https://app.example.com/settings?code=abc%2A&state=S1&tab=social");
        assert_eq!(params.code.as_deref(), Some("abc*"));
        assert_eq!(params.state.as_deref(), Some("S1"));
        assert!(!params.is_empty());

        let denied = CallbackParams::parse(
            "https://app.example.com/settings?error=access_denied&error_description=User+cancelled",
        );
        assert_eq!(denied.error_description.as_deref(), Some("User cancelled"));

        assert!(CallbackParams::parse("https://app.example.com/settings?tab=social").is_empty());
    }

    #[test]
    fn test_parse_relative_callbacks() {
        let bare = CallbackParams::parse("code=abc&state=S/1");
        assert_eq!(bare.code.as_deref(), Some("abc"));
        assert_eq!(bare.state.as_deref(), Some("S/1"));

        let leading = CallbackParams::parse("?code=abc&state=S1");
        assert_eq!(leading.code.as_deref(), Some("abc"));

        let path = CallbackParams::parse("/settings?tab=social&code=x%2Fy&state=S1#top");
        assert_eq!(path.code.as_deref(), Some("x/y"));
        assert_eq!(path.state.as_deref(), Some("S1"));
    }

    #[test]
    fn test_sanitize_keeps_unrelated_params() {
        assert_eq!(
            sanitize_callback_url("https://app.example.com/settings?code=abc&tab=social&state=S1#top"),
            "https://app.example.com/settings?tab=social#top"
        );
        assert_eq!(
            sanitize_callback_url("https://app.example.com/settings?code=abc&state=S1"),
            "https://app.example.com/settings"
        );
        assert_eq!(
            sanitize_callback_url("/settings?tab=social&code=abc&state=S1#top"),
            "/settings?tab=social#top"
        );
        assert_eq!(sanitize_callback_url("code=abc&state=S/1&tab=social"), "tab=social");
        assert_eq!(sanitize_callback_url("code=abc&state=S1"), "");
    }

    #[test]
    fn test_state_ttl() {
        let now = Utc::now();
        assert!(state_is_fresh(now - Duration::minutes(9), now));
        assert!(!state_is_fresh(now - Duration::minutes(11), now));
    }
}
