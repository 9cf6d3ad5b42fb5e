//! Configuration module for SocialDesk
//!
//! Loaded from `config.toml`, then overridden from the environment. Third-party
//! credentials are optional at load time; their absence is reported by the
//! accessor that needs them, at the moment they are needed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;
use crate::paths;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Meta (Facebook/Instagram) app
    #[serde(default)]
    pub meta: MetaConfig,

    /// TikTok app
    #[serde(default)]
    pub tiktok: TikTokConfig,

    /// Password sign-in provider
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Generative text/image backend
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Publishing retries and timeouts
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Document store options
    #[serde(default)]
    pub store: StoreConfig,
}

/// Meta app settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    /// App id (`SOCIALDESK_META_APP_ID`)
    #[serde(default)]
    pub app_id: Option<String>,
    /// App secret (`SOCIALDESK_META_APP_SECRET`)
    #[serde(default)]
    pub app_secret: Option<String>,
    /// Permissions requested by the login popup
    #[serde(default = "default_meta_scopes")]
    pub scopes: Vec<String>,
    /// Graph API base URL
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
}

/// TikTok app settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TikTokConfig {
    /// Client key (`SOCIALDESK_TIKTOK_CLIENT_KEY`)
    #[serde(default)]
    pub client_key: Option<String>,
    /// Client secret (`SOCIALDESK_TIKTOK_CLIENT_SECRET`)
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Registered redirect URI (`SOCIALDESK_TIKTOK_REDIRECT_URI`)
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Requested scopes
    #[serde(default = "default_tiktok_scopes")]
    pub scopes: Vec<String>,
    /// Authorization page
    #[serde(default = "default_tiktok_auth_url")]
    pub auth_url: String,
    /// Open API base URL (token endpoint and content posting)
    #[serde(default = "default_tiktok_api_url")]
    pub api_url: String,
}

/// Sign-in provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// REST endpoint base
    #[serde(default = "default_identity_endpoint")]
    pub endpoint: String,
    /// Web API key (`SOCIALDESK_IDENTITY_API_KEY`)
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Generation backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Chat-completions style endpoint
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,
    /// Model name
    #[serde(default = "default_generation_model")]
    pub model: String,
    /// API key (`SOCIALDESK_GENERATION_API_KEY`); offline captions when unset
    #[serde(default)]
    pub api_key: Option<String>,
    /// Upper bound for one generation call
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    /// Branded image URL template with `{topic}`, `{platform}`, `{caption}`
    #[serde(default)]
    pub image_template: Option<String>,
}

/// Publisher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Attempts per post before it is marked failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First backoff delay; doubles per attempt
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Timeout for every platform API request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// How often `run` looks for due posts
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

/// Store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Create composite indexes on open
    #[serde(default = "default_auto_create_indexes")]
    pub auto_create_indexes: bool,
}

/// OAuth client credentials resolved for a redirect flow
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthClient {
    /// Client identifier
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
    /// Redirect target
    pub redirect_uri: String,
    /// Requested scopes
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

fn default_meta_scopes() -> Vec<String> {
    [
        "instagram_basic",
        "instagram_content_publish",
        "pages_show_list",
        "pages_read_engagement",
        "pages_manage_posts",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_graph_url() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

fn default_tiktok_scopes() -> Vec<String> {
    vec!["user.info.basic".to_string(), "video.publish".to_string()]
}

fn default_tiktok_auth_url() -> String {
    "https://www.tiktok.com/v2/auth/authorize/".to_string()
}

fn default_tiktok_api_url() -> String {
    "https://open.tiktokapis.com".to_string()
}

fn default_identity_endpoint() -> String {
    "https://identitytoolkit.googleapis.com/v1".to_string()
}

fn default_generation_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_generation_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    20
}

fn default_poll_interval() -> u64 {
    60
}

fn default_auto_create_indexes() -> bool {
    true
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_secret: None,
            scopes: default_meta_scopes(),
            graph_url: default_graph_url(),
        }
    }
}

impl Default for TikTokConfig {
    fn default() -> Self {
        Self {
            client_key: None,
            client_secret: None,
            redirect_uri: None,
            scopes: default_tiktok_scopes(),
            auth_url: default_tiktok_auth_url(),
            api_url: default_tiktok_api_url(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            endpoint: default_identity_endpoint(),
            api_key: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_generation_endpoint(),
            model: default_generation_model(),
            api_key: None,
            timeout_secs: default_generation_timeout(),
            image_template: None,
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            request_timeout_secs: default_request_timeout(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            auto_create_indexes: default_auto_create_indexes(),
        }
    }
}

/// Treat empty strings from env or TOML as unset
fn present(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn missing(field: &str, env: &str) -> Error {
    Error::Configuration(format!("{field} is not set (config.toml or {env})"))
}

impl MetaConfig {
    /// App id for the login popup
    pub fn app_id(&self) -> crate::Result<&str> {
        present(self.app_id.as_ref()).ok_or_else(|| missing("meta.app_id", "SOCIALDESK_META_APP_ID"))
    }
}

impl TikTokConfig {
    /// Client credentials for the redirect flow
    pub fn client(&self) -> crate::Result<OAuthClient> {
        let client_id = present(self.client_key.as_ref())
            .ok_or_else(|| missing("tiktok.client_key", "SOCIALDESK_TIKTOK_CLIENT_KEY"))?;
        let client_secret = present(self.client_secret.as_ref())
            .ok_or_else(|| missing("tiktok.client_secret", "SOCIALDESK_TIKTOK_CLIENT_SECRET"))?;
        let redirect_uri = present(self.redirect_uri.as_ref())
            .ok_or_else(|| missing("tiktok.redirect_uri", "SOCIALDESK_TIKTOK_REDIRECT_URI"))?;

        Ok(OAuthClient {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            scopes: self.scopes.clone(),
        })
    }
}

impl IdentityConfig {
    /// Web API key for password sign-in
    pub fn api_key(&self) -> crate::Result<&str> {
        present(self.api_key.as_ref())
            .ok_or_else(|| missing("identity.api_key", "SOCIALDESK_IDENTITY_API_KEY"))
    }
}

impl GenerationConfig {
    /// Timeout for a generation call
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PublisherConfig {
    /// Timeout for a platform API request
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        paths::config_path()
    }

    /// Load config from the default path, then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Override credentials from environment variables
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let overrides: [(&str, &mut Option<String>); 7] = [
            ("SOCIALDESK_META_APP_ID", &mut self.meta.app_id),
            ("SOCIALDESK_META_APP_SECRET", &mut self.meta.app_secret),
            ("SOCIALDESK_TIKTOK_CLIENT_KEY", &mut self.tiktok.client_key),
            ("SOCIALDESK_TIKTOK_CLIENT_SECRET", &mut self.tiktok.client_secret),
            ("SOCIALDESK_TIKTOK_REDIRECT_URI", &mut self.tiktok.redirect_uri),
            ("SOCIALDESK_IDENTITY_API_KEY", &mut self.identity.api_key),
            ("SOCIALDESK_GENERATION_API_KEY", &mut self.generation.api_key),
        ];

        for (key, slot) in overrides {
            if let Some(value) = lookup(key) {
                *slot = Some(value);
            }
        }
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }
}
