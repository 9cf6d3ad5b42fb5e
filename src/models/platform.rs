//! Platform type definitions

use serde::{Deserialize, Serialize};

/// External social networks SocialDesk can link to and post on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Platform {
    /// Instagram professional account (Meta family)
    Instagram,
    /// Facebook page (Meta family)
    Facebook,
    /// TikTok account
    TikTok,
}

/// How a platform hands out access tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFlow {
    /// Provider SDK runs in a popup and returns the token directly
    Popup,
    /// Browser is redirected away and comes back with `?code=&state=`
    Redirect,
}

impl Platform {
    /// Get all supported platforms
    pub const fn all() -> &'static [Self] {
        &[Self::Instagram, Self::Facebook, Self::TikTok]
    }

    /// Get the display name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Instagram => "Instagram",
            Self::Facebook => "Facebook",
            Self::TikTok => "TikTok",
        }
    }

    /// Wire/storage representation (`INSTAGRAM`, `FACEBOOK`, `TIKTOK`)
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "INSTAGRAM",
            Self::Facebook => "FACEBOOK",
            Self::TikTok => "TIKTOK",
        }
    }

    /// Document key used under `users/{uid}/integrations/`
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::TikTok => "tiktok",
        }
    }

    /// Linking flow used by the platform
    pub const fn flow(&self) -> LinkFlow {
        match self {
            Self::Instagram | Self::Facebook => LinkFlow::Popup,
            Self::TikTok => LinkFlow::Redirect,
        }
    }

    /// Whether the platform authorizes through the Meta app
    pub const fn is_meta(&self) -> bool {
        matches!(self, Self::Instagram | Self::Facebook)
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "instagram" | "ig" => Some(Self::Instagram),
            "facebook" | "fb" => Some(Self::Facebook),
            "tiktok" | "tt" => Some(Self::TikTok),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_wire_and_short_forms() {
        assert_eq!(Platform::from_str("INSTAGRAM"), Some(Platform::Instagram));
        assert_eq!(Platform::from_str("fb"), Some(Platform::Facebook));
        assert_eq!(Platform::from_str(" TikTok "), Some(Platform::TikTok));
        assert_eq!(Platform::from_str("whatsapp"), None);
    }

    #[test]
    fn test_serde_uses_uppercase() {
        let json = serde_json::to_string(&Platform::TikTok).unwrap();
        assert_eq!(json, "\"TIKTOK\"");
    }

    #[test]
    fn test_flows() {
        assert_eq!(Platform::Instagram.flow(), LinkFlow::Popup);
        assert_eq!(Platform::TikTok.flow(), LinkFlow::Redirect);
    }
}
