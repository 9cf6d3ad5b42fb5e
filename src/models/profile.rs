//! Partner profile model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Organizational tier of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Head office
    Pusat,
    /// Branch office
    Cabang,
    /// Partner (default for new sign-ups)
    #[default]
    Mitra,
}

impl Role {
    /// Get role as string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pusat => "PUSAT",
            Self::Cabang => "CABANG",
            Self::Mitra => "MITRA",
        }
    }

    /// Parse role from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PUSAT" => Some(Self::Pusat),
            "CABANG" => Some(Self::Cabang),
            "MITRA" => Some(Self::Mitra),
            _ => None,
        }
    }
}

/// Payout account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    /// Bank name (e.g. BCA, Mandiri)
    pub bank_name: String,
    /// Account number
    pub account_number: String,
    /// Account holder; must match the registered partner name
    pub account_name: String,
}

/// Public profile URLs per platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    /// Instagram profile URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    /// Facebook profile URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    /// TikTok profile URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiktok: Option<String>,
}

/// Per-user profile (`users/{uid}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id
    pub uid: String,
    /// Email address
    pub email: String,
    /// Display name
    pub display_name: Option<String>,
    /// Avatar URL
    pub photo_url: Option<String>,
    /// Contact phone number
    pub phone_number: Option<String>,
    /// Organizational tier
    pub role: Role,
    /// Payout account
    pub bank_details: Option<BankDetails>,
    /// Social profile links
    pub social_media: SocialLinks,
    /// Fee achievement to date
    pub fee_achievement: f64,
    /// When the profile was created
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Profile created on first sign-in
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            display_name: None,
            photo_url: None,
            phone_number: None,
            role: Role::default(),
            bank_details: None,
            social_media: SocialLinks::default(),
            fee_achievement: 0.0,
            created_at: Utc::now(),
        }
    }

    /// Merge a settings-form update; `None` fields are left untouched
    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(name) = &update.display_name {
            self.display_name = Some(name.clone());
        }
        if let Some(phone) = &update.phone_number {
            self.phone_number = Some(phone.clone());
        }
        if let Some(bank) = &update.bank_details {
            self.bank_details = Some(bank.clone());
        }
        if let Some(links) = &update.social_media {
            if links.instagram.is_some() {
                self.social_media.instagram.clone_from(&links.instagram);
            }
            if links.facebook.is_some() {
                self.social_media.facebook.clone_from(&links.facebook);
            }
            if links.tiktok.is_some() {
                self.social_media.tiktok.clone_from(&links.tiktok);
            }
        }
        if let Some(fee) = update.fee_achievement {
            self.fee_achievement = fee;
        }
    }
}

/// Partial profile update from the settings form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New display name
    pub display_name: Option<String>,
    /// New phone number
    pub phone_number: Option<String>,
    /// New payout account
    pub bank_details: Option<BankDetails>,
    /// Social links to set (unset links are kept)
    pub social_media: Option<SocialLinks>,
    /// New fee achievement
    pub fee_achievement: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile_is_mitra() {
        let profile = UserProfile::new("u1", "a@example.com");
        assert_eq!(profile.role, Role::Mitra);
        assert!(profile.bank_details.is_none());
    }

    #[test]
    fn test_apply_merges_social_links() {
        let mut profile = UserProfile::new("u1", "a@example.com");
        profile.social_media.instagram = Some("https://instagram.com/a".into());

        profile.apply(&ProfileUpdate {
            phone_number: Some("+62 812".into()),
            social_media: Some(SocialLinks {
                tiktok: Some("https://tiktok.com/@a".into()),
                ..SocialLinks::default()
            }),
            ..ProfileUpdate::default()
        });

        assert_eq!(profile.phone_number.as_deref(), Some("+62 812"));
        assert_eq!(
            profile.social_media.instagram.as_deref(),
            Some("https://instagram.com/a")
        );
        assert_eq!(
            profile.social_media.tiktok.as_deref(),
            Some("https://tiktok.com/@a")
        );
    }
}
