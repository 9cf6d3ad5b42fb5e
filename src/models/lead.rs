//! CRM lead model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Temperature of a lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeadStatus {
    /// Not yet contacted
    #[default]
    New,
    /// Showing interest
    Warm,
    /// Ready to book
    Hot,
    /// Unresponsive
    Cold,
}

impl LeadStatus {
    /// Get status as string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Warm => "WARM",
            Self::Hot => "HOT",
            Self::Cold => "COLD",
        }
    }

    /// Parse status from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NEW" => Some(Self::New),
            "WARM" => Some(Self::Warm),
            "HOT" => Some(Self::Hot),
            "COLD" => Some(Self::Cold),
            _ => None,
        }
    }
}

/// Acquisition channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeadSource {
    /// WhatsApp chat
    Whatsapp,
    /// Facebook
    Facebook,
    /// Instagram
    Instagram,
    /// TikTok
    Tiktok,
    /// Website form
    #[default]
    Web,
}

impl LeadSource {
    /// Get source as string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Whatsapp => "WHATSAPP",
            Self::Facebook => "FACEBOOK",
            Self::Instagram => "INSTAGRAM",
            Self::Tiktok => "TIKTOK",
            Self::Web => "WEB",
        }
    }

    /// Parse source from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "WHATSAPP" => Some(Self::Whatsapp),
            "FACEBOOK" => Some(Self::Facebook),
            "INSTAGRAM" => Some(Self::Instagram),
            "TIKTOK" => Some(Self::Tiktok),
            "WEB" => Some(Self::Web),
            _ => None,
        }
    }
}

/// A prospective customer (`leads/{leadId}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    /// Unique identifier
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Contact name
    pub name: String,
    /// Phone number
    #[serde(default)]
    pub phone: String,
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Where the lead came from
    #[serde(default)]
    pub platform: LeadSource,
    /// Current temperature
    #[serde(default)]
    pub status: LeadStatus,
    /// Free-text notes
    #[serde(default)]
    pub notes: String,
    /// Last contact
    #[serde(default = "Utc::now")]
    pub last_contact_at: DateTime<Utc>,
    /// When the lead was recorded
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Lead list filter: optional status plus a search over name and phone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadFilter {
    /// Only leads with this status
    pub status: Option<LeadStatus>,
    /// Case-insensitive substring of name or phone
    pub search: String,
}

impl LeadFilter {
    /// Whether a lead passes the filter
    pub fn matches(&self, lead: &Lead) -> bool {
        let status_ok = self.status.is_none_or(|s| s == lead.status);
        let term = self.search.trim().to_lowercase();
        let search_ok = term.is_empty()
            || lead.name.to_lowercase().contains(&term)
            || lead.phone.contains(&term);
        status_ok && search_ok
    }
}
