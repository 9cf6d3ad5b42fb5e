//! Scheduled post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Platform;

/// Content topic offered by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Topic {
    /// Promotions and offers
    Promo,
    /// Pilgrimage rite education
    Manasik,
    /// Prayers and hadith
    Doa,
    /// Travel tips
    Tips,
}

impl Topic {
    /// Get all topics
    pub const fn all() -> &'static [Self] {
        &[Self::Promo, Self::Manasik, Self::Doa, Self::Tips]
    }

    /// Get topic as string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Promo => "PROMO",
            Self::Manasik => "MANASIK",
            Self::Doa => "DOA",
            Self::Tips => "TIPS",
        }
    }

    /// Human label used in prompts and listings
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Promo => "Promo & Penawaran",
            Self::Manasik => "Edukasi Manasik",
            Self::Doa => "Doa & Hadits",
            Self::Tips => "Tips Travel",
        }
    }

    /// Parse topic from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PROMO" => Some(Self::Promo),
            "MANASIK" => Some(Self::Manasik),
            "DOA" => Some(Self::Doa),
            "TIPS" => Some(Self::Tips),
            _ => None,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a scheduled post.
///
/// `Scheduled` moves forward to exactly one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostStatus {
    /// Waiting for its publish time
    #[default]
    Scheduled,
    /// Published on the platform
    Posted,
    /// Publishing failed
    Failed,
}

impl PostStatus {
    /// Get status as string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Posted => "POSTED",
            Self::Failed => "FAILED",
        }
    }

    /// Parse status from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SCHEDULED" => Some(Self::Scheduled),
            "POSTED" => Some(Self::Posted),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether no further transition is allowed
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Scheduled)
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generated content before it is committed to a publish time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Topic the content was generated for
    pub topic: Topic,
    /// Target platform
    pub platform: Platform,
    /// Caption text
    pub content: String,
    /// Optional branded image
    pub image_url: Option<String>,
}

/// A draft committed to a publish time (`posts/{postId}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledPost {
    /// Unique identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: String,
    /// Content topic
    pub topic: Topic,
    /// Target platform
    pub platform: Platform,
    /// Caption text
    pub content: String,
    /// Optional image
    pub image_url: Option<String>,
    /// Current status
    pub status: PostStatus,
    /// When to publish
    pub scheduled_at: DateTime<Utc>,
    /// When this was created
    pub created_at: DateTime<Utc>,
    /// Why publishing failed
    pub failure_reason: Option<String>,
    /// Platform id of the published post
    pub external_id: Option<String>,
}

impl ScheduledPost {
    /// Create a new scheduled post from a draft
    pub fn new(user_id: impl Into<String>, draft: Draft, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            topic: draft.topic,
            platform: draft.platform,
            content: draft.content,
            image_url: draft.image_url,
            status: PostStatus::Scheduled,
            scheduled_at,
            created_at: Utc::now(),
            failure_reason: None,
            external_id: None,
        }
    }

    /// Check if this post is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == PostStatus::Scheduled && now >= self.scheduled_at
    }

    /// Get a short preview of the content (for list display)
    pub fn preview(&self, max_chars: usize) -> String {
        let content = self.content.replace('\n', " ");
        if content.chars().count() <= max_chars {
            content
        } else {
            let cut: String = content.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{cut}...")
        }
    }

    /// Human-readable time until posting
    pub fn time_until(&self, now: DateTime<Utc>) -> String {
        if self.scheduled_at <= now {
            return "now".to_string();
        }

        let seconds = (self.scheduled_at - now).num_seconds();
        match seconds {
            s if s < 60 => format!("{s}s"),
            s if s < 3600 => format!("{}m", s / 60),
            s if s < 86400 => match (s / 3600, (s % 3600) / 60) {
                (h, 0) => format!("{h}h"),
                (h, m) => format!("{h}h {m}m"),
            },
            s => match (s / 86400, (s % 86400) / 3600) {
                (d, 0) => format!("{d}d"),
                (d, h) => format!("{d}d {h}h"),
            },
        }
    }

    /// Format scheduled time for display
    pub fn scheduled_time_display(&self) -> String {
        self.scheduled_at.format("%Y-%m-%d %H:%M UTC").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft() -> Draft {
        Draft {
            topic: Topic::Promo,
            platform: Platform::Instagram,
            content: "Early bird Ramadhan".to_string(),
            image_url: None,
        }
    }

    #[test]
    fn test_new_post_is_scheduled() {
        let post = ScheduledPost::new("u1", draft(), Utc::now());
        assert_eq!(post.status, PostStatus::Scheduled);
        assert!(!post.status.is_terminal());
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        let post = ScheduledPost::new("u1", draft(), now + Duration::minutes(5));
        assert!(!post.is_due(now));
        assert!(post.is_due(now + Duration::minutes(5)));
    }

    #[test]
    fn test_time_until() {
        let now = Utc::now();
        let post = ScheduledPost::new("u1", draft(), now + Duration::minutes(90));
        assert_eq!(post.time_until(now), "1h 30m");
        assert_eq!(post.time_until(now + Duration::hours(2)), "now");
    }

    #[test]
    fn test_preview_is_char_safe() {
        let mut post = ScheduledPost::new("u1", draft(), Utc::now());
        post.content = "日本語のテキストです".to_string();
        assert_eq!(post.preview(8), "日本語のテ...");
    }
}
