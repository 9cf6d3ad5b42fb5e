//! Content generation gateway
//!
//! Validates a request, asks the text backend for a caption under a time
//! limit, then tries to attach a branded image. The image step is best
//! effort: its failure never discards the caption.

pub mod image;
pub mod text;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::{Actor, Draft, Platform, Topic};

pub use image::{BrandImageGenerator, ImageGenerator};
pub use text::{HttpTextGenerator, TemplateGenerator, TextBackend, TextGenerator};

/// What to write about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Topic (`PROMO`, `MANASIK`, ... or free text)
    #[serde(default)]
    pub topic: String,
    /// Target platform name
    #[serde(default)]
    pub platform: String,
    /// Optional tone of voice
    #[serde(default)]
    pub tone: Option<String>,
    /// Also produce a branded image
    #[serde(default)]
    pub include_image: bool,
}

impl GenerationRequest {
    /// Request for a known topic and platform
    pub fn new(topic: Topic, platform: Platform) -> Self {
        Self {
            topic: topic.as_str().to_string(),
            platform: platform.as_str().to_string(),
            tone: None,
            include_image: false,
        }
    }
}

/// Inputs handed to the backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Topic as requested
    pub topic: String,
    /// Platform as requested
    pub platform: String,
    /// Tone, if any
    pub tone: Option<String>,
}

impl Prompt {
    /// Instruction text for a language model
    pub fn text(&self) -> String {
        let subject = Topic::from_str(&self.topic).map_or(self.topic.as_str(), |t| t.label());
        let platform = Platform::from_str(&self.platform).map_or(self.platform.as_str(), |p| p.name());
        let tone = self.tone.as_deref().unwrap_or("warm and inspiring");

        format!(
            "Write a {platform} caption about \"{subject}\" for a Hajj and Umrah travel agency. \
             Tone: {tone}. Write in Indonesian, end with a call to action and 3-5 relevant hashtags."
        )
    }
}

/// Generation result as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    /// Always `true` for a returned value
    pub success: bool,
    /// Caption text
    pub data: String,
    /// Branded image, when requested and available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// When the content was generated
    pub timestamp: DateTime<Utc>,
}

impl GeneratedContent {
    /// Turn into a draft when topic and platform are known values
    pub fn into_draft(self, request: &GenerationRequest) -> Result<Draft> {
        let topic = Topic::from_str(&request.topic)
            .ok_or_else(|| Error::invalid(format!("unknown topic '{}'", request.topic)))?;
        let platform = Platform::from_str(&request.platform)
            .ok_or_else(|| Error::invalid(format!("unknown platform '{}'", request.platform)))?;

        Ok(Draft {
            topic,
            platform,
            content: self.data,
            image_url: self.image,
        })
    }
}

/// Front door for generation
pub struct ContentGateway<T, I> {
    text: T,
    image: I,
    timeout: Duration,
}

impl<T: TextGenerator, I: ImageGenerator> ContentGateway<T, I> {
    /// Create a gateway
    pub const fn new(text: T, image: I, timeout: Duration) -> Self {
        Self {
            text,
            image,
            timeout,
        }
    }

    /// Generate a caption (and optionally an image)
    pub async fn generate(
        &self,
        actor: Option<&Actor>,
        request: &GenerationRequest,
    ) -> Result<GeneratedContent> {
        let actor = actor.ok_or(Error::Unauthenticated)?;

        let topic = request.topic.trim();
        let platform = request.platform.trim();
        if topic.is_empty() || platform.is_empty() {
            return Err(Error::invalid("both \"topic\" and \"platform\" are required"));
        }

        let prompt = Prompt {
            topic: topic.to_string(),
            platform: platform.to_string(),
            tone: request.tone.clone().filter(|t| !t.trim().is_empty()),
        };

        tracing::debug!(uid = %actor.uid, %topic, %platform, "generating content");
        let data = tokio::time::timeout(self.timeout, self.text.generate(&prompt))
            .await
            .map_err(|_| Error::Timeout("content generation".to_string()))??;

        let image = if request.include_image {
            match self.image.generate(&prompt, &data).await {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("image generation failed, keeping caption: {e}");
                    None
                }
            }
        } else {
            None
        };

        Ok(GeneratedContent {
            success: true,
            data,
            image,
            timestamp: Utc::now(),
        })
    }
}
