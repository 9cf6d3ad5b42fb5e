//! Branded image URLs

use crate::error::{Error, Result};

use super::Prompt;

/// Produces an image URL to go with a caption
#[allow(async_fn_in_trait)]
pub trait ImageGenerator {
    /// Image for `prompt`, given the caption already produced
    async fn generate(&self, prompt: &Prompt, caption: &str) -> Result<String>;
}

/// Fills a URL template understood by the external compositing service.
///
/// Placeholders: `{topic}`, `{platform}`, `{caption}` (all URL-encoded).
#[derive(Debug, Clone, Default)]
pub struct BrandImageGenerator {
    template: Option<String>,
}

/// Characters of caption passed to the compositor
const CAPTION_LIMIT: usize = 120;

impl BrandImageGenerator {
    /// Create a generator; `None` disables images
    pub const fn new(template: Option<String>) -> Self {
        Self { template }
    }
}

impl ImageGenerator for BrandImageGenerator {
    async fn generate(&self, prompt: &Prompt, caption: &str) -> Result<String> {
        let template = self.template.as_deref().ok_or_else(|| {
            Error::Configuration("generation.image_template is not set".to_string())
        })?;

        let caption: String = caption.chars().take(CAPTION_LIMIT).collect();
        Ok(template
            .replace("{topic}", &urlencoding::encode(&prompt.topic.to_lowercase()))
            .replace("{platform}", &urlencoding::encode(&prompt.platform.to_lowercase()))
            .replace("{caption}", &urlencoding::encode(&caption)))
    }
}
