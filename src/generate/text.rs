//! Caption backends

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::error::{Error, Result};

use super::Prompt;

/// Produces caption text for a prompt
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    /// Generate a caption
    async fn generate(&self, prompt: &Prompt) -> Result<String>;
}

/// Chat-completions style HTTP backend
#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

const SYSTEM_PROMPT: &str = "You write social media captions for an Indonesian Hajj and Umrah \
     travel agency. Answer with the caption only.";

impl HttpTextGenerator {
    /// Create a backend
    pub fn new(client: Client, endpoint: &str, model: &str, api_key: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let user = prompt.text();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.8,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Configuration(
                "generation.api_key was rejected by the generation backend".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!("generation backend returned {status}: {body}")));
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Internal("generation backend returned no text".to_string()))
    }
}

/// Offline captions for setups without a generation key
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGenerator;

impl TextGenerator for TemplateGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        Ok(format!(
            "[SIMULATED AI] Caption for {} about {}. #Travel #Umrah",
            prompt.platform, prompt.topic
        ))
    }
}

/// Backend picked from configuration
#[derive(Debug, Clone)]
pub enum TextBackend {
    /// Remote model
    Http(HttpTextGenerator),
    /// Offline template
    Template(TemplateGenerator),
}

impl TextBackend {
    /// HTTP backend when an API key is configured, templates otherwise
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let Some(api_key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            tracing::info!("no generation API key; using offline captions");
            return Ok(Self::Template(TemplateGenerator));
        };

        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::Http(HttpTextGenerator::new(
            client,
            &config.endpoint,
            &config.model,
            api_key,
        )))
    }
}

impl TextGenerator for TextBackend {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        match self {
            Self::Http(g) => g.generate(prompt).await,
            Self::Template(g) => g.generate(prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prompt() -> Prompt {
        Prompt {
            topic: "PROMO".into(),
            platform: "INSTAGRAM".into(),
            tone: None,
        }
    }

    #[test]
    fn test_template() {
        let text = tokio_test::block_on(TemplateGenerator.generate(&prompt())).unwrap();
        assert_eq!(text, "[SIMULATED AI] Caption for INSTAGRAM about PROMO. #Travel #Umrah");
    }

    #[tokio::test]
    async fn test_http_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({ "model": "gpt-4o-mini" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "  Yuk umrah!  " } }]
            })))
            .mount(&server)
            .await;

        let backend = HttpTextGenerator::new(Client::new(), &server.uri(), "gpt-4o-mini", "sk-test");
        assert_eq!(backend.generate(&prompt()).await.unwrap(), "Yuk umrah!");
    }

    #[tokio::test]
    async fn test_http_backend_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let backend = HttpTextGenerator::new(Client::new(), &server.uri(), "m", "k");
        assert_eq!(backend.generate(&prompt()).await.unwrap_err().code(), "internal");
    }

    #[test]
    fn test_backend_selection() {
        let config = GenerationConfig::default();
        assert!(matches!(TextBackend::from_config(&config).unwrap(), TextBackend::Template(_)));

        let keyed = GenerationConfig {
            api_key: Some("sk".into()),
            ..GenerationConfig::default()
        };
        assert!(matches!(TextBackend::from_config(&keyed).unwrap(), TextBackend::Http(_)));
    }
}
