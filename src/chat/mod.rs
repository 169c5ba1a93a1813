// ABOUTME: Provider-dispatched multimodal chat client with timeout enforcement.
// ABOUTME: ChatDispatch is the seam the batch engine and tests substitute transports at.

mod claude;
mod message;
mod openai;
mod siliconflow;

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ChatError;
use crate::settings::SettingsStore;
use crate::settings::model::{ModelProvider, ModelSettings, max_tokens_for};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// One multimodal request: optional system prompt, free text, screenshot paths.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub text: Vec<String>,
    pub images: Vec<PathBuf>,
    /// Per-call deadline; `None` uses [`DEFAULT_TIMEOUT`].
    pub timeout: Option<Duration>,
}

impl ChatRequest {
    pub fn has_payload(&self) -> bool {
        self.text.iter().any(|text| !text.is_empty()) || !self.images.is_empty()
    }
}

/// Send one multimodal request and return the response text.
#[async_trait]
pub trait ChatDispatch: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<String, ChatError>;
}

/// Chat client dispatching to the configured provider. Settings are captured
/// at construction and never mutated; build a new client to pick up changes.
pub struct ChatClient {
    http: reqwest::Client,
    settings: ModelSettings,
}

impl ChatClient {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    pub fn from_store(store: &SettingsStore) -> Self {
        Self::new(store.read_model_settings())
    }

    pub fn provider(&self) -> ModelProvider {
        self.settings.provider
    }
}

#[async_trait]
impl ChatDispatch for ChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<String, ChatError> {
        if !request.has_payload() {
            return Err(ChatError::Validation("at least chat something".to_string()));
        }

        let provider = self.settings.provider;
        let config = self.settings.active();
        if config.model.is_empty() {
            return Err(ChatError::Configuration(format!(
                "no model configured for provider {}",
                provider
            )));
        }

        let max_tokens = max_tokens_for(&config.model);
        let timeout = request.timeout.unwrap_or(DEFAULT_TIMEOUT);
        log::debug!(
            "[Chat] Dispatching to {} model {} ({} texts, {} images)",
            provider,
            config.model,
            request.text.len(),
            request.images.len()
        );

        let call = async {
            match provider {
                ModelProvider::OpenAi => {
                    openai::chat(&self.http, config, self.settings.temperature, max_tokens, &request)
                        .await
                }
                ModelProvider::Claude => {
                    claude::chat(&self.http, config, self.settings.temperature, max_tokens, &request)
                        .await
                }
                ModelProvider::SiliconFlow => {
                    siliconflow::chat(&self.http, config, self.settings.temperature, max_tokens, &request)
                        .await
                }
            }
        };

        // Dropping the timed-out future releases the connection; the vendor
        // side of an abandoned call is not cancelled.
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ChatError::Timeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_request_fails_validation_without_dispatch() {
        let client = ChatClient::new(ModelSettings::default());
        let result = client.chat(ChatRequest::default()).await;
        assert!(matches!(result, Err(ChatError::Validation(_))));
    }

    #[tokio::test]
    async fn missing_model_is_a_configuration_error() {
        let mut settings = ModelSettings::default();
        settings.openai.model = String::new();
        let client = ChatClient::new(settings);
        let request = ChatRequest {
            text: vec!["hello".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            client.chat(request).await,
            Err(ChatError::Configuration(_))
        ));
    }

    #[test]
    fn payload_requires_non_empty_text_or_an_image() {
        let empty_text = ChatRequest {
            text: vec![String::new()],
            ..Default::default()
        };
        assert!(!empty_text.has_payload());

        let with_image = ChatRequest {
            images: vec![PathBuf::from("shot.png")],
            ..Default::default()
        };
        assert!(with_image.has_payload());
    }

    #[test]
    fn timeout_error_reports_seconds() {
        let err = ChatError::Timeout(Duration::from_secs(120));
        assert_eq!(err.to_string(), "chat request timed out after 120 seconds");
    }
}
