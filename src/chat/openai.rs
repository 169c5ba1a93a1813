// ABOUTME: OpenAI-compatible chat completions adapter; SiliconFlow shares this transport.
// ABOUTME: Non-2xx statuses and malformed bodies surface as provider errors with a body snippet.

use serde_json::json;

use super::{ChatRequest, message};
use crate::error::ChatError;
use crate::settings::model::ProviderConfig;

const DEFAULT_HOST: &str = "https://api.openai.com/v1";

pub(super) async fn chat(
    http: &reqwest::Client,
    config: &ProviderConfig,
    temperature: f64,
    max_tokens: u32,
    request: &ChatRequest,
) -> Result<String, ChatError> {
    send(
        http,
        host_or_default(&config.api_host, DEFAULT_HOST),
        &config.api_key,
        &config.model,
        temperature,
        max_tokens,
        request,
    )
    .await
}

/// POST a chat completions request and extract the reply text.
pub(super) async fn send(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    temperature: f64,
    max_tokens: u32,
    request: &ChatRequest,
) -> Result<String, ChatError> {
    let messages = message::openai_messages(request)?;
    let body = json!({
        "model": model,
        "messages": messages,
        "max_tokens": max_tokens,
        "temperature": temperature,
    });
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    let response = http
        .post(&url)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(|err| ChatError::Provider(format!("request to {} failed: {}", url, err)))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ChatError::Provider(format!(
            "HTTP {}: {}",
            status,
            snippet(&text)
        )));
    }

    let payload: serde_json::Value = response
        .json()
        .await
        .map_err(|err| ChatError::Provider(format!("invalid response body: {}", err)))?;

    payload
        .pointer("/choices/0/message/content")
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ChatError::Provider("response missing choices[0].message.content".to_string())
        })
}

pub(super) fn host_or_default<'a>(host: &'a str, default: &'a str) -> &'a str {
    let trimmed = host.trim();
    if trimmed.is_empty() { default } else { trimmed }
}

pub(super) fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_host_falls_back_to_default() {
        assert_eq!(host_or_default("", DEFAULT_HOST), DEFAULT_HOST);
        assert_eq!(host_or_default("   ", DEFAULT_HOST), DEFAULT_HOST);
        assert_eq!(
            host_or_default("https://proxy.test/v1", DEFAULT_HOST),
            "https://proxy.test/v1"
        );
    }

    #[test]
    fn snippet_truncates_long_bodies_safely() {
        let long = "é".repeat(500);
        let cut = snippet(&long);
        assert_eq!(cut.chars().count(), 200);
    }

    #[tokio::test]
    async fn unreachable_host_surfaces_a_provider_error() {
        let http = reqwest::Client::new();
        let config = ProviderConfig {
            api_key: "sk-test".to_string(),
            api_host: "http://127.0.0.1:9".to_string(),
            model: "gpt-4o".to_string(),
        };
        let request = ChatRequest {
            system: None,
            text: vec!["hello".to_string()],
            images: vec![],
            timeout: None,
        };
        let result = chat(&http, &config, 0.7, 1024, &request).await;
        assert!(matches!(result, Err(ChatError::Provider(_))));
    }
}
