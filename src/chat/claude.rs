// ABOUTME: Anthropic-compatible messages adapter (raw HTTP, x-api-key auth).
// ABOUTME: The system prompt rides at the top level of the body, not as a message turn.

use serde_json::json;

use super::{ChatRequest, message, openai};
use crate::error::ChatError;
use crate::settings::model::ProviderConfig;

const DEFAULT_HOST: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub(super) async fn chat(
    http: &reqwest::Client,
    config: &ProviderConfig,
    temperature: f64,
    max_tokens: u32,
    request: &ChatRequest,
) -> Result<String, ChatError> {
    let messages = message::claude_messages(request)?;
    let mut body = json!({
        "model": config.model,
        "messages": messages,
        "max_tokens": max_tokens,
        "temperature": temperature,
    });
    if let Some(system) = request.system.as_deref() {
        if !system.is_empty() {
            body["system"] = json!(system);
        }
    }

    let base = openai::host_or_default(&config.api_host, DEFAULT_HOST);
    let url = format!("{}/v1/messages", base.trim_end_matches('/'));

    let response = http
        .post(&url)
        .header("x-api-key", &config.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
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
            openai::snippet(&text)
        )));
    }

    let payload: serde_json::Value = response
        .json()
        .await
        .map_err(|err| ChatError::Provider(format!("invalid response body: {}", err)))?;

    payload
        .pointer("/content/0/text")
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(|| ChatError::Provider("response missing content[0].text".to_string()))
}
