// ABOUTME: SiliconFlow adapter; the API mirrors the OpenAI chat completions transport
// ABOUTME: but runs with a reduced share of the model's token ceiling.

use super::{ChatRequest, openai};
use crate::error::ChatError;
use crate::settings::model::ProviderConfig;

const DEFAULT_HOST: &str = "https://api.siliconflow.cn/v1";

pub(super) async fn chat(
    http: &reqwest::Client,
    config: &ProviderConfig,
    temperature: f64,
    max_tokens: u32,
    request: &ChatRequest,
) -> Result<String, ChatError> {
    openai::send(
        http,
        openai::host_or_default(&config.api_host, DEFAULT_HOST),
        &config.api_key,
        &config.model,
        temperature,
        effective_max_tokens(max_tokens),
        request,
    )
    .await
}

/// SiliconFlow rejects requests near the full ceiling; use half of it,
/// rounded down to an even number.
pub(super) fn effective_max_tokens(max_tokens: u32) -> u32 {
    max_tokens / 4 * 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_is_halved_and_even() {
        assert_eq!(effective_max_tokens(8192), 4096);
        assert_eq!(effective_max_tokens(4096), 2048);
        assert_eq!(effective_max_tokens(100_000), 50_000);
        assert_eq!(effective_max_tokens(10), 4);
    }
}
