// ABOUTME: Model provider catalog, per-model token ceilings, and the ModelSettings view
// ABOUTME: handed to the chat client once per batch start.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MAX_TOKENS: u32 = 8 * 1024;

/// Active AI service provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelProvider {
    #[serde(rename = "OpenAI")]
    OpenAi,
    Claude,
    SiliconFlow,
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelProvider::OpenAi => "OpenAI",
            ModelProvider::Claude => "Claude",
            ModelProvider::SiliconFlow => "SiliconFlow",
        };
        f.write_str(name)
    }
}

impl FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ModelProvider::OpenAi),
            "claude" => Ok(ModelProvider::Claude),
            "siliconflow" => Ok(ModelProvider::SiliconFlow),
            other => Err(format!("unsupported provider: {}", other)),
        }
    }
}

/// Vision-capable models per provider, used for CLI listings and defaults.
pub mod catalog {
    pub const OPENAI: [&str; 5] = [
        "o1",
        "gpt-4.5-preview",
        "gpt-4o",
        "gpt-4o-mini",
        "gpt-4-turbo",
    ];

    pub const CLAUDE: [&str; 6] = [
        "claude-3-7-sonnet-20250219",
        "claude-3-5-sonnet-20241022",
        "claude-3-5-sonnet-20240620",
        "claude-3-5-haiku-20241022",
        "claude-3-opus-20240229",
        "claude-3-haiku-20240307",
    ];

    pub const SILICONFLOW: [&str; 7] = [
        "deepseek-ai/deepseek-vl2",
        "Qwen/QVQ-72B-Preview",
        "Qwen/Qwen2-VL-72B-Instruct",
        "Pro/Qwen/Qwen2-VL-7B-Instruct",
        "Qwen/Qwen2.5-VL-32B-Instruct",
        "Qwen/Qwen2.5-VL-72B-Instruct",
        "Pro/Qwen/Qwen2.5-VL-7B-Instruct",
    ];
}

lazy_static! {
    /// Output-token ceilings per model. Unknown models fall back to
    /// [`DEFAULT_MAX_TOKENS`].
    static ref MAX_TOKEN_MAP: HashMap<&'static str, u32> = HashMap::from([
        ("o1", 100_000),
        ("gpt-4.5-preview", 16 * 1024),
        ("gpt-4o", 16 * 1024),
        ("gpt-4o-mini", 16 * 1024),
        ("gpt-4-turbo", 4 * 1024),
        ("claude-3-7-sonnet-20250219", 8 * 1024),
        ("claude-3-5-sonnet-20241022", 8 * 1024),
        ("claude-3-5-sonnet-20240620", 8 * 1024),
        ("claude-3-5-haiku-20241022", 8 * 1024),
        ("claude-3-opus-20240229", 4 * 1024),
        ("claude-3-haiku-20240307", 4 * 1024),
        ("deepseek-ai/deepseek-vl2", 4 * 1024),
        ("Qwen/QVQ-72B-Preview", 16 * 1024),
        ("Qwen/Qwen2-VL-72B-Instruct", 4 * 1024),
        ("Pro/Qwen/Qwen2-VL-7B-Instruct", 4 * 1024),
        ("Qwen/Qwen2.5-VL-32B-Instruct", 8 * 1024),
        ("Qwen/Qwen2.5-VL-72B-Instruct", 4 * 1024),
        ("Pro/Qwen/Qwen2.5-VL-7B-Instruct", 4 * 1024),
    ]);
}

pub fn max_tokens_for(model: &str) -> u32 {
    MAX_TOKEN_MAP.get(model).copied().unwrap_or(DEFAULT_MAX_TOKENS)
}

/// Credentials, host, and model for one provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    pub api_host: String,
    pub model: String,
}

/// The model settings the core reads once per run. Read-only to the chat
/// client and batch engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    pub provider: ModelProvider,
    pub openai: ProviderConfig,
    pub claude: ProviderConfig,
    pub siliconflow: ProviderConfig,
    pub temperature: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: ModelProvider::OpenAi,
            openai: ProviderConfig {
                model: catalog::OPENAI[0].to_string(),
                ..Default::default()
            },
            claude: ProviderConfig {
                model: catalog::CLAUDE[0].to_string(),
                ..Default::default()
            },
            siliconflow: ProviderConfig {
                model: catalog::SILICONFLOW[0].to_string(),
                ..Default::default()
            },
            temperature: 0.7,
        }
    }
}

impl ModelSettings {
    /// Configuration for the active provider.
    pub fn active(&self) -> &ProviderConfig {
        match self.provider {
            ModelProvider::OpenAi => &self.openai,
            ModelProvider::Claude => &self.claude,
            ModelProvider::SiliconFlow => &self.siliconflow,
        }
    }

    pub fn active_mut(&mut self) -> &mut ProviderConfig {
        match self.provider {
            ModelProvider::OpenAi => &mut self.openai,
            ModelProvider::Claude => &mut self.claude,
            ModelProvider::SiliconFlow => &mut self.siliconflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_models_use_their_table_ceiling() {
        assert_eq!(max_tokens_for("o1"), 100_000);
        assert_eq!(max_tokens_for("gpt-4-turbo"), 4096);
        assert_eq!(max_tokens_for("claude-3-7-sonnet-20250219"), 8192);
        assert_eq!(max_tokens_for("Qwen/QVQ-72B-Preview"), 16384);
    }

    #[test]
    fn unknown_models_fall_back_to_default() {
        assert_eq!(max_tokens_for("some-future-model"), DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<ModelProvider>().unwrap(), ModelProvider::OpenAi);
        assert_eq!("claude".parse::<ModelProvider>().unwrap(), ModelProvider::Claude);
        assert_eq!(
            "SILICONFLOW".parse::<ModelProvider>().unwrap(),
            ModelProvider::SiliconFlow
        );
        assert!("ollama".parse::<ModelProvider>().is_err());
    }

    #[test]
    fn provider_serializes_with_canonical_names() {
        assert_eq!(
            serde_json::to_value(ModelProvider::OpenAi).unwrap(),
            serde_json::json!("OpenAI")
        );
        assert_eq!(
            serde_json::to_value(ModelProvider::SiliconFlow).unwrap(),
            serde_json::json!("SiliconFlow")
        );
    }

    #[test]
    fn defaults_select_each_catalog_head() {
        let settings = ModelSettings::default();
        assert_eq!(settings.openai.model, "o1");
        assert_eq!(settings.claude.model, "claude-3-7-sonnet-20250219");
        assert_eq!(settings.siliconflow.model, "deepseek-ai/deepseek-vl2");
        assert_eq!(settings.temperature, 0.7);
    }

    #[test]
    fn active_follows_the_selected_provider() {
        let mut settings = ModelSettings::default();
        settings.provider = ModelProvider::Claude;
        settings.claude.api_key = "k".to_string();
        assert_eq!(settings.active().api_key, "k");
    }
}
