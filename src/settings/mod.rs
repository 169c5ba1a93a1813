// ABOUTME: Grouped key/value settings persisted as a JSON document.
// ABOUTME: Reads never fail; API keys are encrypted at rest via the crypto module.

pub mod crypto;
pub mod model;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::constants;
use crypto::CryptoError;
use model::{ModelProvider, ModelSettings, ProviderConfig};

const GROUP_PROVIDER: &str = "Provider";
const GROUP_OPENAI: &str = "OpenAI";
const GROUP_CLAUDE: &str = "Claude";
const GROUP_SILICONFLOW: &str = "SiliconFlow";
const GROUP_CONTEXT: &str = "Context";
const GROUP_PROMPT: &str = "Prompt";
const GROUP_ENCRYPTION: &str = "encryption";
const GROUP_UPLOAD_CODE: &str = "upload_code";

/// Grouped settings backed by one JSON file. Every write is flushed to disk,
/// so concurrent readers in the same process always see the latest values.
pub struct SettingsStore {
    path: PathBuf,
    groups: Mutex<Map<String, Value>>,
}

impl SettingsStore {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(constants::APPLICATION)
            .join("settings.json")
    }

    pub fn open_default() -> Self {
        Self::open(Self::default_path())
    }

    /// Open a store at `path`. A missing or corrupt file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let groups = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<Map<String, Value>>(&text).unwrap_or_else(|err| {
                log::warn!(
                    "[Settings] Ignoring corrupt settings file {}: {}",
                    path.display(),
                    err
                );
                Map::new()
            }),
            Err(_) => Map::new(),
        };
        Self {
            path,
            groups: Mutex::new(groups),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get<T: DeserializeOwned>(&self, group: &str, key: &str) -> Option<T> {
        let groups = self.groups.lock().unwrap();
        groups
            .get(group)?
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn get_or<T: DeserializeOwned>(&self, group: &str, key: &str, default: T) -> T {
        self.get(group, key).unwrap_or(default)
    }

    pub fn set<T: Serialize>(&self, group: &str, key: &str, value: T) {
        {
            let mut groups = self.groups.lock().unwrap();
            let entry = groups
                .entry(group.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = entry {
                map.insert(
                    key.to_string(),
                    serde_json::to_value(value).unwrap_or(Value::Null),
                );
            }
        }
        self.sync();
    }

    fn sync(&self) {
        let snapshot = self.groups.lock().unwrap().clone();
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&Value::Object(snapshot)) {
            Ok(text) => {
                if let Err(err) = std::fs::write(&self.path, text) {
                    log::error!(
                        "[Settings] Failed to write settings file {}: {}",
                        self.path.display(),
                        err
                    );
                }
            }
            Err(err) => log::error!("[Settings] Failed to serialize settings: {}", err),
        }
    }

    // ------------------------------------------------------------------
    // Encryption key
    // ------------------------------------------------------------------

    /// The AES-256 key protecting credentials, generated and stored on first use.
    pub fn encryption_key(&self) -> Result<[u8; crypto::KEY_LEN], CryptoError> {
        if let Some(encoded) = self.get::<String>(GROUP_ENCRYPTION, "key") {
            let bytes = STANDARD.decode(&encoded).map_err(|_| CryptoError::InvalidKey)?;
            bytes.try_into().map_err(|_| CryptoError::InvalidKey)
        } else {
            let key = crypto::generate_key();
            log::info!("[Settings] Generated new AES-256 key");
            self.set(GROUP_ENCRYPTION, "key", STANDARD.encode(key));
            Ok(key)
        }
    }

    // ------------------------------------------------------------------
    // Model settings
    // ------------------------------------------------------------------

    /// Read the model settings, decrypting stored API keys. A credential that
    /// fails to decrypt is logged and replaced with an empty string; the
    /// provider call will then fail auth downstream instead of settings load
    /// aborting here.
    pub fn read_model_settings(&self) -> ModelSettings {
        let defaults = ModelSettings::default();
        ModelSettings {
            provider: self.get_or(GROUP_PROVIDER, "provider", defaults.provider),
            openai: self.read_provider_config(GROUP_OPENAI, defaults.openai),
            claude: self.read_provider_config(GROUP_CLAUDE, defaults.claude),
            siliconflow: self.read_provider_config(GROUP_SILICONFLOW, defaults.siliconflow),
            temperature: self.get_or(GROUP_CONTEXT, "temperature", defaults.temperature),
        }
    }

    fn read_provider_config(&self, group: &str, defaults: ProviderConfig) -> ProviderConfig {
        let api_key = match self.get::<String>(group, "api_key") {
            Some(stored) => self.decrypt_credential(group, &stored),
            None => defaults.api_key,
        };
        ProviderConfig {
            api_key,
            api_host: self.get_or(group, "api_host", defaults.api_host),
            model: self.get_or(group, "model", defaults.model),
        }
    }

    fn decrypt_credential(&self, group: &str, stored: &str) -> String {
        if stored.is_empty() {
            return String::new();
        }
        match self
            .encryption_key()
            .and_then(|key| crypto::decrypt(&key, stored))
        {
            Ok(plain) => plain,
            Err(err) => {
                log::error!("[Settings] Error decrypting {} api key: {}", group, err);
                String::new()
            }
        }
    }

    /// Persist the model settings, encrypting API keys at rest.
    pub fn write_model_settings(&self, settings: &ModelSettings) -> Result<(), CryptoError> {
        let key = self.encryption_key()?;

        self.set(GROUP_PROVIDER, "provider", settings.provider);
        let providers = [
            (GROUP_OPENAI, &settings.openai),
            (GROUP_CLAUDE, &settings.claude),
            (GROUP_SILICONFLOW, &settings.siliconflow),
        ];
        for (group, config) in providers {
            self.set(group, "api_key", crypto::encrypt(&key, &config.api_key)?);
            self.set(group, "api_host", &config.api_host);
            self.set(group, "model", &config.model);
        }
        self.set(GROUP_CONTEXT, "temperature", settings.temperature.clamp(0.0, 2.0));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Prompts & batch preferences
    // ------------------------------------------------------------------

    pub fn content_prompt(&self) -> String {
        self.get_or(GROUP_PROMPT, "content", constants::PROMPT_CONTENT.to_string())
    }

    pub fn code_prompt(&self) -> String {
        self.get_or(GROUP_PROMPT, "code", constants::PROMPT_CODE.to_string())
    }

    pub fn set_content_prompt(&self, prompt: &str) {
        self.set(GROUP_PROMPT, "content", prompt);
    }

    pub fn set_code_prompt(&self, prompt: &str) {
        self.set(GROUP_PROMPT, "code", prompt);
    }

    /// Whether code batches upload the annotated source file with the prompt.
    pub fn upload_code_enabled(&self) -> bool {
        self.get_or(GROUP_UPLOAD_CODE, "upload_code", true)
    }

    pub fn set_upload_code_enabled(&self, enabled: bool) {
        self.set(GROUP_UPLOAD_CODE, "upload_code", enabled);
    }

    /// Configure the given provider, encrypting the key before storing it.
    pub fn set_provider_credentials(
        &self,
        provider: ModelProvider,
        api_key: Option<&str>,
        api_host: Option<&str>,
        model: Option<&str>,
    ) -> Result<(), CryptoError> {
        let mut settings = self.read_model_settings();
        let config = match provider {
            ModelProvider::OpenAi => &mut settings.openai,
            ModelProvider::Claude => &mut settings.claude,
            ModelProvider::SiliconFlow => &mut settings.siliconflow,
        };
        if let Some(api_key) = api_key {
            config.api_key = api_key.to_string();
        }
        if let Some(api_host) = api_host {
            config.api_host = api_host.to_string();
        }
        if let Some(model) = model {
            config.model = model.to_string();
        }
        self.write_model_settings(&settings)
    }
}
