use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arduino_lab_contracts::models::{ModelSelector, VisionModel, DEFAULT_IMAGE_MODEL};

use crate::error::EngineError;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_KEY_FILE: &str = "secrets/api_key.txt";
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

pub const ENV_API_BASE: &str = "OPENAI_API_BASE";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_KEY_FILE: &str = "ARDUINO_LAB_API_KEY_FILE";
pub const ENV_MODEL: &str = "ARDUINO_LAB_MODEL";
pub const ENV_IMAGE_MODEL: &str = "ARDUINO_LAB_IMAGE_MODEL";
pub const ENV_TIMEOUT: &str = "ARDUINO_LAB_TIMEOUT_S";

#[derive(Clone)]
pub struct EngineConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub key_file: PathBuf,
    pub vision_model: VisionModel,
    pub image_model: String,
    pub image_size: String,
    /// `None` keeps the HTTP client's default.
    pub request_timeout: Option<Duration>,
    pub events_path: Option<PathBuf>,
    pub receipts_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            key_file: PathBuf::from(DEFAULT_KEY_FILE),
            vision_model: VisionModel::default(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            request_timeout: None,
            events_path: None,
            receipts_dir: None,
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("key_file", &self.key_file)
            .field("vision_model", &self.vision_model)
            .field("image_model", &self.image_model)
            .field("image_size", &self.image_size)
            .field("request_timeout", &self.request_timeout)
            .field("events_path", &self.events_path)
            .field("receipts_dir", &self.receipts_dir)
            .finish()
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source. The API key comes
    /// from the variable first, then from the secret file.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(base) = non_empty(ENV_API_BASE) {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(path) = non_empty(ENV_KEY_FILE) {
            config.key_file = PathBuf::from(path);
        }
        config.api_key = non_empty(ENV_API_KEY).or_else(|| read_key_file(&config.key_file));
        if let Some(model) = non_empty(ENV_MODEL) {
            config.vision_model = model.parse::<VisionModel>().map_err(EngineError::Config)?;
        }
        if let Some(model) = non_empty(ENV_IMAGE_MODEL) {
            config.image_model = resolve_image_model(&model)?;
        }
        if let Some(raw) = non_empty(ENV_TIMEOUT) {
            config.request_timeout = Some(parse_timeout(&raw)?);
        }
        Ok(config)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into()).filter(|key| !key.trim().is_empty());
        self
    }

    pub fn with_vision_model(mut self, model: VisionModel) -> Self {
        self.vision_model = model;
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_events_path(mut self, path: Option<PathBuf>) -> Self {
        self.events_path = path;
        self
    }

    pub fn with_receipts_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.receipts_dir = dir;
        self
    }

    pub fn chat_endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    pub fn images_endpoint(&self) -> String {
        format!("{}/images/generations", self.api_base)
    }

    pub fn require_api_key(&self) -> Result<&str, EngineError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| EngineError::MissingApiKey {
                key_file: self.key_file.display().to_string(),
            })
    }
}

fn read_key_file(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let key = raw.trim();
    if key.is_empty() {
        tracing::warn!(path = %path.display(), "API key file is empty");
        return None;
    }
    Some(key.to_string())
}

pub fn parse_timeout(raw: &str) -> Result<Duration, EngineError> {
    let seconds = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| EngineError::Config(format!("timeout '{raw}' is not a number")))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(EngineError::Config(format!(
            "timeout must be positive, got '{raw}'"
        )));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| EngineError::Config(format!("timeout '{raw}' is out of range")))
}

/// Names outside the registry's image models fall back to the default.
pub fn resolve_image_model(requested: &str) -> Result<String, EngineError> {
    let selection = ModelSelector::new(None)
        .select_image(Some(requested))
        .map_err(EngineError::Config)?;
    if selection.is_fallback() {
        if let Some(reason) = &selection.fallback_reason {
            tracing::warn!(model = %selection.model.name, "{reason}");
        }
    }
    Ok(selection.model.name)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use arduino_lab_contracts::models::VisionModel;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_any_variables() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let missing = temp.path().join("none.txt");
        let config = EngineConfig::from_lookup(lookup(&[(
            ENV_KEY_FILE,
            missing.to_str().unwrap_or_default(),
        )]))?;
        assert_eq!(config.chat_endpoint(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(config.vision_model, VisionModel::Gpt4o);
        assert_eq!(config.request_timeout, None);
        assert!(matches!(
            config.require_api_key(),
            Err(EngineError::MissingApiKey { .. })
        ));
        Ok(())
    }

    #[test]
    fn key_file_is_read_and_trimmed() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let key_file = temp.path().join("api_key.txt");
        std::fs::write(&key_file, "  sk-test-123\n")?;
        let config = EngineConfig::from_lookup(lookup(&[(
            ENV_KEY_FILE,
            key_file.to_str().unwrap_or_default(),
        )]))?;
        assert_eq!(config.require_api_key()?, "sk-test-123");
        Ok(())
    }

    #[test]
    fn environment_key_wins_over_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let key_file = temp.path().join("api_key.txt");
        std::fs::write(&key_file, "sk-file")?;
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_KEY_FILE, key_file.to_str().unwrap_or_default()),
            (ENV_API_KEY, "sk-env"),
            (ENV_API_BASE, "http://localhost:9000/v1/"),
            (ENV_MODEL, "gpt-4.1-mini"),
            (ENV_TIMEOUT, "2.5"),
        ]))?;
        assert_eq!(config.require_api_key()?, "sk-env");
        assert_eq!(config.images_endpoint(), "http://localhost:9000/v1/images/generations");
        assert_eq!(config.vision_model, VisionModel::Gpt41Mini);
        assert_eq!(config.request_timeout, Some(Duration::from_millis(2500)));
        Ok(())
    }

    #[test]
    fn invalid_values_are_config_errors() {
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[(ENV_TIMEOUT, "-1")])),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[(ENV_MODEL, "davinci")])),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn oversized_timeouts_are_rejected_not_panicking() {
        assert!(matches!(parse_timeout("1e300"), Err(EngineError::Config(_))));
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[(ENV_TIMEOUT, "1e30")])),
            Err(EngineError::Config(message)) if message.contains("out of range")
        ));
        assert!(matches!(parse_timeout("inf"), Err(EngineError::Config(_))));
    }

    #[test]
    fn image_model_goes_through_the_registry() -> anyhow::Result<()> {
        let config =
            EngineConfig::from_lookup(lookup(&[(ENV_IMAGE_MODEL, "gpt-image-1-mini")]))?;
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);

        let config = EngineConfig::from_lookup(lookup(&[(ENV_IMAGE_MODEL, "gpt-4.1-mini")]))?;
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(resolve_image_model("dall-e-9")?, DEFAULT_IMAGE_MODEL);
        Ok(())
    }

    #[test]
    fn debug_output_redacts_key() {
        let config = EngineConfig::default().with_api_key("sk-secret");
        assert!(!format!("{config:?}").contains("sk-secret"));
    }
}
