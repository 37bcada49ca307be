use crate::stt::ModelSize;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MODELS_DIR: &str = "models";
pub const DEFAULT_FFMPEG_BIN: &str = "ffmpeg";
pub const DEFAULT_TRANSLATION_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_SUMMARIZATION_TIMEOUT_SECS: u64 = 60;

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_WHISPER_BIN: &str = "WHISPER_CPP_BIN";
pub const ENV_MODELS_DIR: &str = "WHISPER_MODELS_DIR";
pub const ENV_FFMPEG_BIN: &str = "FFMPEG_BIN";
pub const ENV_MODEL_SIZE: &str = "CAPTION_LAB_MODEL";
pub const ENV_TRANSLATION_TIMEOUT: &str = "CAPTION_LAB_TRANSLATE_TIMEOUT_SECS";
pub const ENV_SUMMARIZATION_TIMEOUT: &str = "CAPTION_LAB_SUMMARY_TIMEOUT_SECS";
pub const ENV_SCRATCH_DIR: &str = "CAPTION_LAB_SCRATCH_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    pub whisper_bin: Option<PathBuf>,
    pub models_dir: PathBuf,
    pub ffmpeg_bin: PathBuf,
    pub default_model_size: ModelSize,
    /// Per translation call; 0 disables the limit
    pub translation_timeout_secs: u64,
    /// Whole summarization request; 0 disables the limit
    pub summarization_timeout_secs: u64,
    /// Where sidecar and scratch files go, system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            whisper_bin: None,
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
            ffmpeg_bin: PathBuf::from(DEFAULT_FFMPEG_BIN),
            default_model_size: ModelSize::default(),
            translation_timeout_secs: DEFAULT_TRANSLATION_TIMEOUT_SECS,
            summarization_timeout_secs: DEFAULT_SUMMARIZATION_TIMEOUT_SECS,
            scratch_dir: None,
        }
    }
}

impl AppConfig {
    /// Config file (if any) overridden by the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let mut config = match path {
            Some(path) => load_or_create(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(key) = get(ENV_GEMINI_API_KEY) {
            self.gemini_api_key = Some(key);
        }
        if let Some(bin) = get(ENV_WHISPER_BIN) {
            self.whisper_bin = Some(PathBuf::from(bin));
        }
        if let Some(dir) = get(ENV_MODELS_DIR) {
            self.models_dir = PathBuf::from(dir);
        }
        if let Some(bin) = get(ENV_FFMPEG_BIN) {
            self.ffmpeg_bin = PathBuf::from(bin);
        }
        if let Some(size) = get(ENV_MODEL_SIZE) {
            match size.parse() {
                Ok(size) => self.default_model_size = size,
                Err(e) => tracing::warn!("Ignoring {}: {}", ENV_MODEL_SIZE, e),
            }
        }
        if let Some(secs) = get(ENV_TRANSLATION_TIMEOUT) {
            match secs.parse() {
                Ok(secs) => self.translation_timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring {}: not a number", ENV_TRANSLATION_TIMEOUT),
            }
        }
        if let Some(secs) = get(ENV_SUMMARIZATION_TIMEOUT) {
            match secs.parse() {
                Ok(secs) => self.summarization_timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring {}: not a number", ENV_SUMMARIZATION_TIMEOUT),
            }
        }
        if let Some(dir) = get(ENV_SCRATCH_DIR) {
            self.scratch_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(env::temp_dir)
    }

    pub fn translation_timeout(&self) -> Duration {
        Duration::from_secs(self.translation_timeout_secs)
    }

    pub fn summarization_timeout(&self) -> Duration {
        Duration::from_secs(self.summarization_timeout_secs)
    }

    /// API key suitable for logs
    pub fn masked_api_key(&self) -> Option<String> {
        self.gemini_api_key.as_deref().map(mask_api_key)
    }
}

pub fn load_or_create(path: &Path) -> Result<AppConfig, String> {
    if !path.exists() {
        let config = AppConfig::default();
        save(path, &config)?;
        return Ok(config);
    }

    let raw = fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;
    match serde_json::from_str::<AppConfig>(&raw) {
        Ok(config) => Ok(config),
        Err(e) => {
            tracing::warn!("Config {} is corrupt ({}); resetting", path.display(), e);
            let backup = path.with_extension("json.bak");
            let _ = fs::copy(path, backup);
            let config = AppConfig::default();
            save(path, &config)?;
            Ok(config)
        }
    }
}

fn save(path: &Path, config: &AppConfig) -> Result<(), String> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| format!("Failed to create config dir: {}", e))?;
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, json).map_err(|e| format!("Failed to save config: {}", e))
}

pub fn mask_api_key(api_key: &str) -> String {
    if api_key.len() <= 10 || !api_key.is_ascii() {
        return "******".to_string();
    }

    let prefix = &api_key[..6];
    let suffix = &api_key[api_key.len().saturating_sub(4)..];
    format!("{}********{}", prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("short"), "******");
        assert_eq!(mask_api_key("AIzaSyA1234567890xyz"), "AIzaSy********0xyz");
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = load_or_create(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.translation_timeout_secs, DEFAULT_TRANSLATION_TIMEOUT_SECS);
        assert!(!fs::read_to_string(&path).unwrap().contains("gemini_api_key"));
    }

    #[test]
    fn test_corrupt_file_is_backed_up_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let config = load_or_create(&path).unwrap();

        assert_eq!(config.ffmpeg_bin, PathBuf::from(DEFAULT_FFMPEG_BIN));
        assert_eq!(
            fs::read_to_string(dir.path().join("config.json.bak")).unwrap(),
            "{ not json"
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"default_model_size": "small"}"#).unwrap();

        let config = load_or_create(&path).unwrap();

        assert_eq!(config.default_model_size, ModelSize::Small);
        assert_eq!(config.summarization_timeout_secs, DEFAULT_SUMMARIZATION_TIMEOUT_SECS);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_GEMINI_API_KEY, " key-123 "),
            (ENV_MODEL_SIZE, "large"),
            (ENV_TRANSLATION_TIMEOUT, "5"),
            (ENV_SUMMARIZATION_TIMEOUT, "soon"),
            (ENV_SCRATCH_DIR, "/tmp/scratch"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.gemini_api_key.as_deref(), Some("key-123"));
        assert_eq!(config.default_model_size, ModelSize::Large);
        assert_eq!(config.translation_timeout(), Duration::from_secs(5));
        assert_eq!(config.summarization_timeout_secs, DEFAULT_SUMMARIZATION_TIMEOUT_SECS);
        assert_eq!(config.scratch_dir(), PathBuf::from("/tmp/scratch"));
    }
}
