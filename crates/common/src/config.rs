//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where downloaded exports are written.
    pub output_dir: PathBuf,

    /// Export pipeline defaults.
    pub export: ExportDefaults,

    /// Remote inference services.
    pub services: ServiceConfig,

    /// Local storage for published videos and overlay presets.
    pub storage: StorageConfig,

    /// Rendering options.
    pub render: RenderConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Capture frame rate.
    pub fps: u32,

    /// Default quality (`720p` or `1080p`).
    pub quality: String,

    /// Default container format (`webm` or `mp4`).
    pub format: String,

    /// Display duration for still-image clips, in seconds.
    pub image_clip_secs: f64,

    /// Upper bound on capture-sink finalization.
    pub encode_timeout_secs: u64,

    /// Upper bound on the transcode stage.
    pub transcode_timeout_secs: u64,

    /// What to do when the transcode stage fails.
    pub transcode_fallback: TranscodeFallback,
}

/// Policy applied when converting the captured container fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscodeFallback {
    /// Complete the export with the untranscoded container.
    #[default]
    OfferOriginal,
    /// Fail the export.
    Fail,
}

/// Endpoints for narration synthesis and word-timing transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Narration synthesis endpoint.
    pub narration_url: String,

    /// Transcription endpoint.
    pub transcription_url: String,

    /// Environment variable holding the bearer token for both services.
    pub api_key_env: String,

    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

/// Local object + metadata storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory of the store.
    pub root: PathBuf,
}

/// Rendering options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// TrueType font used for burned-in text. Falls back to common system fonts.
    pub font_path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "newscut=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            export: ExportDefaults::default(),
            services: ServiceConfig::default(),
            storage: StorageConfig::default(),
            render: RenderConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            quality: "720p".to_string(),
            format: "webm".to_string(),
            image_clip_secs: 5.0,
            encode_timeout_secs: 120,
            transcode_timeout_secs: 600,
            transcode_fallback: TranscodeFallback::OfferOriginal,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            narration_url: "http://localhost:8787/narration".to_string(),
            transcription_url: "http://localhost:8787/transcription".to_string(),
            api_key_env: "NEWSCUT_API_KEY".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: dirs_default_storage(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Bearer token for the inference services, read from the configured env var.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.services.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("newscut").join("config.json")
}

/// Default storage directory.
fn dirs_default_storage() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("newscut").join("store")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.export.fps, 30);
        assert_eq!(config.export.format, "webm");
        assert_eq!(
            config.export.transcode_fallback,
            TranscodeFallback::OfferOriginal
        );
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.export.fps = 24;
        config.export.transcode_fallback = TranscodeFallback::Fail;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.export.fps, 24);
        assert_eq!(loaded.export.transcode_fallback, TranscodeFallback::Fail);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"export": {"fps": 25}}"#).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.export.fps, 25);
        assert_eq!(loaded.export.quality, "720p");
        assert_eq!(loaded.logging.level, "info");
    }

    #[test]
    fn test_malformed_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.export.fps, 30);
    }
}
