//! Narration synthesis client.
//!
//! The remote text-to-speech service takes `{text, voiceId, voiceSettings}`
//! and answers with base64-encoded audio or an `error` field.

use std::path::Path;
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use newscut_common::config::ServiceConfig;
use newscut_common::error::{NewscutError, NewscutResult};
use serde::{Deserialize, Serialize};

/// Voice tuning passed through to the synthesis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSettings {
    /// Lower values are more expressive [0.0, 1.0].
    pub stability: f64,

    /// Adherence to the reference voice [0.0, 1.0].
    pub similarity_boost: f64,

    /// Playback speed multiplier.
    pub speed: f64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            speed: 1.0,
        }
    }
}

/// Synthesis request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationRequest {
    pub text: String,
    pub voice_id: String,
    #[serde(default)]
    pub voice_settings: VoiceSettings,
}

impl NarrationRequest {
    pub fn new(text: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: voice_id.into(),
            voice_settings: VoiceSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NarrationResponse {
    #[serde(default, alias = "audioBase64", alias = "audio_base64")]
    audio: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Decoded narration audio.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationAudio {
    pub bytes: Vec<u8>,
    pub voice_id: String,
}

impl NarrationAudio {
    /// Write the audio to disk, creating parent directories.
    pub fn save(&self, path: &Path) -> NewscutResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

/// Text-to-speech collaborator.
#[async_trait::async_trait]
pub trait NarrationService: Send + Sync {
    async fn synthesize(&self, request: &NarrationRequest) -> NewscutResult<NarrationAudio>;
}

/// Narration service reached over HTTP.
pub struct HttpNarrationService {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpNarrationService {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> NewscutResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NewscutError::network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    pub fn from_config(config: &ServiceConfig, api_key: Option<String>) -> NewscutResult<Self> {
        Self::new(
            config.narration_url.clone(),
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait::async_trait]
impl NarrationService for HttpNarrationService {
    async fn synthesize(&self, request: &NarrationRequest) -> NewscutResult<NarrationAudio> {
        if request.text.trim().is_empty() {
            return Err(NewscutError::validation("Narration script is empty"));
        }

        tracing::info!(
            endpoint = %self.endpoint,
            voice = %request.voice_id,
            chars = request.text.len(),
            "Requesting narration"
        );

        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| NewscutError::network(format!("Narration request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| NewscutError::network(format!("Narration response unreadable: {e}")))?;
        if !status.is_success() {
            return Err(NewscutError::network(format!(
                "Narration service returned {status}: {}",
                parse_error_field(&body).unwrap_or(body)
            )));
        }

        let bytes = decode_narration_response(&body)?;
        tracing::info!(bytes = bytes.len(), "Narration received");
        Ok(NarrationAudio {
            bytes,
            voice_id: request.voice_id.clone(),
        })
    }
}

/// Decode a synthesis response body into raw audio bytes.
pub fn decode_narration_response(body: &str) -> NewscutResult<Vec<u8>> {
    let response: NarrationResponse = serde_json::from_str(body)
        .map_err(|e| NewscutError::network(format!("Malformed narration response: {e}")))?;

    if let Some(error) = response.error {
        return Err(NewscutError::network(format!("Narration failed: {error}")));
    }
    let audio = response
        .audio
        .ok_or_else(|| NewscutError::network("Narration response has no audio"))?;
    let bytes = general_purpose::STANDARD
        .decode(audio.trim())
        .map_err(|e| NewscutError::network(format!("Narration audio is not valid base64: {e}")))?;
    if bytes.is_empty() {
        return Err(NewscutError::network("Narration audio is empty"));
    }
    Ok(bytes)
}

fn parse_error_field(body: &str) -> Option<String> {
    serde_json::from_str::<NarrationResponse>(body).ok()?.error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case() {
        let value = serde_json::to_value(NarrationRequest::new("Hi", "anchor-1")).unwrap();
        assert_eq!(value["voiceId"], "anchor-1");
        assert_eq!(value["voiceSettings"]["similarityBoost"], 0.75);
    }

    #[test]
    fn test_decode_base64_audio() {
        let encoded = general_purpose::STANDARD.encode(b"ID3fake");
        let body = format!(r#"{{"audio":"{encoded}"}}"#);
        assert_eq!(decode_narration_response(&body).unwrap(), b"ID3fake");
    }

    #[test]
    fn test_error_field_is_surfaced() {
        let err = decode_narration_response(r#"{"error":"quota exceeded"}"#).unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_missing_audio_is_an_error() {
        assert!(decode_narration_response("{}").is_err());
        assert!(decode_narration_response(r#"{"audio":"@@@"}"#).is_err());
    }

    #[test]
    fn test_save_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio").join("narration.mp3");
        let audio = NarrationAudio {
            bytes: vec![1, 2, 3],
            voice_id: "v".into(),
        };
        audio.save(&path).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_blank_script_is_rejected_before_request() {
        let service =
            HttpNarrationService::new("http://127.0.0.1:9/narration", None, Duration::from_secs(1))
                .unwrap();
        let err = service
            .synthesize(&NarrationRequest::new("   ", "anchor"))
            .await
            .unwrap_err();
        assert!(matches!(err, NewscutError::Validation { .. }));
    }
}
