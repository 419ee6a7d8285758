//! Word-timing transcription client.
//!
//! Sends narration audio to the remote transcription service and turns the
//! `{words: [{text, start, end}]}` answer into a subtitle track.

use std::path::Path;
use std::time::Duration;

use newscut_common::config::ServiceConfig;
use newscut_common::error::{NewscutError, NewscutResult};
use newscut_project_model::{SubtitleTrack, SubtitleWord};
use serde::{Deserialize, Serialize};

/// Configuration for transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Language hint (ISO 639-1 code, e.g., "en").
    pub language: Option<String>,

    /// Drop words whose text is only punctuation.
    pub strip_punctuation_only: bool,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            language: Some("en".to_string()),
            strip_punctuation_only: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionWord {
    #[serde(alias = "word")]
    text: String,
    start: f64,
    end: f64,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    words: Option<Vec<TranscriptionWord>>,
    #[serde(default)]
    error: Option<String>,
}

/// Speech-to-text collaborator producing word timings.
#[async_trait::async_trait]
pub trait TranscriptionService: Send + Sync {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
        config: &TranscriptionConfig,
    ) -> NewscutResult<SubtitleTrack>;
}

/// Transcription service reached over HTTP.
pub struct HttpTranscriptionService {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTranscriptionService {
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
            config.transcription_url.clone(),
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait::async_trait]
impl TranscriptionService for HttpTranscriptionService {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
        config: &TranscriptionConfig,
    ) -> NewscutResult<SubtitleTrack> {
        if audio.is_empty() {
            return Err(NewscutError::validation("No audio to transcribe"));
        }

        tracing::info!(
            endpoint = %self.endpoint,
            bytes = audio.len(),
            language = ?config.language,
            "Starting transcription"
        );

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(audio);
        if let Some(language) = &config.language {
            builder = builder.query(&[("language", language)]);
        }
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| NewscutError::network(format!("Transcription request failed: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| NewscutError::network(format!("Transcription response unreadable: {e}")))?;
        if !status.is_success() {
            return Err(NewscutError::network(format!(
                "Transcription service returned {status}: {body}"
            )));
        }

        let track = parse_transcription_response(&body, config)?;
        tracing::info!(words = track.len(), "Transcription complete");
        Ok(track)
    }
}

/// Turn a transcription response body into a validated subtitle track.
///
/// Words are sorted by start time; empty words are dropped.
pub fn parse_transcription_response(
    body: &str,
    config: &TranscriptionConfig,
) -> NewscutResult<SubtitleTrack> {
    let response: TranscriptionResponse = serde_json::from_str(body)
        .map_err(|e| NewscutError::network(format!("Malformed transcription response: {e}")))?;

    if let Some(error) = response.error {
        return Err(NewscutError::network(format!("Transcription failed: {error}")));
    }
    let raw = response
        .words
        .ok_or_else(|| NewscutError::network("Transcription response has no words"))?;

    let mut words: Vec<SubtitleWord> = raw
        .into_iter()
        .map(|w| SubtitleWord::new(w.text.trim(), w.start, w.end.max(w.start)))
        .filter(|w| !w.text.is_empty())
        .filter(|w| {
            !config.strip_punctuation_only || w.text.chars().any(char::is_alphanumeric)
        })
        .collect();
    words.sort_by(|a, b| a.start.total_cmp(&b.start));

    SubtitleTrack::new(words).map_err(|e| NewscutError::subtitle(e.to_string()))
}

/// MIME type for an audio file, by extension.
pub fn audio_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("ogg") | Some("opus") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        Some("webm") => "audio/webm",
        _ => "audio/mpeg",
    }
}
