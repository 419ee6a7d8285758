//! Derive word-timed subtitles from narration audio.

use std::path::PathBuf;

use newscut_audio_ai::{
    audio_mime_type, HttpTranscriptionService, TranscriptionConfig, TranscriptionService,
};
use newscut_common::config::AppConfig;

use super::{load_composition, save_composition};

pub async fn run(
    config: &AppConfig,
    path: PathBuf,
    audio: Option<PathBuf>,
    language: String,
) -> anyhow::Result<()> {
    let mut composition = load_composition(&path)?;
    let audio = match audio.or_else(|| composition.narration.as_ref().map(|n| n.path.clone())) {
        Some(audio) => audio,
        None => anyhow::bail!("No audio to transcribe. Run `newscut narrate` or pass --audio."),
    };

    println!("Transcribing {}", audio.display());
    let bytes = tokio::fs::read(&audio)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", audio.display()))?;

    let service = HttpTranscriptionService::from_config(&config.services, config.api_key())?;
    let transcription = TranscriptionConfig {
        language: Some(language),
        ..TranscriptionConfig::default()
    };
    let track = service
        .transcribe(bytes, audio_mime_type(&audio), &transcription)
        .await?;

    println!("  Words: {} ({:.1}s)", track.len(), track.duration());
    println!("  Transcript: {}", track.transcript());

    composition.subtitles = track;
    save_composition(&composition, &path)?;
    println!("Composition updated: {}", path.display());

    Ok(())
}
