//! Synthesize narration for a composition's script.

use std::path::PathBuf;

use newscut_audio_ai::{HttpNarrationService, NarrationRequest, NarrationService};
use newscut_common::config::AppConfig;
use newscut_project_model::NarrationTrack;
use newscut_render_engine::probe_duration;

use super::{load_composition, save_composition};

pub async fn run(
    config: &AppConfig,
    path: PathBuf,
    voice: String,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut composition = load_composition(&path)?;
    if composition.script.trim().is_empty() {
        anyhow::bail!("Composition has no script. Add one with `newscut init --script`.");
    }

    println!("Synthesizing narration with voice '{voice}'");
    println!("  Endpoint: {}", config.services.narration_url);

    let service = HttpNarrationService::from_config(&config.services, config.api_key())?;
    let request = NarrationRequest::new(composition.script.clone(), voice.clone());
    let audio = service.synthesize(&request).await?;

    let output = output.unwrap_or_else(|| path.with_extension("narration.mp3"));
    audio.save(&output)?;
    let duration_secs = probe_duration(&output)
        .ok_or_else(|| anyhow::anyhow!("Could not read duration of {}", output.display()))?;

    println!(
        "  Audio: {} ({} bytes, {duration_secs:.1}s)",
        output.display(),
        audio.bytes.len()
    );

    composition.narration = Some(NarrationTrack {
        path: output,
        duration_secs,
        voice_id: Some(voice),
    });
    save_composition(&composition, &path)?;
    println!("Composition updated: {}", path.display());

    Ok(())
}
