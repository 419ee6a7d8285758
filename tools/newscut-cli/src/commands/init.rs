//! Create a composition file.

use std::path::PathBuf;

use newscut_audio_ai::load_srt;
use newscut_common::config::AppConfig;
use newscut_project_model::{Composition, MediaLane, NarrationTrack, TemplateId};
use newscut_render_engine::{clip_from_path, probe_duration};

use super::save_composition;

pub struct InitOptions {
    pub title: String,
    pub output: PathBuf,
    pub media: Vec<PathBuf>,
    pub narration: Option<PathBuf>,
    pub subtitles: Option<PathBuf>,
    pub script: Option<String>,
    pub template: String,
    pub headline: Option<String>,
}

pub fn run(config: &AppConfig, options: InitOptions) -> anyhow::Result<()> {
    println!("Creating composition '{}'", options.title);

    let template: TemplateId = options.template.parse().map_err(anyhow::Error::msg)?;
    let mut composition = Composition::new(&options.title);
    composition.script = options.script.unwrap_or_default();
    composition.overlay = composition
        .overlay
        .with_template(template)
        .with_headline(options.headline.unwrap_or_else(|| options.title.clone()));

    let mut clips = Vec::with_capacity(options.media.len());
    for (order, path) in options.media.iter().enumerate() {
        let clip = clip_from_path(
            format!("clip-{}", order + 1),
            path,
            config.export.image_clip_secs,
            order as u32,
        )?;
        println!(
            "  Clip {}: {} ({:?}, {:.1}s)",
            order + 1,
            path.display(),
            clip.kind,
            clip.duration_secs
        );
        clips.push(clip);
    }
    composition.media = MediaLane::new(clips)?;

    if let Some(path) = options.narration {
        let duration_secs = probe_duration(&path).ok_or_else(|| {
            anyhow::anyhow!("Could not read narration duration: {}", path.display())
        })?;
        println!("  Narration: {} ({duration_secs:.1}s)", path.display());
        composition.narration = Some(NarrationTrack {
            path,
            duration_secs,
            voice_id: None,
        });
    }

    if let Some(path) = options.subtitles {
        composition.subtitles = load_srt(&path)?;
        println!(
            "  Subtitles: {} words from {}",
            composition.subtitles.len(),
            path.display()
        );
    }

    save_composition(&composition, &options.output)?;

    println!();
    println!("Composition written to {}", options.output.display());
    println!("  Template: {}", template.as_str());
    println!("  Media: {:.1}s", composition.media.total_duration());
    match composition.validate() {
        Ok(()) => println!("  Ready to export ({:.1}s)", composition.total_duration()),
        Err(e) => println!("  Not exportable yet: {e}"),
    }

    Ok(())
}
