//! Render preview thumbnails for the media lane.

use std::path::PathBuf;

use newscut_render_engine::{build_strip, decode_thumbnail, ThumbnailOutcome};

use super::load_composition;

pub fn run(path: PathBuf, output: PathBuf, width: u32, height: u32) -> anyhow::Result<()> {
    let composition = load_composition(&path)?;
    let clips = composition.media.clips();
    println!("Rendering thumbnails for {} clip(s)", clips.len());

    let strip = build_strip(clips, width, height, decode_thumbnail);
    for outcome in &strip.outcomes {
        match outcome {
            ThumbnailOutcome::Produced { clip_id, .. } => println!("  [OK]   {clip_id}"),
            ThumbnailOutcome::Skipped { clip_id, reason } => {
                println!("  [SKIP] {clip_id}: {reason}")
            }
        }
    }
    if strip.overflow > 0 {
        println!("  +{} more", strip.overflow);
    }

    let written = strip.save(&output)?;
    println!("Wrote {} thumbnail(s) to {}", written.len(), output.display());

    Ok(())
}
