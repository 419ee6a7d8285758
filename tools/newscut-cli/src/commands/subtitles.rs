//! Write subtitle sidecars or import word timings from SRT.

use std::path::PathBuf;

use newscut_audio_ai::{load_srt, save_subtitles};

use super::{load_composition, save_composition};

pub fn run(
    path: PathBuf,
    output: Option<PathBuf>,
    import: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut composition = load_composition(&path)?;

    if let Some(srt) = import {
        let track = load_srt(&srt)?;
        println!("Imported {} words from {}", track.len(), srt.display());
        composition.subtitles = track;
        save_composition(&composition, &path)?;
        println!("Composition updated: {}", path.display());
        return Ok(());
    }

    let words = composition.subtitles.words();
    if words.is_empty() {
        anyhow::bail!(
            "Composition has no subtitles. Run `newscut transcribe` or import an SRT file."
        );
    }
    let output = output.unwrap_or_else(|| path.with_extension("srt"));
    save_subtitles(words, &output)?;
    println!("Wrote {} cues to {}", words.len(), output.display());
    println!("  Transcript: {}", composition.subtitles.transcript());

    Ok(())
}
