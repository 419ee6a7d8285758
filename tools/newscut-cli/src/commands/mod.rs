pub mod check;
pub mod export;
pub mod init;
pub mod narrate;
pub mod subtitles;
pub mod thumbnails;
pub mod transcribe;
pub mod videos;

use std::path::Path;

use newscut_project_model::Composition;

pub(crate) fn load_composition(path: &Path) -> anyhow::Result<Composition> {
    Composition::load(path).map_err(|e| anyhow::anyhow!("Failed to load composition: {e}"))
}

pub(crate) fn save_composition(composition: &Composition, path: &Path) -> anyhow::Result<()> {
    composition
        .save(path)
        .map_err(|e| anyhow::anyhow!("Failed to save composition: {e}"))
}
