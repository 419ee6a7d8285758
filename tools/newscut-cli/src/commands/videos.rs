//! Manage published videos and overlay presets.

use newscut_capture_engine::{LocalVideoStore, VideoStore};
use newscut_common::config::AppConfig;
use newscut_project_model::OverlayPreset;

use super::load_composition;
use crate::VideosAction;

pub async fn run(config: &AppConfig, action: VideosAction) -> anyhow::Result<()> {
    let store = LocalVideoStore::new(&config.storage.root);

    match action {
        VideosAction::List => {
            let videos = store.list_videos().await?;
            if videos.is_empty() {
                println!("No published videos in {}", store.root().display());
            }
            for video in &videos {
                println!("{}  {}", video.id, video.title);
                println!(
                    "    {:.1}s  {}  {:?}  {}",
                    video.duration_secs,
                    video.template.as_str(),
                    video.status,
                    video.created_at
                );
                println!("    video: {}", video.video_url);
                if let Some(url) = &video.subtitle_url {
                    println!("    subtitles: {url}");
                }
                if let Some(url) = &video.audio_url {
                    println!("    audio: {url}");
                }
            }
        }
        VideosAction::Delete { id } => {
            store.delete_video(&id).await?;
            println!("Deleted video {id}");
        }
        VideosAction::Presets => {
            let presets = store.list_presets().await?;
            if presets.is_empty() {
                println!("No saved presets");
            }
            for preset in &presets {
                println!(
                    "{}  {} ({}, {})",
                    preset.id,
                    preset.name,
                    preset.settings.template.as_str(),
                    preset.created_at
                );
            }
        }
        VideosAction::SavePreset { name, path } => {
            let composition = load_composition(&path)?;
            let preset = store
                .save_preset(OverlayPreset::new(name, composition.overlay))
                .await?;
            println!("Saved preset {} ({})", preset.name, preset.id);
        }
        VideosAction::DeletePreset { id } => {
            store.delete_preset(&id).await?;
            println!("Deleted preset {id}");
        }
    }

    Ok(())
}
