//! Preview thumbnails for the media lane.
//!
//! Only the first few clips get a preview; the rest are reported as an
//! overflow count. A clip that cannot be decoded is skipped, never fatal.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::RgbaImage;
use newscut_common::error::{NewscutError, NewscutResult};
use newscut_project_model::{MediaClip, MediaKind};

use crate::media::cover_fit;

/// Previews shown before collapsing into a "+N" overflow.
pub const MAX_PREVIEW_THUMBNAILS: usize = 4;

/// Result of decoding one clip's preview.
#[derive(Debug, Clone, PartialEq)]
pub enum ThumbnailOutcome {
    Produced { clip_id: String, image: RgbaImage },
    Skipped { clip_id: String, reason: String },
}

impl ThumbnailOutcome {
    pub fn clip_id(&self) -> &str {
        match self {
            ThumbnailOutcome::Produced { clip_id, .. } => clip_id,
            ThumbnailOutcome::Skipped { clip_id, .. } => clip_id,
        }
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        match self {
            ThumbnailOutcome::Produced { image, .. } => Some(image),
            ThumbnailOutcome::Skipped { .. } => None,
        }
    }
}

/// Previews for the head of the lane plus the number of clips left out.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThumbnailStrip {
    pub outcomes: Vec<ThumbnailOutcome>,
    pub overflow: usize,
}

impl ThumbnailStrip {
    pub fn produced(&self) -> impl Iterator<Item = (&str, &RgbaImage)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.image().map(|img| (o.clip_id(), img)))
    }

    /// Write produced previews as `<dir>/<clip_id>.png`.
    pub fn save(&self, dir: &Path) -> NewscutResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for (clip_id, image) in self.produced() {
            let path = dir.join(format!("{clip_id}.png"));
            image.save(&path).map_err(|e| {
                NewscutError::render(format!("Failed to write {}: {e}", path.display()))
            })?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Build previews for the first [`MAX_PREVIEW_THUMBNAILS`] clips with `decode`.
pub fn build_strip<F>(
    clips: &[MediaClip],
    width: u32,
    height: u32,
    mut decode: F,
) -> ThumbnailStrip
where
    F: FnMut(&MediaClip) -> NewscutResult<RgbaImage>,
{
    let outcomes = clips
        .iter()
        .take(MAX_PREVIEW_THUMBNAILS)
        .map(|clip| match decode(clip) {
            Ok(image) => ThumbnailOutcome::Produced {
                clip_id: clip.id.clone(),
                image: cover_fit(&image, width, height),
            },
            Err(e) => {
                tracing::debug!(clip = %clip.id, error = %e, "Thumbnail skipped");
                ThumbnailOutcome::Skipped {
                    clip_id: clip.id.clone(),
                    reason: e.to_string(),
                }
            }
        })
        .collect();

    ThumbnailStrip {
        outcomes,
        overflow: clips.len().saturating_sub(MAX_PREVIEW_THUMBNAILS),
    }
}

/// Decode a representative frame: the image itself, or a video frame near the start.
pub fn decode_thumbnail(clip: &MediaClip) -> NewscutResult<RgbaImage> {
    match clip.kind {
        MediaKind::Image => Ok(image::open(&clip.source)
            .map_err(|e| NewscutError::render(format!("Unreadable image: {e}")))?
            .to_rgba8()),
        MediaKind::Video => {
            let seek = (clip.duration_secs / 2.0).clamp(0.0, 1.0);
            let output = Command::new("ffmpeg")
                .args(["-hide_banner", "-loglevel", "error", "-ss"])
                .arg(format!("{seek:.3}"))
                .arg("-i")
                .arg(&clip.source)
                .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
                .stdin(Stdio::null())
                .output()
                .map_err(|e| NewscutError::render(format!("Failed to start ffmpeg: {e}")))?;
            if !output.status.success() || output.stdout.is_empty() {
                return Err(NewscutError::render(format!(
                    "ffmpeg could not extract a frame: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }
            Ok(image::load_from_memory(&output.stdout)
                .map_err(|e| NewscutError::render(format!("Unreadable video frame: {e}")))?
                .to_rgba8())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn clips(n: usize) -> Vec<MediaClip> {
        (0..n)
            .map(|i| MediaClip::image(format!("c{i}"), format!("c{i}.png"), 5.0, i as u32))
            .collect()
    }

    fn solid(_: &MediaClip) -> NewscutResult<RgbaImage> {
        Ok(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255])))
    }

    #[test]
    fn test_strip_caps_at_four() {
        let strip = build_strip(&clips(7), 16, 9, solid);
        assert_eq!(strip.outcomes.len(), MAX_PREVIEW_THUMBNAILS);
        assert_eq!(strip.overflow, 3);
        assert_eq!(strip.produced().next().unwrap().1.dimensions(), (16, 9));
    }

    #[test]
    fn test_no_overflow_for_short_lanes() {
        let strip = build_strip(&clips(2), 16, 9, solid);
        assert_eq!(strip.outcomes.len(), 2);
        assert_eq!(strip.overflow, 0);
    }

    #[test]
    fn test_failures_are_skipped_not_fatal() {
        let strip = build_strip(&clips(3), 16, 9, |clip| {
            if clip.id == "c1" {
                Err(NewscutError::render("corrupt"))
            } else {
                solid(clip)
            }
        });
        assert_eq!(strip.outcomes.len(), 3);
        assert!(matches!(
            &strip.outcomes[1],
            ThumbnailOutcome::Skipped { clip_id, .. } if clip_id == "c1"
        ));
        assert_eq!(strip.produced().count(), 2);
    }

    #[test]
    fn test_decode_missing_image_is_error() {
        let clip = MediaClip::image("x", "/nonexistent/x.png", 5.0, 0);
        assert!(decode_thumbnail(&clip).is_err());
    }

    #[test]
    fn test_save_writes_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let strip = build_strip(&clips(2), 16, 9, solid);
        let written = strip.save(dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|p| p.exists()));
    }
}
