//! Media clips and the media lane.
//!
//! The media lane is the ordered sequence of user-supplied clips shown
//! underneath the narration. Order is significant and user-editable.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::composition::ProjectError;

/// Display duration given to still images when none is configured.
pub const DEFAULT_IMAGE_CLIP_SECS: f64 = 5.0;

/// Kind of media a clip holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// Guess the kind from a file extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp4" | "mov" | "webm" | "mkv" | "m4v" | "avi" => Some(MediaKind::Video),
            "png" | "jpg" | "jpeg" | "webp" | "gif" | "bmp" => Some(MediaKind::Image),
            _ => None,
        }
    }
}

/// A single clip on the media lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaClip {
    /// Unique clip identifier.
    pub id: String,

    /// Source file.
    pub source: PathBuf,

    /// Video or still image.
    pub kind: MediaKind,

    /// Display duration in seconds.
    pub duration_secs: f64,

    /// Position on the lane (lower plays first).
    pub order: u32,
}

impl MediaClip {
    pub fn video(
        id: impl Into<String>,
        source: impl Into<PathBuf>,
        duration_secs: f64,
        order: u32,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            kind: MediaKind::Video,
            duration_secs,
            order,
        }
    }

    pub fn image(
        id: impl Into<String>,
        source: impl Into<PathBuf>,
        display_secs: f64,
        order: u32,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            kind: MediaKind::Image,
            duration_secs: display_secs,
            order,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }
}

/// The ordered media lane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MediaClip>", into = "Vec<MediaClip>")]
pub struct MediaLane {
    clips: Vec<MediaClip>,
}

impl TryFrom<Vec<MediaClip>> for MediaLane {
    type Error = ProjectError;

    fn try_from(clips: Vec<MediaClip>) -> Result<Self, Self::Error> {
        Self::new(clips)
    }
}

impl From<MediaLane> for Vec<MediaClip> {
    fn from(lane: MediaLane) -> Self {
        lane.clips
    }
}

impl MediaLane {
    /// Build a lane, sorting clips by their order index.
    ///
    /// Clips with a non-finite or non-positive duration are rejected.
    pub fn new(mut clips: Vec<MediaClip>) -> Result<Self, ProjectError> {
        for clip in &clips {
            if !clip.duration_secs.is_finite() || clip.duration_secs <= 0.0 {
                return Err(ProjectError::ValidationError {
                    message: format!(
                        "Clip {} has invalid duration {}",
                        clip.id, clip.duration_secs
                    ),
                });
            }
        }
        clips.sort_by_key(|clip| clip.order);
        Ok(Self { clips })
    }

    pub fn clips(&self) -> &[MediaClip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Sum of all clip durations.
    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(|clip| clip.duration_secs).sum()
    }

    /// Append a clip at the end of the lane.
    pub fn push(&mut self, mut clip: MediaClip) {
        clip.order = self.next_order();
        self.clips.push(clip);
    }

    /// Remove a clip by id, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<MediaClip> {
        let idx = self.clips.iter().position(|clip| clip.id == id)?;
        let clip = self.clips.remove(idx);
        self.renumber();
        Some(clip)
    }

    /// Move the clip at `from` to position `to`, renumbering order indexes.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), ProjectError> {
        if from >= self.clips.len() || to >= self.clips.len() {
            return Err(ProjectError::ValidationError {
                message: format!(
                    "Reorder {from} -> {to} out of range for {} clips",
                    self.clips.len()
                ),
            });
        }
        let clip = self.clips.remove(from);
        self.clips.insert(to, clip);
        self.renumber();
        Ok(())
    }

    fn next_order(&self) -> u32 {
        self.clips
            .iter()
            .map(|clip| clip.order + 1)
            .max()
            .unwrap_or(0)
    }

    fn renumber(&mut self) {
        for (idx, clip) in self.clips.iter_mut().enumerate() {
            clip.order = idx as u32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(id: &str, order: u32) -> MediaClip {
        MediaClip::video(id, format!("{id}.mp4"), 4.0, order)
    }

    #[test]
    fn test_lane_sorts_by_order() {
        let lane = MediaLane::new(vec![clip("b", 2), clip("a", 0), clip("c", 5)]).unwrap();
        let ids: Vec<_> = lane.clips().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!((lane.total_duration() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_lane_rejects_zero_duration() {
        let mut bad = clip("a", 0);
        bad.duration_secs = 0.0;
        assert!(MediaLane::new(vec![bad]).is_err());
    }

    #[test]
    fn test_reorder_renumbers() {
        let mut lane = MediaLane::new(vec![clip("a", 0), clip("b", 1), clip("c", 2)]).unwrap();
        lane.reorder(2, 0).unwrap();
        let ids: Vec<_> = lane.clips().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
        let orders: Vec<_> = lane.clips().iter().map(|c| c.order).collect();
        assert_eq!(orders, [0, 1, 2]);
        assert!(lane.reorder(0, 3).is_err());
    }

    #[test]
    fn test_push_and_remove() {
        let mut lane = MediaLane::default();
        lane.push(clip("a", 99));
        lane.push(MediaClip::image("b", "b.png", DEFAULT_IMAGE_CLIP_SECS, 0));
        assert_eq!(lane.clips()[1].order, 1);
        assert!(lane.remove("a").is_some());
        assert_eq!(lane.clips()[0].order, 0);
        assert!(lane.remove("missing").is_none());
    }

    #[test]
    fn test_kind_from_path() {
        assert_eq!(
            MediaKind::from_path(std::path::Path::new("x/clip.MOV")),
            Some(MediaKind::Video)
        );
        assert_eq!(
            MediaKind::from_path(std::path::Path::new("photo.jpeg")),
            Some(MediaKind::Image)
        );
        assert_eq!(MediaKind::from_path(std::path::Path::new("notes.txt")), None);
    }
}
