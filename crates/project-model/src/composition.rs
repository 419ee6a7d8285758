//! The composition document: everything one export run reads.
//!
//! A composition is assembled before an export starts (`composition.json`)
//! and frozen for the duration of a run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::media::MediaLane;
use crate::overlay::OverlaySettings;
use crate::subtitle::SubtitleTrack;

/// Synthesized narration audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationTrack {
    /// Audio file (mp3/wav/ogg).
    pub path: PathBuf,

    /// Duration in seconds.
    pub duration_secs: f64,

    /// Voice used for synthesis.
    #[serde(default)]
    pub voice_id: Option<String>,
}

/// Top-level composition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    /// Schema version.
    pub version: String,

    /// Video title.
    pub title: String,

    /// Narration script the audio was synthesized from.
    #[serde(default)]
    pub script: String,

    #[serde(default)]
    pub media: MediaLane,

    #[serde(default)]
    pub subtitles: SubtitleTrack,

    #[serde(default)]
    pub narration: Option<NarrationTrack>,

    #[serde(default)]
    pub overlay: OverlaySettings,
}

impl Composition {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            version: "1.0".to_string(),
            title: title.into(),
            script: String::new(),
            media: MediaLane::default(),
            subtitles: SubtitleTrack::default(),
            narration: None,
            overlay: OverlaySettings::default(),
        }
    }

    /// Length of the export: the narration if present, else the last word end.
    pub fn total_duration(&self) -> f64 {
        match &self.narration {
            Some(narration) => narration.duration_secs,
            None => self.subtitles.duration(),
        }
    }

    /// Check export preconditions.
    ///
    /// Requires at least one media clip and at least one of narration audio
    /// or subtitle words, with a positive total duration.
    pub fn validate(&self) -> Result<(), ProjectError> {
        if self.media.is_empty() {
            return Err(ProjectError::ValidationError {
                message: "Add at least one video or image before exporting".to_string(),
            });
        }
        if self.narration.is_none() && self.subtitles.is_empty() {
            return Err(ProjectError::ValidationError {
                message: "Generate narration or subtitles before exporting".to_string(),
            });
        }
        let duration = self.total_duration();
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ProjectError::ValidationError {
                message: format!("Export duration resolved to {duration} seconds"),
            });
        }
        Ok(())
    }

    /// Load a composition from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut composition: Composition =
            serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        if let Some(base) = path.parent() {
            composition.resolve_paths(base);
        }
        Ok(composition)
    }

    /// Save a composition to a JSON file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProjectError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Make relative media and narration paths relative to `base`.
    fn resolve_paths(&mut self, base: &Path) {
        let clips: Vec<_> = self
            .media
            .clips()
            .iter()
            .cloned()
            .map(|mut clip| {
                if clip.source.is_relative() {
                    clip.source = base.join(&clip.source);
                }
                clip
            })
            .collect();
        if let Ok(lane) = MediaLane::new(clips) {
            self.media = lane;
        }
        if let Some(narration) = self.narration.as_mut() {
            if narration.path.is_relative() {
                narration.path = base.join(&narration.path);
            }
        }
    }
}

/// Errors that can occur when working with compositions.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid composition: {message}")]
    ValidationError { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaClip;
    use crate::subtitle::SubtitleWord;

    fn sample() -> Composition {
        let mut composition = Composition::new("Morning brief");
        composition.media =
            MediaLane::new(vec![MediaClip::image("a", "clips/a.png", 5.0, 0)]).unwrap();
        composition.subtitles =
            SubtitleTrack::new(vec![SubtitleWord::new("Hello", 0.0, 0.8)]).unwrap();
        composition
    }

    #[test]
    fn test_validate_requires_media() {
        let mut composition = sample();
        composition.media = MediaLane::default();
        let err = composition.validate().unwrap_err();
        assert!(err.to_string().contains("at least one video or image"));
    }

    #[test]
    fn test_validate_requires_narration_or_words() {
        let mut composition = sample();
        composition.subtitles = SubtitleTrack::empty();
        assert!(composition.validate().is_err());

        composition.narration = Some(NarrationTrack {
            path: PathBuf::from("narration.mp3"),
            duration_secs: 12.0,
            voice_id: None,
        });
        assert!(composition.validate().is_ok());
        assert!((composition.total_duration() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_duration_falls_back_to_words() {
        assert!((sample().total_duration() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_save_and_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brief").join("composition.json");
        sample().save(&path).unwrap();

        let loaded = Composition::load(&path).unwrap();
        assert_eq!(loaded.title, "Morning brief");
        assert_eq!(
            loaded.media.clips()[0].source,
            dir.path().join("brief").join("clips/a.png")
        );
        assert_eq!(loaded.subtitles.len(), 1);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composition.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(matches!(
            Composition::load(&path),
            Err(ProjectError::ParseError { .. })
        ));
    }
}
