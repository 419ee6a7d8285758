//! Word-level subtitle timing.
//!
//! Words come from the transcription step and are immutable once produced;
//! a new generation replaces the whole track.

use serde::{Deserialize, Serialize};

use crate::composition::ProjectError;

/// A single timed word, in narration-relative seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl SubtitleWord {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Whether `t` falls inside the half-open interval `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// An ordered, immutable sequence of subtitle words.
///
/// Start times never regress. Words need not be contiguous.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SubtitleWord>", into = "Vec<SubtitleWord>")]
pub struct SubtitleTrack {
    words: Vec<SubtitleWord>,
}

impl SubtitleTrack {
    pub fn new(words: Vec<SubtitleWord>) -> Result<Self, ProjectError> {
        for (idx, word) in words.iter().enumerate() {
            if !word.start.is_finite() || !word.end.is_finite() || word.start < 0.0 {
                return Err(ProjectError::ValidationError {
                    message: format!("Word {idx} ({:?}) has invalid timing", word.text),
                });
            }
            if word.end < word.start {
                return Err(ProjectError::ValidationError {
                    message: format!("Word {idx} ({:?}) ends before it starts", word.text),
                });
            }
        }
        if let Some(idx) = words
            .windows(2)
            .position(|pair| pair[1].start < pair[0].start)
        {
            return Err(ProjectError::ValidationError {
                message: format!("Word {} starts before word {idx}", idx + 1),
            });
        }
        Ok(Self { words })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn words(&self) -> &[SubtitleWord] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Latest word end, or zero for an empty track.
    pub fn duration(&self) -> f64 {
        self.words.iter().map(|w| w.end).fold(0.0, f64::max)
    }

    /// Plain transcript text.
    pub fn transcript(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TryFrom<Vec<SubtitleWord>> for SubtitleTrack {
    type Error = ProjectError;

    fn try_from(words: Vec<SubtitleWord>) -> Result<Self, Self::Error> {
        Self::new(words)
    }
}

impl From<SubtitleTrack> for Vec<SubtitleWord> {
    fn from(track: SubtitleTrack) -> Self {
        track.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_allows_gaps_and_overlaps() {
        let track = SubtitleTrack::new(vec![
            SubtitleWord::new("Breaking", 0.0, 0.6),
            SubtitleWord::new("news", 0.5, 1.0),
            SubtitleWord::new("tonight", 2.0, 2.4),
        ])
        .unwrap();
        assert_eq!(track.len(), 3);
        assert!((track.duration() - 2.4).abs() < 1e-9);
        assert_eq!(track.transcript(), "Breaking news tonight");
    }

    #[test]
    fn test_track_rejects_regressing_starts() {
        let err = SubtitleTrack::new(vec![
            SubtitleWord::new("b", 1.0, 1.5),
            SubtitleWord::new("a", 0.5, 0.9),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("starts before"));
    }

    #[test]
    fn test_track_rejects_inverted_word() {
        assert!(SubtitleTrack::new(vec![SubtitleWord::new("x", 2.0, 1.0)]).is_err());
    }

    #[test]
    fn test_word_interval_is_half_open() {
        let word = SubtitleWord::new("hi", 1.0, 2.0);
        assert!(word.contains(1.0));
        assert!(word.contains(1.999));
        assert!(!word.contains(2.0));
    }

    #[test]
    fn test_deserialize_validates() {
        let bad = r#"[{"text":"b","start":1.0,"end":1.2},{"text":"a","start":0.0,"end":0.5}]"#;
        assert!(serde_json::from_str::<SubtitleTrack>(bad).is_err());

        let good = r#"[{"text":"a","start":0.0,"end":0.5}]"#;
        let track: SubtitleTrack = serde_json::from_str(good).unwrap();
        assert_eq!(track.words()[0].text, "a");
    }
}
