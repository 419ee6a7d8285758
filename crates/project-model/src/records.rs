//! Persistence records owned by the storage collaborator.

use serde::{Deserialize, Serialize};

use crate::overlay::{OverlaySettings, TemplateId};

/// Lifecycle of a stored video record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    #[default]
    Ready,
    Processing,
    Failed,
}

/// A published video, created only after a successful export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVideo {
    pub id: String,
    pub title: String,
    pub video_url: String,
    pub audio_url: Option<String>,
    pub subtitle_url: Option<String>,
    pub duration_secs: f64,
    pub template: TemplateId,
    pub voice: Option<String>,
    pub status: VideoStatus,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

/// A named overlay configuration saved for reuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayPreset {
    pub id: String,
    pub name: String,
    pub settings: OverlaySettings,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

impl OverlayPreset {
    pub fn new(name: impl Into<String>, settings: OverlaySettings) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            settings,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Generate a random-looking v4-style identifier from the clock and a counter.
pub fn generate_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let count = COUNTER.fetch_add(1, Ordering::Relaxed) as u128;
    let seed = nanos ^ (count.wrapping_mul(0x9e37_79b9_7f4a_7c15) << 17);
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        (seed & 0xFFFF_FFFF) as u32,
        ((seed >> 32) & 0xFFFF) as u16,
        ((seed >> 48) & 0x0FFF) as u16,
        (((seed >> 60) & 0x3FFF) as u16) | 0x8000,
        ((seed >> 74) ^ count) & 0xFFFF_FFFF_FFFF,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_and_shaped() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
        assert_eq!(&a[14..15], "4");
    }

    #[test]
    fn test_preset_serialization() {
        let preset = OverlayPreset::new("Evening", OverlaySettings::default());
        let json = serde_json::to_string(&preset).unwrap();
        let parsed: OverlayPreset = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, preset);
    }
}
