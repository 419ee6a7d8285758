//! Export configuration and the externally observed progress value.

use serde::{Deserialize, Serialize};

/// Output quality; selects the short side of the output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ExportQuality {
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl ExportQuality {
    /// Length of the shorter frame side in pixels.
    pub fn short_side(self) -> u32 {
        match self {
            ExportQuality::P720 => 720,
            ExportQuality::P1080 => 1080,
        }
    }

    /// Target video bitrate for this quality.
    pub fn video_bitrate_kbps(self) -> u32 {
        match self {
            ExportQuality::P720 => 5000,
            ExportQuality::P1080 => 8000,
        }
    }
}

impl std::str::FromStr for ExportQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "720p" | "720" => Ok(ExportQuality::P720),
            "1080p" | "1080" => Ok(ExportQuality::P1080),
            other => Err(format!("Unknown quality: {other}. Use: 720p, 1080p")),
        }
    }
}

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// VP9 + Opus; the capture sink's native container.
    #[default]
    Webm,
    /// H.264 + AAC; produced by the transcode stage.
    Mp4,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Webm => "webm",
            ExportFormat::Mp4 => "mp4",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Webm => "video/webm",
            ExportFormat::Mp4 => "video/mp4",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webm" => Ok(ExportFormat::Webm),
            "mp4" => Ok(ExportFormat::Mp4),
            other => Err(format!("Unknown format: {other}. Use: webm, mp4")),
        }
    }
}

/// Frame orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AspectRatio {
    /// 9:16 (social feeds).
    #[default]
    Vertical,
    /// 16:9.
    Horizontal,
}

impl std::str::FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vertical" | "9:16" | "portrait" => Ok(AspectRatio::Vertical),
            "horizontal" | "16:9" | "landscape" => Ok(AspectRatio::Horizontal),
            other => Err(format!("Unknown aspect: {other}. Use: vertical, horizontal")),
        }
    }
}

/// Settings for one export run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub quality: ExportQuality,
    pub format: ExportFormat,
    pub aspect: AspectRatio,
    /// Capture frame rate.
    pub fps: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            quality: ExportQuality::P720,
            format: ExportFormat::Webm,
            aspect: AspectRatio::Vertical,
            fps: 30,
        }
    }
}

impl ExportSettings {
    pub fn new(quality: ExportQuality, format: ExportFormat) -> Self {
        Self {
            quality,
            format,
            ..Self::default()
        }
    }

    /// Output resolution `(width, height)`.
    pub fn resolution(&self) -> (u32, u32) {
        let short = self.quality.short_side();
        let long = short * 16 / 9;
        match self.aspect {
            AspectRatio::Vertical => (short, long),
            AspectRatio::Horizontal => (long, short),
        }
    }
}

/// Phase of an export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    #[default]
    Idle,
    Preparing,
    Rendering,
    Encoding,
    Converting,
    Complete,
    Error,
}

impl ExportStatus {
    /// A run is in flight (cancellable).
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ExportStatus::Preparing
                | ExportStatus::Rendering
                | ExportStatus::Encoding
                | ExportStatus::Converting
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExportStatus::Complete | ExportStatus::Error)
    }

    /// Allowed edges of the export state machine.
    pub fn can_transition_to(self, next: ExportStatus) -> bool {
        use ExportStatus::*;
        match (self, next) {
            (Idle, Preparing) => true,
            (Preparing, Rendering) => true,
            (Rendering, Encoding) => true,
            (Encoding, Converting) | (Encoding, Complete) => true,
            (Converting, Complete) => true,
            (from, Idle) if from.is_active() => true,
            (Complete, Idle) | (Error, Idle) => true,
            (from, Error) if from != Error => true,
            _ => false,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportStatus::Idle => "idle",
            ExportStatus::Preparing => "preparing",
            ExportStatus::Rendering => "rendering",
            ExportStatus::Encoding => "encoding",
            ExportStatus::Converting => "converting",
            ExportStatus::Complete => "complete",
            ExportStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Export progress report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportProgress {
    pub status: ExportStatus,

    /// Current progress [0.0, 100.0].
    pub progress: f64,

    /// Human-readable description of the current step.
    pub message: String,

    /// Estimated time remaining in seconds, when known.
    pub eta_secs: Option<f64>,
}

impl Default for ExportProgress {
    fn default() -> Self {
        Self::idle()
    }
}

impl ExportProgress {
    pub fn idle() -> Self {
        Self {
            status: ExportStatus::Idle,
            progress: 0.0,
            message: String::new(),
            eta_secs: None,
        }
    }

    pub fn new(status: ExportStatus, progress: f64, message: impl Into<String>) -> Self {
        Self {
            status,
            progress: progress.clamp(0.0, 100.0),
            message: message.into(),
            eta_secs: None,
        }
    }

    pub fn with_eta(mut self, eta_secs: f64) -> Self {
        self.eta_secs = Some(eta_secs.max(0.0));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolutions() {
        let vertical = ExportSettings::new(ExportQuality::P720, ExportFormat::Webm);
        assert_eq!(vertical.resolution(), (720, 1280));

        let horizontal = ExportSettings {
            quality: ExportQuality::P1080,
            aspect: AspectRatio::Horizontal,
            ..ExportSettings::default()
        };
        assert_eq!(horizontal.resolution(), (1920, 1080));
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(ExportFormat::Mp4.mime_type(), "video/mp4");
        assert_eq!(ExportFormat::Webm.extension(), "webm");
        assert_eq!("MP4".parse::<ExportFormat>().unwrap(), ExportFormat::Mp4);
        assert_eq!(
            "1080p".parse::<ExportQuality>().unwrap(),
            ExportQuality::P1080
        );
    }

    #[test]
    fn test_state_machine_edges() {
        use ExportStatus::*;
        assert!(Idle.can_transition_to(Preparing));
        assert!(!Idle.can_transition_to(Rendering));
        assert!(Rendering.can_transition_to(Encoding));
        assert!(!Rendering.can_transition_to(Complete));
        assert!(Encoding.can_transition_to(Converting));
        assert!(Converting.can_transition_to(Complete));
        assert!(Rendering.can_transition_to(Idle));
        assert!(Error.can_transition_to(Idle));
        assert!(Preparing.can_transition_to(Error));
        assert!(!Complete.can_transition_to(Rendering));
        assert!(!Idle.can_transition_to(Complete));
    }

    #[test]
    fn test_progress_is_clamped() {
        let p = ExportProgress::new(ExportStatus::Rendering, 140.0, "x").with_eta(-3.0);
        assert_eq!(p.progress, 100.0);
        assert_eq!(p.eta_secs, Some(0.0));
        assert_eq!(
            serde_json::to_value(ExportStatus::Converting).unwrap(),
            "converting"
        );
    }
}
