//! Error types shared across Newscut crates.

use std::path::PathBuf;

/// Top-level error type for Newscut operations.
#[derive(Debug, thiserror::Error)]
pub enum NewscutError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Transcode error: {message}")]
    Transcode { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Subtitle error: {message}")]
    Subtitle { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Export cancelled")]
    Cancelled,

    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: String, secs: u64 },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using NewscutError.
pub type NewscutResult<T> = Result<T, NewscutError>;

impl NewscutError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn transcode(msg: impl Into<String>) -> Self {
        Self::Transcode {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn subtitle(msg: impl Into<String>) -> Self {
        Self::Subtitle {
            message: msg.into(),
        }
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network {
            message: msg.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState {
            message: msg.into(),
        }
    }

    pub fn timeout(stage: impl Into<String>, secs: u64) -> Self {
        Self::Timeout {
            stage: stage.into(),
            secs,
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether the error leaves pipeline state untouched.
    ///
    /// Validation, network, and storage failures are surfaced as notifications;
    /// everything else ends the current export run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::Network { .. } | Self::Storage { .. }
        )
    }

    /// Whether this error is the cooperative-cancellation sentinel.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(NewscutError::validation("no media").is_recoverable());
        assert!(NewscutError::network("503").is_recoverable());
        assert!(!NewscutError::capture("ffmpeg missing").is_recoverable());
        assert!(!NewscutError::Cancelled.is_recoverable());
        assert!(NewscutError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_timeout_message() {
        let err = NewscutError::timeout("encoding", 120);
        assert_eq!(err.to_string(), "encoding timed out after 120s");
    }
}
