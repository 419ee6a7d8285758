//! Export lifecycle: start, cancel, download, reset, publish.

use std::path::{Path, PathBuf};

use newscut_audio_ai::{audio_mime_type, generate_srt};
use newscut_common::clock::RunStopwatch;
use newscut_common::error::{NewscutError, NewscutResult};
use newscut_project_model::{
    generate_id, Composition, ExportFormat, ExportProgress, ExportQuality, ExportSettings,
    ExportStatus, ProjectError, StoredVideo, VideoStatus,
};
use tempfile::NamedTempFile;
use tokio::sync::watch;

use crate::cancel::CancelFlag;
use crate::driver::{CaptureDriver, RenderedVideo};
use crate::progress::ProgressPublisher;
use crate::store::VideoStore;

/// The finished video of a completed export, held until reset.
#[derive(Debug)]
pub struct ExportedArtifact {
    file: NamedTempFile,
    format: ExportFormat,
    file_name: String,
    duration_secs: f64,
    frames: u64,
    warning: Option<String>,
}

impl ExportedArtifact {
    fn new(video: RenderedVideo, stamp: &str) -> Self {
        Self {
            file_name: format!("news-video-{stamp}.{}", video.format.extension()),
            file: video.file,
            format: video.format,
            duration_secs: video.duration_secs,
            frames: video.frames,
            warning: video.warning,
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Playable location of the artifact.
    pub fn url(&self) -> String {
        format!("file://{}", self.path().display())
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Suggested download name, `news-video-<stamp>.<ext>`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn size(&self) -> NewscutResult<u64> {
        Ok(std::fs::metadata(self.path())?.len())
    }
}

/// Where a download was written.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedVideo {
    pub path: PathBuf,
    pub mime_type: &'static str,
    pub bytes: u64,
}

/// Owns the export state machine for one composition.
///
/// All transitions go through a single [`ProgressPublisher`]; observers get
/// read-only receivers from [`ExportOrchestrator::subscribe`].
pub struct ExportOrchestrator {
    composition: Composition,
    driver: CaptureDriver,
    defaults: ExportSettings,
    progress: ProgressPublisher,
    cancel: CancelFlag,
    artifact: Option<ExportedArtifact>,
}

impl ExportOrchestrator {
    pub fn new(composition: Composition, driver: CaptureDriver) -> Self {
        Self {
            composition,
            driver,
            defaults: ExportSettings::default(),
            progress: ProgressPublisher::new(),
            cancel: CancelFlag::new(),
            artifact: None,
        }
    }

    /// Aspect and frame rate used by [`start`](Self::start).
    pub fn with_defaults(mut self, defaults: ExportSettings) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Swap the composition. Only allowed while idle.
    pub fn set_composition(&mut self, composition: Composition) -> NewscutResult<()> {
        if self.status() != ExportStatus::Idle {
            return Err(NewscutError::invalid_state(
                "Cannot edit the composition during an export",
            ));
        }
        self.composition = composition;
        Ok(())
    }

    pub fn status(&self) -> ExportStatus {
        self.progress.status()
    }

    pub fn progress(&self) -> ExportProgress {
        self.progress.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<ExportProgress> {
        self.progress.subscribe()
    }

    /// Phases entered by the latest run, starting from `idle`.
    pub fn phases(&self) -> &[ExportStatus] {
        self.progress.phases()
    }

    pub fn artifact(&self) -> Option<&ExportedArtifact> {
        self.artifact.as_ref()
    }

    /// Handle that cancels the running export from another task.
    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Request cancellation. Takes effect at the next checkpoint.
    pub fn cancel(&self) {
        if self.status().is_active() {
            tracing::info!(status = %self.status(), "Export cancellation requested");
        }
        self.cancel.cancel();
    }

    /// Run an export to completion.
    ///
    /// Returns the final status: `Complete`, or `Idle` when cancelled.
    /// Validation failures leave the state idle with the reason as message;
    /// any other failure moves to `Error` and is returned.
    pub async fn start(
        &mut self,
        quality: ExportQuality,
        format: ExportFormat,
    ) -> NewscutResult<ExportStatus> {
        if self.status() != ExportStatus::Idle {
            return Err(NewscutError::invalid_state(format!(
                "Export is {}; reset before starting another",
                self.status()
            )));
        }
        if let Err(e) = self.composition.validate() {
            let message = match e {
                ProjectError::ValidationError { message } => message,
                other => other.to_string(),
            };
            tracing::warn!(%message, "Export rejected");
            self.progress.idle(message.clone());
            return Err(NewscutError::validation(message));
        }

        self.cancel.reset();
        self.progress.clear_history();
        let settings = ExportSettings {
            quality,
            format,
            ..self.defaults
        };
        let stopwatch = RunStopwatch::start();
        tracing::info!(
            title = %self.composition.title,
            quality = ?quality,
            format = format.extension(),
            started_at = %stopwatch.epoch_wall(),
            "Export started"
        );

        let result = self
            .driver
            .run(&self.composition, settings, &mut self.progress, &self.cancel)
            .await;

        match result {
            Ok(video) => {
                let artifact = ExportedArtifact::new(video, &stopwatch.file_stamp());
                let message = match artifact.warning() {
                    Some(warning) => warning.to_string(),
                    None => format!("Export ready: {}", artifact.file_name()),
                };
                self.progress
                    .transition(ExportStatus::Complete, 100.0, message)?;
                tracing::info!(
                    url = %artifact.url(),
                    duration_secs = artifact.duration_secs(),
                    wall_secs = stopwatch.elapsed_secs(),
                    "Export complete"
                );
                self.artifact = Some(artifact);
                Ok(ExportStatus::Complete)
            }
            Err(e) if e.is_cancelled() => {
                self.progress.idle("Export cancelled");
                self.cancel.reset();
                Ok(ExportStatus::Idle)
            }
            Err(e) => {
                self.progress.fail(e.to_string());
                Err(e)
            }
        }
    }

    /// Copy the artifact into `dir` under its download name.
    pub fn download(&self, dir: &Path) -> NewscutResult<DownloadedVideo> {
        let artifact = self.completed_artifact()?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(artifact.file_name());
        let bytes = std::fs::copy(artifact.path(), &path)?;
        tracing::info!(path = %path.display(), bytes, "Export downloaded");
        Ok(DownloadedVideo {
            path,
            mime_type: artifact.mime_type(),
            bytes,
        })
    }

    /// Release the artifact and return to idle from `complete` or `error`.
    pub fn reset(&mut self) -> NewscutResult<()> {
        let status = self.status();
        match status {
            ExportStatus::Idle => Ok(()),
            ExportStatus::Complete | ExportStatus::Error => {
                self.artifact = None;
                self.cancel.reset();
                self.progress.idle("");
                tracing::debug!(from = %status, "Export reset");
                Ok(())
            }
            active => Err(NewscutError::invalid_state(format!(
                "Cannot reset while {active}; cancel first"
            ))),
        }
    }

    /// Upload the artifact with its subtitle and narration sidecars, then
    /// record it. Storage failures are returned without touching export state.
    pub async fn publish(&self, store: &dyn VideoStore) -> NewscutResult<StoredVideo> {
        let artifact = self.completed_artifact()?;
        let id = generate_id();

        let video_bytes = tokio::fs::read(artifact.path()).await?;
        let video_url = store
            .upload(
                video_bytes,
                &format!("videos/{id}.{}", artifact.format().extension()),
                artifact.mime_type(),
            )
            .await?;

        let words = self.composition.subtitles.words();
        let subtitle_url = if words.is_empty() {
            None
        } else {
            let srt = generate_srt(words);
            Some(
                store
                    .upload(
                        srt.into_bytes(),
                        &format!("subtitles/{id}.srt"),
                        "application/x-subrip",
                    )
                    .await?,
            )
        };

        let audio_url = match &self.composition.narration {
            Some(narration) => {
                let ext = narration
                    .path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("mp3");
                let bytes = tokio::fs::read(&narration.path).await?;
                Some(
                    store
                        .upload(
                            bytes,
                            &format!("audio/{id}.{ext}"),
                            audio_mime_type(&narration.path),
                        )
                        .await?,
                )
            }
            None => None,
        };

        let record = StoredVideo {
            id,
            title: self.composition.title.clone(),
            video_url,
            audio_url,
            subtitle_url,
            duration_secs: artifact.duration_secs(),
            template: self.composition.overlay.template,
            voice: self
                .composition
                .narration
                .as_ref()
                .and_then(|n| n.voice_id.clone()),
            status: VideoStatus::Ready,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        store.insert_video(record).await
    }

    fn completed_artifact(&self) -> NewscutResult<&ExportedArtifact> {
        match (&self.artifact, self.status()) {
            (Some(artifact), ExportStatus::Complete) => Ok(artifact),
            (_, status) => Err(NewscutError::invalid_state(format!(
                "No finished export (status: {status})"
            ))),
        }
    }
}
