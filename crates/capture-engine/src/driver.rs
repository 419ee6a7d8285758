//! The capture driver: turns a composition into a finished container.
//!
//! Walks the export phases `preparing -> rendering -> encoding [-> converting]`
//! and stops before `complete`, which the orchestrator enters once it owns the
//! artifact. Cancellation is checked at every frame tick, after every sink
//! push, around finalization and on every transcode progress line.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;
use newscut_common::clock::{FrameCadence, TickGate};
use newscut_common::config::{AppConfig, TranscodeFallback};
use newscut_common::error::{NewscutError, NewscutResult};
use newscut_project_model::{Composition, ExportFormat, ExportSettings, ExportStatus, MediaLane};
use newscut_render_engine::{FrameCompositor, MediaLibrary, Rect, TextPainter};
use tempfile::NamedTempFile;
use tokio::time::{Instant, MissedTickBehavior};

use crate::cancel::CancelFlag;
use crate::clock::PlaybackClock;
use crate::progress::ProgressPublisher;
use crate::sink::{CaptureSink, SinkConfig, SinkFactory, SinkStats};
use crate::transcode::{TranscodeRequest, Transcoder};

/// Opens frame sources for the clips a run can reach.
#[async_trait]
pub trait MediaLoader: Send + Sync {
    async fn load(
        &self,
        lane: &MediaLane,
        reachable: usize,
        slot: Rect,
        fps: u32,
    ) -> NewscutResult<MediaLibrary>;
}

/// Loads clips from disk (images decoded, videos streamed through ffmpeg).
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMediaLoader;

#[async_trait]
impl MediaLoader for FileMediaLoader {
    async fn load(
        &self,
        lane: &MediaLane,
        reachable: usize,
        slot: Rect,
        fps: u32,
    ) -> NewscutResult<MediaLibrary> {
        MediaLibrary::prepare(lane, reachable, slot.w, slot.h, fps).await
    }
}

/// Timeouts and policies for one driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverOptions {
    pub encode_timeout: Duration,
    pub transcode_timeout: Duration,
    pub transcode_fallback: TranscodeFallback,
    pub font_path: Option<PathBuf>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            encode_timeout: Duration::from_secs(120),
            transcode_timeout: Duration::from_secs(600),
            transcode_fallback: TranscodeFallback::OfferOriginal,
            font_path: None,
        }
    }
}

impl DriverOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            encode_timeout: Duration::from_secs(config.export.encode_timeout_secs.max(1)),
            transcode_timeout: Duration::from_secs(config.export.transcode_timeout_secs.max(1)),
            transcode_fallback: config.export.transcode_fallback,
            font_path: config.render.font_path.clone(),
        }
    }
}

/// The container a run produced.
#[derive(Debug)]
pub struct RenderedVideo {
    pub file: NamedTempFile,
    pub format: ExportFormat,
    pub duration_secs: f64,
    pub frames: u64,
    /// Set when the requested format could not be produced.
    pub warning: Option<String>,
}

/// Drives the compositor at a fixed cadence into a capture sink.
pub struct CaptureDriver {
    sinks: Arc<dyn SinkFactory>,
    media: Arc<dyn MediaLoader>,
    transcoder: Arc<dyn Transcoder>,
    options: DriverOptions,
}

impl CaptureDriver {
    pub fn new(
        sinks: Arc<dyn SinkFactory>,
        media: Arc<dyn MediaLoader>,
        transcoder: Arc<dyn Transcoder>,
        options: DriverOptions,
    ) -> Self {
        Self {
            sinks,
            media,
            transcoder,
            options,
        }
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Run every phase up to (not including) `complete`.
    ///
    /// The composition must already be validated and `progress` must be idle.
    pub async fn run(
        &self,
        composition: &Composition,
        settings: ExportSettings,
        progress: &mut ProgressPublisher,
        cancel: &CancelFlag,
    ) -> NewscutResult<RenderedVideo> {
        progress.transition(ExportStatus::Preparing, 0.0, "Preparing media")?;
        cancel.check()?;

        let (width, height) = settings.resolution();
        let font = TextPainter::discover(self.options.font_path.as_deref());
        let compositor = FrameCompositor::new(composition, width, height, font);

        let mut clock = match &composition.narration {
            Some(narration) => PlaybackClock::narration(narration.duration_secs),
            None => PlaybackClock::synthetic(composition.subtitles.duration()),
        };
        let total = clock.duration_secs();
        let reachable = compositor.timeline().reachable_clips(total);
        let slot = compositor.layout().media_slot;
        let mut media = self
            .media
            .load(&composition.media, reachable, slot, settings.fps)
            .await?;
        if let Err(e) = cancel.check() {
            media.close().await;
            return Err(e);
        }

        let mut sink = match self.sinks.create() {
            Ok(sink) => sink,
            Err(e) => {
                media.close().await;
                return Err(e);
            }
        };
        let sink_config = SinkConfig {
            width,
            height,
            fps: settings.fps,
            video_bitrate_kbps: settings.quality.video_bitrate_kbps(),
            narration: composition.narration.as_ref().map(|n| n.path.clone()),
        };
        if let Err(e) = sink.open(&sink_config).await {
            media.close().await;
            return Err(e);
        }
        tracing::info!(
            sink = sink.name(),
            width,
            height,
            fps = settings.fps,
            total_secs = total,
            clock = ?clock.source(),
            "Capture prepared"
        );

        let rendered = render_frames(
            &compositor,
            &mut media,
            sink.as_mut(),
            &mut clock,
            FrameCadence::new(settings.fps),
            progress,
            cancel,
        )
        .await;
        media.close().await;
        let stats = match rendered {
            Ok(stats) => stats,
            Err(e) => {
                sink.discard().await;
                return Err(e);
            }
        };

        if let Err(e) = progress.transition(ExportStatus::Encoding, 0.0, "Finalizing video") {
            sink.discard().await;
            return Err(e);
        }
        if let Err(e) = cancel.check() {
            sink.discard().await;
            return Err(e);
        }
        let native = sink.native_format();
        let secs = self.options.encode_timeout.as_secs();
        // Dropping the finalize future on timeout releases the encoder.
        let output = tokio::time::timeout(self.options.encode_timeout, sink.finalize())
            .await
            .map_err(|_| NewscutError::timeout("encoding", secs))??;
        cancel.check()?;
        tracing::info!(
            frames = output.frames,
            captured = stats.frames_captured,
            duplicated = stats.frames_duplicated,
            format = native.extension(),
            "Capture finalized"
        );

        let mut video = RenderedVideo {
            file: output.file,
            format: output.format,
            duration_secs: total,
            frames: output.frames,
            warning: None,
        };
        if settings.format == video.format {
            return Ok(video);
        }

        progress.transition(
            ExportStatus::Converting,
            0.0,
            format!("Converting to {}", settings.format.extension().to_uppercase()),
        )?;
        match self.convert(&video, settings, progress, cancel).await {
            Ok(file) => {
                video.file = file;
                video.format = settings.format;
                Ok(video)
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => match self.options.transcode_fallback {
                TranscodeFallback::OfferOriginal => {
                    let warning = format!(
                        "Could not convert to {}; offering {} instead ({e})",
                        settings.format.extension().to_uppercase(),
                        video.format.extension().to_uppercase()
                    );
                    tracing::warn!(error = %e, "Transcode failed, keeping original container");
                    video.warning = Some(warning);
                    Ok(video)
                }
                TranscodeFallback::Fail => Err(e),
            },
        }
    }

    async fn convert(
        &self,
        video: &RenderedVideo,
        settings: ExportSettings,
        progress: &mut ProgressPublisher,
        cancel: &CancelFlag,
    ) -> NewscutResult<NamedTempFile> {
        let request = TranscodeRequest {
            input: video.file.path().to_path_buf(),
            target: settings.format,
            quality: settings.quality,
            duration_secs: video.duration_secs,
        };
        let secs = self.options.transcode_timeout.as_secs();
        let mut report = |percent: f64| progress.advance(percent, None);
        tokio::time::timeout(
            self.options.transcode_timeout,
            self.transcoder.transcode(&request, &mut report, cancel),
        )
        .await
        .map_err(|_| NewscutError::timeout("converting", secs))?
    }
}

/// The realtime loop: one composited frame per accepted tick until the clock ends.
async fn render_frames(
    compositor: &FrameCompositor,
    media: &mut MediaLibrary,
    sink: &mut dyn CaptureSink,
    clock: &mut PlaybackClock,
    cadence: FrameCadence,
    progress: &mut ProgressPublisher,
    cancel: &CancelFlag,
) -> NewscutResult<SinkStats> {
    progress.transition(ExportStatus::Rendering, 0.0, "Recording frames")?;

    let total = clock.duration_secs();
    let mut canvas: RgbaImage = compositor.new_canvas();
    let mut gate = TickGate::new(cadence);

    // Clock first, so every tick reads at least its own slot time.
    let started = Instant::now();
    clock.start();
    let mut interval = tokio::time::interval(cadence.interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_t: Option<f64> = None;

    loop {
        interval.tick().await;
        cancel.check()?;

        let t = clock.current_time();
        let ended = clock.ended();
        // The final frame at `total` always goes out.
        if !ended && !gate.should_tick(t) {
            continue;
        }
        if last_t.is_some_and(|last| t <= last) {
            if ended {
                break;
            }
            continue;
        }

        compositor.draw_frame(t, media, &mut canvas).await?;
        sink.push_frame(t, &canvas).await?;
        cancel.check()?;
        last_t = Some(t);

        // Playback runs at rate 1.0, so the remaining media time is the ETA.
        progress.advance(100.0 * t / total, Some(total - t));

        if ended {
            break;
        }
    }

    let stats = sink.stats();
    tracing::info!(
        frames = stats.frames_captured,
        duration_secs = total,
        wall_secs = started.elapsed().as_secs_f64(),
        "Rendering finished"
    );
    Ok(stats)
}
