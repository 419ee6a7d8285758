//! Capture sinks: where rendered frames go during an export.

use std::path::PathBuf;
use std::process::Stdio;

use image::RgbaImage;
use newscut_common::clock::FrameCadence;
use newscut_common::error::{NewscutError, NewscutResult};
use newscut_project_model::ExportFormat;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;

/// Parameters fixed for the lifetime of one capture.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_bitrate_kbps: u32,

    /// Narration muxed as the audio track, when present.
    pub narration: Option<PathBuf>,
}

/// Counters for a capture in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Frames received from the capture loop.
    pub frames_captured: u64,
    /// Extra copies written to keep a constant frame rate.
    pub frames_duplicated: u64,
    pub bytes_written: u64,
}

/// A finished container produced by a sink.
#[derive(Debug)]
pub struct CaptureOutput {
    pub file: NamedTempFile,
    pub format: ExportFormat,
    pub frames: u64,
    pub duration_secs: f64,
}

/// Destination of rendered frames.
///
/// Frames arrive in strictly increasing time order. A sink is consumed by
/// either `finalize` or `discard`.
#[async_trait::async_trait]
pub trait CaptureSink: Send {
    fn name(&self) -> &'static str;

    /// Container the sink writes without any conversion.
    fn native_format(&self) -> ExportFormat;

    async fn open(&mut self, config: &SinkConfig) -> NewscutResult<()>;

    async fn push_frame(&mut self, t: f64, frame: &RgbaImage) -> NewscutResult<()>;

    fn stats(&self) -> SinkStats;

    /// Close the stream and hand over the finished container.
    async fn finalize(self: Box<Self>) -> NewscutResult<CaptureOutput>;

    /// Abandon the capture; nothing it wrote stays on disk.
    async fn discard(self: Box<Self>);
}

/// Creates a fresh sink for each export run.
pub trait SinkFactory: Send + Sync {
    fn create(&self) -> NewscutResult<Box<dyn CaptureSink>>;
}

/// Temp file with the extension of `format`.
pub(crate) fn temp_container(format: ExportFormat) -> NewscutResult<NamedTempFile> {
    Ok(tempfile::Builder::new()
        .prefix("newscut-")
        .suffix(&format!(".{}", format.extension()))
        .tempfile()?)
}

/// Streams raw RGBA frames into an `ffmpeg` VP9/Opus WebM encoder.
pub struct FfmpegCaptureSink {
    config: Option<SinkConfig>,
    cadence: FrameCadence,
    output: Option<NamedTempFile>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
    next_index: u64,
    stats: SinkStats,
}

impl Default for FfmpegCaptureSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegCaptureSink {
    pub fn new() -> Self {
        Self {
            config: None,
            cadence: FrameCadence::new(30),
            output: None,
            child: None,
            stdin: None,
            stderr_task: None,
            next_index: 0,
            stats: SinkStats::default(),
        }
    }

    fn encoder_args(config: &SinkConfig, output: &std::path::Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgba".into(),
            "-s".into(),
            format!("{}x{}", config.width, config.height),
            "-framerate".into(),
            config.fps.to_string(),
            "-i".into(),
            "pipe:0".into(),
        ];
        if let Some(narration) = &config.narration {
            args.push("-i".into());
            args.push(narration.to_string_lossy().into_owned());
            args.extend(["-map", "0:v:0", "-map", "1:a:0"].map(String::from));
        }
        args.extend(
            [
                "-c:v",
                "libvpx-vp9",
                "-deadline",
                "realtime",
                "-cpu-used",
                "8",
                "-row-mt",
                "1",
                "-pix_fmt",
                "yuv420p",
            ]
            .map(String::from),
        );
        args.push("-b:v".into());
        args.push(format!("{}k", config.video_bitrate_kbps));
        if config.narration.is_some() {
            args.extend(["-c:a", "libopus", "-b:a", "128k"].map(String::from));
        }
        args.extend(["-f", "webm"].map(String::from));
        args.push(output.to_string_lossy().into_owned());
        args
    }

    async fn write_frame(&mut self, frame: &RgbaImage, copies: u64) -> NewscutResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| NewscutError::capture("Capture sink is not open"))?;
        for _ in 0..copies {
            if let Err(e) = stdin.write_all(frame.as_raw()).await {
                let detail = match self.stderr_task.take() {
                    Some(task) => task.await.unwrap_or_default(),
                    None => String::new(),
                };
                return Err(NewscutError::capture(format!(
                    "ffmpeg stopped accepting frames: {e}. {}",
                    detail.trim()
                )));
            }
            self.stats.bytes_written += frame.as_raw().len() as u64;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CaptureSink for FfmpegCaptureSink {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn native_format(&self) -> ExportFormat {
        ExportFormat::Webm
    }

    async fn open(&mut self, config: &SinkConfig) -> NewscutResult<()> {
        if self.child.is_some() {
            return Err(NewscutError::invalid_state("Capture sink already open"));
        }
        let output = temp_container(ExportFormat::Webm)?;
        let args = Self::encoder_args(config, output.path());
        tracing::debug!(args = ?args, "Starting capture encoder");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NewscutError::capture(format!("Failed to start ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| NewscutError::capture("Failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| NewscutError::capture("Failed to capture ffmpeg stderr"))?;

        // ffmpeg blocks once its stderr pipe is full.
        self.stderr_task = Some(tokio::spawn(async move {
            let mut output = String::new();
            if let Err(err) = stderr.read_to_string(&mut output).await {
                output = format!("<failed to read ffmpeg stderr: {err}>");
            }
            output
        }));

        tracing::info!(
            pid = child.id(),
            width = config.width,
            height = config.height,
            fps = config.fps,
            narration = config.narration.is_some(),
            "Capture encoder started"
        );

        self.cadence = FrameCadence::new(config.fps);
        self.config = Some(config.clone());
        self.output = Some(output);
        self.stdin = Some(stdin);
        self.child = Some(child);
        self.next_index = 0;
        self.stats = SinkStats::default();
        Ok(())
    }

    async fn push_frame(&mut self, t: f64, frame: &RgbaImage) -> NewscutResult<()> {
        let Some(config) = &self.config else {
            return Err(NewscutError::capture("Capture sink is not open"));
        };
        if frame.dimensions() != (config.width, config.height) {
            return Err(NewscutError::capture(format!(
                "Frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                config.width,
                config.height
            )));
        }

        // Fill skipped ticks with the current frame so the stream stays
        // at a constant rate.
        let target = self.cadence.frame_index(t);
        if target < self.next_index {
            return Ok(());
        }
        let copies = target - self.next_index + 1;
        self.write_frame(frame, copies).await?;
        self.next_index = target + 1;
        self.stats.frames_captured += 1;
        self.stats.frames_duplicated += copies - 1;
        Ok(())
    }

    fn stats(&self) -> SinkStats {
        self.stats
    }

    async fn finalize(self: Box<Self>) -> NewscutResult<CaptureOutput> {
        let mut this = *self;
        let mut child = this
            .child
            .take()
            .ok_or_else(|| NewscutError::capture("Capture sink is not open"))?;
        let output = this
            .output
            .take()
            .ok_or_else(|| NewscutError::capture("Capture sink has no output file"))?;

        // Closing stdin signals end of stream.
        drop(this.stdin.take());
        let status = child
            .wait()
            .await
            .map_err(|e| NewscutError::capture(format!("Failed waiting for ffmpeg: {e}")))?;
        let stderr = match this.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        if !status.success() {
            return Err(NewscutError::capture(format!(
                "ffmpeg exited with {status}: {}",
                stderr.trim()
            )));
        }

        let size = std::fs::metadata(output.path())?.len();
        if size == 0 {
            return Err(NewscutError::capture("ffmpeg produced an empty container"));
        }
        let duration_secs = this.cadence.frame_time(this.next_index);
        tracing::info!(
            frames = this.next_index,
            duplicated = this.stats.frames_duplicated,
            bytes = size,
            duration_secs,
            "Capture encoder finished"
        );
        Ok(CaptureOutput {
            file: output,
            format: ExportFormat::Webm,
            frames: this.next_index,
            duration_secs,
        })
    }

    async fn discard(self: Box<Self>) {
        let mut this = *self;
        drop(this.stdin.take());
        if let Some(mut child) = this.child.take() {
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "Failed to stop capture encoder");
            }
        }
        if let Some(task) = this.stderr_task.take() {
            task.abort();
        }
        // Dropping the temp file removes the partial container.
        drop(this.output.take());
        tracing::info!("Capture discarded");
    }
}

/// Builds [`FfmpegCaptureSink`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegSinkFactory;

impl SinkFactory for FfmpegSinkFactory {
    fn create(&self) -> NewscutResult<Box<dyn CaptureSink>> {
        if !newscut_render_engine::command_exists("ffmpeg") {
            return Err(NewscutError::capture(
                "ffmpeg is required for export. Install it with your package manager.",
            ));
        }
        Ok(Box::new(FfmpegCaptureSink::new()))
    }
}

/// What a [`MemorySink`] writes as its container: a JSON frame manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameManifest {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub narration: Option<PathBuf>,
    pub frame_times: Vec<f64>,
    pub duration_secs: f64,
}

/// Headless sink recording frame timestamps instead of encoding video.
///
/// Used for dry runs and tests; its "container" is a [`FrameManifest`].
#[derive(Debug, Default)]
pub struct MemorySink {
    config: Option<SinkConfig>,
    frame_times: Vec<f64>,
    stats: SinkStats,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_times(&self) -> &[f64] {
        &self.frame_times
    }
}

#[async_trait::async_trait]
impl CaptureSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn native_format(&self) -> ExportFormat {
        ExportFormat::Webm
    }

    async fn open(&mut self, config: &SinkConfig) -> NewscutResult<()> {
        self.config = Some(config.clone());
        self.frame_times.clear();
        self.stats = SinkStats::default();
        Ok(())
    }

    async fn push_frame(&mut self, t: f64, frame: &RgbaImage) -> NewscutResult<()> {
        if self.config.is_none() {
            return Err(NewscutError::capture("Capture sink is not open"));
        }
        if let Some(&last) = self.frame_times.last() {
            if t <= last {
                return Err(NewscutError::capture(format!(
                    "Frame at {t:.3}s is not after {last:.3}s"
                )));
            }
        }
        self.frame_times.push(t);
        self.stats.frames_captured += 1;
        self.stats.bytes_written += frame.as_raw().len() as u64;
        Ok(())
    }

    fn stats(&self) -> SinkStats {
        self.stats
    }

    async fn finalize(self: Box<Self>) -> NewscutResult<CaptureOutput> {
        let MemorySink {
            config,
            frame_times,
            ..
        } = *self;
        let config = config.ok_or_else(|| NewscutError::capture("Capture sink is not open"))?;
        let duration_secs = frame_times.last().copied().unwrap_or(0.0);
        let frames = frame_times.len() as u64;
        let manifest = FrameManifest {
            width: config.width,
            height: config.height,
            fps: config.fps,
            narration: config.narration,
            frame_times,
            duration_secs,
        };
        let file = temp_container(ExportFormat::Webm)?;
        std::fs::write(file.path(), serde_json::to_vec_pretty(&manifest)?)?;
        Ok(CaptureOutput {
            file,
            format: ExportFormat::Webm,
            frames,
            duration_secs,
        })
    }

    async fn discard(self: Box<Self>) {
        tracing::debug!(frames = self.frame_times.len(), "Memory capture discarded");
    }
}

/// Builds [`MemorySink`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemorySinkFactory;

impl SinkFactory for MemorySinkFactory {
    fn create(&self) -> NewscutResult<Box<dyn CaptureSink>> {
        Ok(Box::new(MemorySink::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn config(narration: Option<PathBuf>) -> SinkConfig {
        SinkConfig {
            width: 4,
            height: 8,
            fps: 10,
            video_bitrate_kbps: 2500,
            narration,
        }
    }

    #[test]
    fn test_encoder_args_with_narration() {
        let args = FfmpegCaptureSink::encoder_args(
            &config(Some(PathBuf::from("/tmp/voice.mp3"))),
            std::path::Path::new("/tmp/out.webm"),
        );
        let joined = args.join(" ");
        assert!(joined.contains("-s 4x8"));
        assert!(joined.contains("-framerate 10"));
        assert!(joined.contains("-i /tmp/voice.mp3"));
        assert!(joined.contains("-map 1:a:0"));
        assert!(joined.contains("libvpx-vp9"));
        assert!(joined.contains("libopus"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.webm"));
    }

    #[test]
    fn test_encoder_args_silent() {
        let args = FfmpegCaptureSink::encoder_args(&config(None), std::path::Path::new("o.webm"));
        assert!(!args.iter().any(|a| a == "libopus"));
        assert!(!args.iter().any(|a| a == "-map"));
    }

    #[tokio::test]
    async fn test_memory_sink_manifest() {
        let mut sink: Box<dyn CaptureSink> = Box::new(MemorySink::new());
        sink.open(&config(None)).await.unwrap();
        let frame = RgbaImage::from_pixel(4, 8, Rgba([0, 0, 0, 255]));
        for t in [0.0, 0.1, 0.2] {
            sink.push_frame(t, &frame).await.unwrap();
        }
        assert_eq!(sink.stats().frames_captured, 3);

        let output = sink.finalize().await.unwrap();
        assert_eq!(output.frames, 3);
        let manifest: FrameManifest =
            serde_json::from_slice(&std::fs::read(output.file.path()).unwrap()).unwrap();
        assert_eq!(manifest.frame_times, vec![0.0, 0.1, 0.2]);
        assert!(output.file.path().to_string_lossy().ends_with(".webm"));
    }

    #[tokio::test]
    async fn test_memory_sink_rejects_out_of_order_frames() {
        let mut sink = MemorySink::new();
        sink.open(&config(None)).await.unwrap();
        let frame = RgbaImage::new(4, 8);
        sink.push_frame(0.5, &frame).await.unwrap();
        assert!(sink.push_frame(0.5, &frame).await.is_err());
        assert!(sink.push_frame(0.2, &frame).await.is_err());
    }

    #[tokio::test]
    async fn test_ffmpeg_sink_requires_open() {
        let mut sink = FfmpegCaptureSink::new();
        let frame = RgbaImage::new(4, 8);
        assert!(sink.push_frame(0.0, &frame).await.is_err());
        assert!(Box::new(sink).finalize().await.is_err());
    }
}
