//! Container conversion after capture (WebM to MP4).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use newscut_common::error::{NewscutError, NewscutResult};
use newscut_project_model::{ExportFormat, ExportQuality};
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::cancel::CancelFlag;
use crate::sink::temp_container;

/// One conversion job.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub target: ExportFormat,
    pub quality: ExportQuality,
    /// Expected media duration, used to scale progress.
    pub duration_secs: f64,
}

/// Converts a captured container into the requested format.
///
/// Implementations report coarse progress in `[0, 100]`, stop at the next
/// progress line after cancellation, and leave no output behind on failure.
/// Callers bound the call with a timeout; dropping the future must release
/// any child process.
#[async_trait::async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(
        &self,
        request: &TranscodeRequest,
        progress: &mut (dyn FnMut(f64) + Send),
        cancel: &CancelFlag,
    ) -> NewscutResult<NamedTempFile>;
}

/// Transcoder backed by an `ffmpeg` subprocess.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegTranscoder;

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self
    }

    fn args(request: &TranscodeRequest, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-nostats".into(),
            "-y".into(),
            "-i".into(),
            request.input.to_string_lossy().into_owned(),
            "-progress".into(),
            "pipe:1".into(),
        ];
        args.extend(codec_args(request.target, request.quality));
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

fn codec_args(format: ExportFormat, quality: ExportQuality) -> Vec<String> {
    let video_bitrate = format!("{}k", quality.video_bitrate_kbps().max(1000));
    match format {
        ExportFormat::Mp4 => vec![
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-profile:v".to_string(),
            "high".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-b:v".to_string(),
            video_bitrate,
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "192k".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ],
        ExportFormat::Webm => vec![
            "-c:v".to_string(),
            "libvpx-vp9".to_string(),
            "-b:v".to_string(),
            video_bitrate,
            "-c:a".to_string(),
            "libopus".to_string(),
        ],
    }
}

/// Latest values from ffmpeg's `-progress` key/value stream.
#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // Despite the name, ffmpeg reports microseconds here.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }

    fn percent(&self, expected_duration_secs: f64) -> f64 {
        if self.complete {
            return 100.0;
        }
        if expected_duration_secs <= 0.0 {
            return 0.0;
        }
        (self.out_time_secs / expected_duration_secs * 100.0).clamp(0.0, 99.0)
    }
}

#[async_trait::async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        request: &TranscodeRequest,
        progress: &mut (dyn FnMut(f64) + Send),
        cancel: &CancelFlag,
    ) -> NewscutResult<NamedTempFile> {
        let output = temp_container(request.target)?;
        let args = Self::args(request, output.path());
        tracing::debug!(args = ?args, "Running ffmpeg transcode");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NewscutError::transcode(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id(),
            target = %request.target.extension(),
            duration_secs = request.duration_secs,
            "Transcode started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| NewscutError::transcode("Failed to capture ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| NewscutError::transcode("Failed to capture ffmpeg stderr"))?;
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            if let Err(err) = stderr.read_to_string(&mut output).await {
                output = format!("<failed to read ffmpeg stderr: {err}>");
            }
            output
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| NewscutError::transcode(format!("Failed reading ffmpeg progress: {e}")))?
        {
            if cancel.is_cancelled() {
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to stop transcode");
                }
                stderr_task.abort();
                tracing::info!("Transcode cancelled");
                return Err(NewscutError::Cancelled);
            }
            if let Some((key, value)) = line.trim().split_once('=') {
                state.update(key, value);
                if key == "progress" {
                    progress(state.percent(request.duration_secs));
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| NewscutError::transcode(format!("Failed waiting for ffmpeg: {e}")))?;
        let stderr = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(NewscutError::transcode(format!(
                "ffmpeg exited with {status}: {}",
                stderr.trim()
            )));
        }
        cancel.check()?;
        progress(100.0);
        tracing::info!(output = %output.path().display(), "Transcode finished");
        Ok(output)
    }
}
