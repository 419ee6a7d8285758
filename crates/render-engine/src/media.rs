//! Media frame sources.
//!
//! Every clip on the lane is turned into a [`FrameSource`] sized to the
//! template's media slot. Stills are decoded and cover-fitted once on the
//! blocking pool; videos are streamed as raw RGBA from an `ffmpeg` child.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use async_trait::async_trait;
use image::imageops::FilterType;
use image::RgbaImage;
use newscut_common::error::{NewscutError, NewscutResult};
use newscut_project_model::{MediaClip, MediaKind, MediaLane};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout};

/// Forward jumps larger than this respawn the decoder instead of reading through.
const MAX_FORWARD_READ_SECS: f64 = 2.0;

/// Produces the frame of one clip at an intra-clip offset.
#[async_trait]
pub trait FrameSource: Send {
    /// Frame at `offset` seconds into the clip, or `None` when nothing is decodable.
    async fn frame_at(&mut self, offset: f64) -> NewscutResult<Option<&RgbaImage>>;

    /// Release decoder resources. The source may be used again afterwards.
    async fn close(&mut self) {}
}

/// Scale `img` to cover `w`x`h` and crop the overflow around the center.
pub fn cover_fit(img: &RgbaImage, w: u32, h: u32) -> RgbaImage {
    let (src_w, src_h) = img.dimensions();
    if src_w == 0 || src_h == 0 || w == 0 || h == 0 {
        return RgbaImage::new(w, h);
    }
    let scale = (w as f64 / src_w as f64).max(h as f64 / src_h as f64);
    let scaled_w = ((src_w as f64 * scale).ceil() as u32).max(w);
    let scaled_h = ((src_h as f64 * scale).ceil() as u32).max(h);
    let scaled = image::imageops::resize(img, scaled_w, scaled_h, FilterType::Triangle);
    let x = (scaled_w - w) / 2;
    let y = (scaled_h - h) / 2;
    image::imageops::crop_imm(&scaled, x, y, w, h).to_image()
}

/// A still image held for the whole clip.
pub struct StillSource {
    frame: RgbaImage,
}

impl StillSource {
    /// Decode and fit `path`. Blocking; see [`StillSource::load`].
    pub fn open(path: &Path, slot_w: u32, slot_h: u32) -> NewscutResult<Self> {
        let decoded = image::open(path)
            .map_err(|e| {
                NewscutError::render(format!("Failed to decode image {}: {e}", path.display()))
            })?
            .to_rgba8();
        Ok(Self::from_image(&decoded, slot_w, slot_h))
    }

    /// [`StillSource::open`] on the blocking pool.
    pub async fn load(path: PathBuf, slot_w: u32, slot_h: u32) -> NewscutResult<Self> {
        tokio::task::spawn_blocking(move || Self::open(&path, slot_w, slot_h))
            .await
            .map_err(|e| NewscutError::render(format!("Image decode task failed: {e}")))?
    }

    pub fn from_image(img: &RgbaImage, slot_w: u32, slot_h: u32) -> Self {
        Self {
            frame: cover_fit(img, slot_w, slot_h),
        }
    }
}

#[async_trait]
impl FrameSource for StillSource {
    async fn frame_at(&mut self, _offset: f64) -> NewscutResult<Option<&RgbaImage>> {
        Ok(Some(&self.frame))
    }
}

/// A video clip decoded on demand by `ffmpeg`.
///
/// Reads forward sequentially; a backwards or long forward jump respawns the
/// decoder at the new offset. At end of stream the last frame is held.
/// Dropping the source kills a running decoder.
pub struct VideoSource {
    path: PathBuf,
    width: u32,
    height: u32,
    fps: u32,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    /// Offset the running decoder was started at.
    origin: f64,
    /// Frames read since `origin`.
    frames_read: u64,
    frame: Option<RgbaImage>,
    buffer: Vec<u8>,
    eof: bool,
}

impl VideoSource {
    pub fn new(path: impl Into<PathBuf>, slot_w: u32, slot_h: u32, fps: u32) -> Self {
        Self {
            path: path.into(),
            width: slot_w,
            height: slot_h,
            fps: fps.max(1),
            child: None,
            stdout: None,
            origin: 0.0,
            frames_read: 0,
            frame: None,
            buffer: vec![0u8; slot_w as usize * slot_h as usize * 4],
            eof: false,
        }
    }

    fn frame_interval(&self) -> f64 {
        1.0 / self.fps as f64
    }

    /// Timestamp of the frame currently held.
    fn current_time(&self) -> f64 {
        self.origin + self.frames_read.saturating_sub(1) as f64 * self.frame_interval()
    }

    /// Timestamp of the next frame the decoder will produce.
    fn next_time(&self) -> f64 {
        self.origin + self.frames_read as f64 * self.frame_interval()
    }

    async fn spawn(&mut self, offset: f64) -> NewscutResult<()> {
        self.stop().await;
        let filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},fps={fps}",
            w = self.width,
            h = self.height,
            fps = self.fps
        );
        let mut child = tokio::process::Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-ss"])
            .arg(format!("{offset:.3}"))
            .arg("-i")
            .arg(&self.path)
            .args(["-an", "-vf", filter.as_str(), "-f", "rawvideo", "-pix_fmt", "rgba", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NewscutError::render(format!("Failed to start ffmpeg decoder: {e}")))?;

        tracing::debug!(
            path = %self.path.display(),
            offset,
            pid = child.id(),
            "Video decoder started"
        );

        self.stdout = child.stdout.take();
        self.child = Some(child);
        self.origin = offset;
        self.frames_read = 0;
        self.eof = false;
        Ok(())
    }

    async fn stop(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to stop video decoder"
                );
            }
        }
    }

    /// Read one frame into `self.frame`. Returns false at end of stream.
    async fn read_frame(&mut self) -> NewscutResult<bool> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(false);
        };
        match stdout.read_exact(&mut self.buffer).await {
            Ok(_) => {
                let frame = RgbaImage::from_raw(self.width, self.height, self.buffer.clone())
                    .ok_or_else(|| NewscutError::render("Decoded frame has unexpected size"))?;
                self.frame = Some(frame);
                self.frames_read += 1;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.eof = true;
                self.stop().await;
                Ok(false)
            }
            Err(e) => Err(NewscutError::render(format!(
                "Failed reading frames from {}: {e}",
                self.path.display()
            ))),
        }
    }
}

#[async_trait]
impl FrameSource for VideoSource {
    async fn frame_at(&mut self, offset: f64) -> NewscutResult<Option<&RgbaImage>> {
        let offset = offset.max(0.0);
        let epsilon = self.frame_interval() * 0.5;

        if self.eof && offset + epsilon >= self.current_time() {
            return Ok(self.frame.as_ref());
        }

        let backwards = self.frame.is_some() && offset + epsilon < self.current_time();
        let far_ahead = offset > self.next_time() + MAX_FORWARD_READ_SECS;
        if self.stdout.is_none() || backwards || far_ahead {
            self.spawn(offset).await?;
        }

        if self.frames_read == 0 && !self.read_frame().await? {
            return Ok(self.frame.as_ref());
        }
        while self.next_time() <= offset + epsilon {
            if !self.read_frame().await? {
                break;
            }
        }
        Ok(self.frame.as_ref())
    }

    async fn close(&mut self) {
        self.stop().await;
    }
}

/// Frame sources for every reachable clip of a lane, indexed like the lane.
#[derive(Default)]
pub struct MediaLibrary {
    sources: Vec<Box<dyn FrameSource>>,
}

impl MediaLibrary {
    /// Prepare sources for the first `reachable` clips of `lane`.
    ///
    /// Stills are decoded now so a missing or corrupt file fails the run
    /// before rendering starts.
    pub async fn prepare(
        lane: &MediaLane,
        reachable: usize,
        slot_w: u32,
        slot_h: u32,
        fps: u32,
    ) -> NewscutResult<Self> {
        let mut sources: Vec<Box<dyn FrameSource>> = Vec::with_capacity(reachable);
        for clip in lane.clips().iter().take(reachable) {
            sources.push(open_clip(clip, slot_w, slot_h, fps).await?);
        }
        tracing::info!(
            clips = sources.len(),
            skipped = lane.len().saturating_sub(sources.len()),
            slot_w,
            slot_h,
            "Media sources prepared"
        );
        Ok(Self { sources })
    }

    /// Build a library from already-constructed sources.
    pub fn from_sources(sources: Vec<Box<dyn FrameSource>>) -> Self {
        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub async fn frame(&mut self, index: usize, offset: f64) -> NewscutResult<Option<&RgbaImage>> {
        match self.sources.get_mut(index) {
            Some(source) => source.frame_at(offset).await,
            None => Ok(None),
        }
    }

    /// Stop all decoders.
    pub async fn close(&mut self) {
        for source in &mut self.sources {
            source.close().await;
        }
    }
}

async fn open_clip(
    clip: &MediaClip,
    slot_w: u32,
    slot_h: u32,
    fps: u32,
) -> NewscutResult<Box<dyn FrameSource>> {
    if tokio::fs::metadata(&clip.source).await.is_err() {
        return Err(NewscutError::FileNotFound {
            path: clip.source.clone(),
        });
    }
    match clip.kind {
        MediaKind::Image => {
            let still = StillSource::load(clip.source.clone(), slot_w, slot_h).await?;
            Ok(Box::new(still))
        }
        MediaKind::Video => {
            if !command_available("ffmpeg").await {
                return Err(NewscutError::render(
                    "ffmpeg is required to decode video clips",
                ));
            }
            Ok(Box::new(VideoSource::new(&clip.source, slot_w, slot_h, fps)))
        }
    }
}

/// [`command_exists`] without blocking the runtime.
pub async fn command_available(binary: &str) -> bool {
    tokio::process::Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .stdin(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Container duration in seconds via `ffprobe`.
pub fn probe_duration(path: &Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8(output.stdout).ok()?;
    let secs = raw.lines().next()?.trim().parse::<f64>().ok()?;
    (secs.is_finite() && secs > 0.0).then_some(secs)
}

/// Build a clip for `path`, probing video duration and using `image_secs` for stills.
pub fn clip_from_path(
    id: impl Into<String>,
    path: &Path,
    image_secs: f64,
    order: u32,
) -> NewscutResult<MediaClip> {
    match MediaKind::from_path(path) {
        Some(MediaKind::Image) => Ok(MediaClip::image(id, path, image_secs, order)),
        Some(MediaKind::Video) => {
            let duration = probe_duration(path).ok_or_else(|| {
                NewscutError::render(format!("Could not read duration of {}", path.display()))
            })?;
            Ok(MediaClip::video(id, path, duration, order))
        }
        None => Err(NewscutError::validation(format!(
            "Unsupported media type: {}",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_cover_fit_fills_slot() {
        let wide = RgbaImage::from_pixel(400, 100, Rgba([10, 20, 30, 255]));
        let fitted = cover_fit(&wide, 90, 160);
        assert_eq!(fitted.dimensions(), (90, 160));
        let px = fitted.get_pixel(45, 80);
        assert!(px[0].abs_diff(10) <= 1 && px[2].abs_diff(30) <= 1);
    }

    #[test]
    fn test_cover_fit_crops_center() {
        // Left half red, right half blue; a square crop from the middle keeps both.
        let mut img = RgbaImage::new(200, 100);
        for (x, _, px) in img.enumerate_pixels_mut() {
            *px = if x < 100 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            };
        }
        let fitted = cover_fit(&img, 100, 100);
        assert_eq!(fitted.get_pixel(5, 50)[0], 255);
        assert_eq!(fitted.get_pixel(95, 50)[2], 255);
    }

    #[tokio::test]
    async fn test_still_source_is_time_invariant() {
        let mut source = StillSource::from_image(&RgbaImage::new(32, 32), 16, 8);
        let first = source.frame_at(0.0).await.unwrap().unwrap();
        assert_eq!(first.dimensions(), (16, 8));
        assert!(source.frame_at(99.0).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_prepare_loads_stills_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        RgbaImage::new(8, 8).save(&a).unwrap();
        RgbaImage::new(8, 8).save(&b).unwrap();
        let lane = MediaLane::new(vec![
            MediaClip::image("a", &a, 5.0, 0),
            MediaClip::image("b", &b, 5.0, 1),
        ])
        .unwrap();

        let mut library = MediaLibrary::prepare(&lane, 1, 4, 4, 30).await.unwrap();
        assert_eq!(library.len(), 1);
        assert!(library.frame(0, 1.0).await.unwrap().is_some());
        assert!(library.frame(1, 1.0).await.unwrap().is_none());
        library.close().await;
    }

    #[tokio::test]
    async fn test_prepare_fails_on_missing_clip() {
        let lane = MediaLane::new(vec![MediaClip::image("x", "/nonexistent/x.png", 5.0, 0)])
            .unwrap();
        assert!(matches!(
            MediaLibrary::prepare(&lane, 1, 4, 4, 30).await,
            Err(NewscutError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_prepare_fails_on_corrupt_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        let lane = MediaLane::new(vec![MediaClip::image("x", &path, 5.0, 0)]).unwrap();
        assert!(matches!(
            MediaLibrary::prepare(&lane, 1, 4, 4, 30).await,
            Err(NewscutError::Render { .. })
        ));
    }

    #[tokio::test]
    async fn test_video_source_without_decoder_output_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.mp4");
        std::fs::write(&path, b"").unwrap();
        let mut source = VideoSource::new(&path, 4, 4, 10);
        // Whether ffmpeg is missing or rejects the file, no frame comes back.
        match source.frame_at(0.5).await {
            Ok(frame) => assert!(frame.is_none()),
            Err(e) => assert!(matches!(e, NewscutError::Render { .. })),
        }
        source.close().await;
        source.close().await;
    }

    #[tokio::test]
    async fn test_command_available_matches_blocking_check() {
        assert_eq!(command_available("sh").await, command_exists("sh"));
        assert!(!command_available("newscut-no-such-binary").await);
    }

    #[test]
    fn test_clip_from_path_uses_image_duration() {
        let clip = clip_from_path("p", Path::new("photo.jpg"), 3.5, 2).unwrap();
        assert!(clip.is_image());
        assert_eq!(clip.duration_secs, 3.5);
        assert!(clip_from_path("n", Path::new("notes.txt"), 3.5, 0).is_err());
    }
}
