//! Export a composition to video.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use newscut_capture_engine::{
    CaptureDriver, DriverOptions, ExportOrchestrator, FfmpegSinkFactory, FfmpegTranscoder,
    FileMediaLoader, LocalVideoStore, MemorySinkFactory, SinkFactory,
};
use newscut_common::config::AppConfig;
use newscut_project_model::{
    AspectRatio, ExportFormat, ExportQuality, ExportSettings, ExportStatus,
};

use super::load_composition;

pub struct ExportOptions {
    pub path: PathBuf,
    pub quality: Option<String>,
    pub format: Option<String>,
    pub aspect: String,
    pub fps: Option<u32>,
    pub output: Option<PathBuf>,
    pub dry_run: bool,
    pub publish: bool,
}

pub async fn run(config: &AppConfig, options: ExportOptions) -> anyhow::Result<()> {
    println!("Exporting composition at: {}", options.path.display());

    let composition = load_composition(&options.path)?;

    let quality: ExportQuality = options
        .quality
        .as_deref()
        .unwrap_or(&config.export.quality)
        .parse()
        .map_err(anyhow::Error::msg)?;
    let format: ExportFormat = options
        .format
        .as_deref()
        .unwrap_or(&config.export.format)
        .parse()
        .map_err(anyhow::Error::msg)?;
    let aspect: AspectRatio = options.aspect.parse().map_err(anyhow::Error::msg)?;
    let settings = ExportSettings {
        quality,
        format,
        aspect,
        fps: options.fps.unwrap_or(config.export.fps),
    };
    let (width, height) = settings.resolution();

    println!("  Title: {}", composition.title);
    println!("  Resolution: {width}x{height} @ {}fps", settings.fps);
    println!("  Format: {}", format.extension());
    if options.dry_run {
        println!("  Dry run: frames are recorded, not encoded");
    }

    let sinks: Arc<dyn SinkFactory> = if options.dry_run {
        Arc::new(MemorySinkFactory)
    } else {
        Arc::new(FfmpegSinkFactory)
    };
    let driver = CaptureDriver::new(
        sinks,
        Arc::new(FileMediaLoader),
        Arc::new(FfmpegTranscoder::new()),
        DriverOptions::from_config(config),
    );
    let mut orchestrator = ExportOrchestrator::new(composition, driver).with_defaults(settings);

    let mut rx = orchestrator.subscribe();
    let printer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let p = rx.borrow().clone();
            let eta = p
                .eta_secs
                .map(|eta| format!(", ETA: {eta:.0}s"))
                .unwrap_or_default();
            print!(
                "\r  {:<10} {:>5.1}%{eta}  {}          ",
                p.status.label(),
                p.progress,
                p.message
            );
            let _ = std::io::stdout().flush();
        }
    });

    let cancel = orchestrator.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling export");
            cancel.cancel();
        }
    });

    let result = orchestrator.start(quality, format).await;
    interrupt.abort();
    printer.abort();
    println!();

    match result {
        Ok(ExportStatus::Complete) => {
            let output_dir = options.output.unwrap_or_else(|| config.output_dir.clone());
            let download = orchestrator.download(&output_dir)?;
            if let Some(warning) = orchestrator.artifact().and_then(|a| a.warning()) {
                println!("Warning: {warning}");
            }
            println!(
                "Export complete: {} ({}, {} bytes)",
                download.path.display(),
                download.mime_type,
                download.bytes
            );

            if options.publish {
                let store = LocalVideoStore::new(&config.storage.root);
                match orchestrator.publish(&store).await {
                    Ok(video) => println!("Published as {} ({})", video.id, video.video_url),
                    Err(e) => println!("Publishing failed: {e}"),
                }
            }
        }
        Ok(status) => {
            println!("Export cancelled (status: {status})");
        }
        Err(e) => {
            println!("Export failed: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}
