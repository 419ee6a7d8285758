//! Newscut CLI: build compositions, narrate, subtitle, and export news videos.
//!
//! Usage:
//!   newscut init <TITLE>           Create a composition file from media
//!   newscut export <PATH>          Export a composition to video
//!   newscut subtitles <PATH>       Write or import subtitle sidecars
//!   newscut thumbnails <PATH>      Render media-lane previews
//!   newscut narrate <PATH>         Synthesize narration for the script
//!   newscut transcribe <PATH>      Derive word timings from narration
//!   newscut videos <ACTION>        Manage published videos and presets
//!   newscut check                  Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use newscut_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "newscut",
    about = "Narrated news clips with burned-in subtitles",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/newscut/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a composition file from media, narration, and subtitles
    Init {
        /// Story title
        title: String,

        /// Composition file to write
        #[arg(short, long, default_value = "composition.json")]
        output: PathBuf,

        /// Video or image clip, in lane order (repeatable)
        #[arg(short, long = "media")]
        media: Vec<PathBuf>,

        /// Narration audio file
        #[arg(long)]
        narration: Option<PathBuf>,

        /// SRT file with word timings
        #[arg(long)]
        subtitles: Option<PathBuf>,

        /// Narration script
        #[arg(long)]
        script: Option<String>,

        /// Overlay template: headline|breaking-news|minimal
        #[arg(long, default_value = "headline")]
        template: String,

        /// Headline text (defaults to the title)
        #[arg(long)]
        headline: Option<String>,
    },

    /// Export a composition to video
    Export {
        /// Composition file
        path: PathBuf,

        /// Output quality: 720p|1080p
        #[arg(short, long)]
        quality: Option<String>,

        /// Output format: webm|mp4
        #[arg(short, long)]
        format: Option<String>,

        /// Frame orientation: vertical|horizontal
        #[arg(long, default_value = "vertical")]
        aspect: String,

        /// Capture frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Directory for the downloaded video
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Render without encoding (writes a frame manifest)
        #[arg(long)]
        dry_run: bool,

        /// Upload the result to the local video store
        #[arg(long)]
        publish: bool,
    },

    /// Write the composition's subtitles to a sidecar, or import an SRT file
    Subtitles {
        /// Composition file
        path: PathBuf,

        /// Sidecar to write (.srt or .vtt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// SRT file whose words replace the composition's subtitles
        #[arg(long, conflicts_with = "output")]
        import: Option<PathBuf>,
    },

    /// Render preview thumbnails for the first clips of the media lane
    Thumbnails {
        /// Composition file
        path: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "thumbnails")]
        output: PathBuf,

        /// Thumbnail width
        #[arg(long, default_value = "320")]
        width: u32,

        /// Thumbnail height
        #[arg(long, default_value = "180")]
        height: u32,
    },

    /// Synthesize narration for the composition's script
    Narrate {
        /// Composition file
        path: PathBuf,

        /// Voice identifier
        #[arg(long, default_value = "anchor")]
        voice: String,

        /// Where to write the audio (defaults next to the composition)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Transcribe narration into word-timed subtitles
    Transcribe {
        /// Composition file
        path: PathBuf,

        /// Audio to transcribe (defaults to the composition's narration)
        #[arg(long)]
        audio: Option<PathBuf>,

        /// Language hint
        #[arg(long, default_value = "en")]
        language: String,
    },

    /// Manage published videos and overlay presets
    Videos {
        #[command(subcommand)]
        action: VideosAction,
    },

    /// Check system capabilities
    Check,
}

#[derive(Subcommand)]
pub enum VideosAction {
    /// List published videos
    List,

    /// Delete a published video record
    Delete {
        /// Video id
        id: String,
    },

    /// List saved overlay presets
    Presets,

    /// Save a composition's overlay as a named preset
    SavePreset {
        /// Preset name
        name: String,

        /// Composition file to take the overlay from
        path: PathBuf,
    },

    /// Delete an overlay preset
    DeletePreset {
        /// Preset id
        id: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    newscut_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Init {
            title,
            output,
            media,
            narration,
            subtitles,
            script,
            template,
            headline,
        } => commands::init::run(
            &config,
            commands::init::InitOptions {
                title,
                output,
                media,
                narration,
                subtitles,
                script,
                template,
                headline,
            },
        ),
        Commands::Export {
            path,
            quality,
            format,
            aspect,
            fps,
            output,
            dry_run,
            publish,
        } => {
            commands::export::run(
                &config,
                commands::export::ExportOptions {
                    path,
                    quality,
                    format,
                    aspect,
                    fps,
                    output,
                    dry_run,
                    publish,
                },
            )
            .await
        }
        Commands::Subtitles {
            path,
            output,
            import,
        } => commands::subtitles::run(path, output, import),
        Commands::Thumbnails {
            path,
            output,
            width,
            height,
        } => commands::thumbnails::run(path, output, width, height),
        Commands::Narrate {
            path,
            voice,
            output,
        } => commands::narrate::run(&config, path, voice, output).await,
        Commands::Transcribe {
            path,
            audio,
            language,
        } => commands::transcribe::run(&config, path, audio, language).await,
        Commands::Videos { action } => commands::videos::run(&config, action).await,
        Commands::Check => commands::check::run(&config),
    }
}
