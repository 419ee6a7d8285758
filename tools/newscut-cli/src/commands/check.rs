//! Check system capabilities.

use newscut_common::config::{config_file_path, AppConfig};
use newscut_render_engine::{command_exists, TextPainter};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Newscut System Check");
    println!("{}", "=".repeat(50));

    let mut ready = true;

    for (binary, purpose) in [
        ("ffmpeg", "capture encoding, video decoding, transcoding"),
        ("ffprobe", "media durations"),
    ] {
        if command_exists(binary) {
            println!("[OK] {binary} ({purpose})");
        } else {
            println!("[MISSING] {binary} ({purpose}). Install it with your package manager.");
            ready = false;
        }
    }

    match TextPainter::discover(config.render.font_path.as_deref()) {
        Some(font) => println!("[OK] Font: {}", font.source().display()),
        None => println!("[WARN] No TrueType font found; subtitle text will not be drawn"),
    }

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[INFO] Config: defaults ({} not found)", config_path.display());
    }

    if config.api_key().is_some() {
        println!("[OK] API key: ${}", config.services.api_key_env);
    } else {
        println!(
            "[WARN] API key: ${} is not set; narrate and transcribe will fail",
            config.services.api_key_env
        );
    }

    println!("[INFO] Storage: {}", config.storage.root.display());
    println!("[INFO] Downloads: {}", config.output_dir.display());

    println!();
    if ready {
        println!("All required tools are available. Newscut is ready.");
    } else {
        println!("Some required tools are missing. See above for fixes.");
    }

    Ok(())
}
