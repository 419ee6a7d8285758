//! TrueType text rendering for captions, banners, and the watermark.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use newscut_common::error::{NewscutError, NewscutResult};
use rusttype::{point, Font, Scale};

use crate::paint::blend_pixel;

/// Fonts tried when none is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Average advance of a glyph relative to its height, used without a font.
const FALLBACK_ADVANCE_RATIO: f32 = 0.55;

/// Draws text with a loaded font.
pub struct TextPainter {
    font: Font<'static>,
    source: PathBuf,
}

impl TextPainter {
    pub fn from_file(path: &Path) -> NewscutResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            NewscutError::render(format!("Failed to read font {}: {e}", path.display()))
        })?;
        let font = Font::try_from_vec(bytes).ok_or_else(|| {
            NewscutError::render(format!("Not a usable TrueType font: {}", path.display()))
        })?;
        Ok(Self {
            font,
            source: path.to_path_buf(),
        })
    }

    /// Load the configured font, or the first system font found.
    ///
    /// Returns `None` when nothing loads; callers then draw plates only.
    pub fn discover(configured: Option<&Path>) -> Option<Self> {
        if let Some(path) = configured {
            match Self::from_file(path) {
                Ok(painter) => return Some(painter),
                Err(e) => tracing::warn!(error = %e, "Configured font unusable"),
            }
        }
        let painter = SYSTEM_FONT_CANDIDATES
            .iter()
            .map(Path::new)
            .filter(|path| path.exists())
            .find_map(|path| Self::from_file(path).ok());
        match &painter {
            Some(p) => tracing::debug!(font = %p.source.display(), "Using system font"),
            None => tracing::warn!("No TrueType font found; subtitle text will not be drawn"),
        }
        painter
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Advance width of `text` at `px` pixels tall.
    pub fn measure(&self, text: &str, px: f32) -> f32 {
        let scale = Scale::uniform(px);
        self.font
            .layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }

    /// Draw `text` with its top-left at (`x`, `y`).
    pub fn draw(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        x: f32,
        y: f32,
        px: f32,
        color: Rgba<u8>,
    ) {
        let scale = Scale::uniform(px);
        let ascent = self.font.v_metrics(scale).ascent;
        let (width, height) = canvas.dimensions();

        for glyph in self.font.layout(text, scale, point(x, y + ascent)) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                let px_x = gx as i32 + bb.min.x;
                let px_y = gy as i32 + bb.min.y;
                if px_x < 0 || px_y < 0 || px_x >= width as i32 || px_y >= height as i32 {
                    return;
                }
                let alpha = (coverage * color[3] as f32).round().clamp(0.0, 255.0) as u8;
                blend_pixel(
                    canvas.get_pixel_mut(px_x as u32, px_y as u32),
                    Rgba([color[0], color[1], color[2], alpha]),
                );
            });
        }
    }
}

/// Text width with a painter, or an estimate from the character count.
pub fn text_width(painter: Option<&TextPainter>, text: &str, px: f32) -> f32 {
    match painter {
        Some(painter) => painter.measure(text, px),
        None => text.chars().count() as f32 * px * FALLBACK_ADVANCE_RATIO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_width_estimate() {
        assert!((text_width(None, "abcd", 10.0) - 22.0).abs() < 1e-4);
        assert_eq!(text_width(None, "", 10.0), 0.0);
    }

    #[test]
    fn test_missing_font_file() {
        assert!(TextPainter::from_file(Path::new("/nonexistent/font.ttf")).is_err());
    }

    #[test]
    fn test_garbage_font_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();
        assert!(TextPainter::from_file(&path).is_err());
    }

    #[test]
    fn test_discovered_font_draws_pixels() {
        // Only meaningful on hosts with a system font installed.
        let Some(painter) = TextPainter::discover(None) else {
            return;
        };
        let mut canvas = RgbaImage::from_pixel(200, 60, Rgba([0, 0, 0, 255]));
        assert!(painter.measure("NEWS", 32.0) > 0.0);
        painter.draw(&mut canvas, "NEWS", 4.0, 4.0, 32.0, Rgba([255, 255, 255, 255]));
        assert!(canvas.pixels().any(|p| p[0] > 128));
    }
}
