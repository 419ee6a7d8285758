//! Pixel layout of each overlay template.

use newscut_project_model::{Corner, OverlaySettings, SubtitlePosition, TemplateId};

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// Where each layer of a template goes on the output frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLayout {
    pub width: u32,
    pub height: u32,

    /// Region the active media clip is cover-fitted into.
    pub media_slot: Rect,

    /// Headline bar (headline template).
    pub headline_bar: Option<Rect>,

    /// "BREAKING NEWS" banner (breaking-news template).
    pub banner: Option<Rect>,

    /// Ticker strip below the banner (breaking-news template).
    pub ticker: Option<Rect>,

    /// Thin accent line (minimal template).
    pub accent_line: Option<Rect>,

    /// Vertical band the subtitle plate is centered in.
    pub subtitle_band: Rect,

    /// Caption text height in pixels.
    pub subtitle_px: f32,

    /// Headline/banner text height in pixels.
    pub title_px: f32,

    /// Inset used for the watermark and text padding.
    pub margin: u32,
}

impl TemplateLayout {
    pub fn for_overlay(overlay: &OverlaySettings, width: u32, height: u32) -> Self {
        let short = width.min(height) as f32;
        let margin = (short * 0.04).round().max(4.0) as u32;
        let bar_h = (height as f32 * 0.11).round() as u32;
        let subtitle_px = (short * overlay.subtitle.font_size_ratio as f32).clamp(12.0, 160.0);
        let title_px = (short * 0.055).clamp(12.0, 120.0);

        let full = Rect::new(0, 0, width, height);
        let mut layout = Self {
            width,
            height,
            media_slot: full,
            headline_bar: None,
            banner: None,
            ticker: None,
            accent_line: None,
            subtitle_band: full,
            subtitle_px,
            title_px,
            margin,
        };

        match overlay.template {
            TemplateId::Headline => {
                layout.headline_bar = Some(Rect::new(0, 0, width, bar_h));
                layout.media_slot = Rect::new(0, bar_h, width, height.saturating_sub(bar_h));
            }
            TemplateId::BreakingNews => {
                let ticker_h = (bar_h as f32 * 0.45).round() as u32;
                let banner_y = height.saturating_sub(bar_h + ticker_h);
                layout.banner = Some(Rect::new(0, banner_y, width, bar_h));
                layout.ticker = Some(Rect::new(0, banner_y + bar_h, width, ticker_h));
                layout.media_slot = Rect::new(0, 0, width, banner_y);
            }
            TemplateId::Minimal => {
                let line_h = (short * 0.012).round().max(2.0) as u32;
                layout.accent_line =
                    Some(Rect::new(0, height.saturating_sub(line_h), width, line_h));
            }
        }

        let band_h = (subtitle_px * 2.6).round() as u32;
        let slot = layout.media_slot;
        let band_y = match overlay.subtitle.position {
            SubtitlePosition::Bottom => slot
                .bottom()
                .saturating_sub(band_h + margin * 2)
                .max(slot.y),
            SubtitlePosition::Center => slot.y + slot.h.saturating_sub(band_h) / 2,
        };
        layout.subtitle_band = Rect::new(0, band_y, width, band_h.min(height));
        layout
    }

    /// Top-left origin for a box of `w`x`h` in `corner`, inset by the margin.
    pub fn corner_origin(&self, corner: Corner, w: u32, h: u32) -> (u32, u32) {
        let right = self.width.saturating_sub(w + self.margin);
        let bottom = self.height.saturating_sub(h + self.margin);
        let top = match self.headline_bar {
            Some(bar) => bar.bottom() + self.margin,
            None => self.margin,
        };
        match corner {
            Corner::TopLeft => (self.margin, top),
            Corner::TopRight => (right, top),
            Corner::BottomLeft => (self.margin, bottom),
            Corner::BottomRight => (right, bottom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headline_slot_sits_below_bar() {
        let layout = TemplateLayout::for_overlay(&OverlaySettings::default(), 720, 1280);
        let bar = layout.headline_bar.unwrap();
        assert_eq!(bar.y, 0);
        assert_eq!(layout.media_slot.y, bar.h);
        assert_eq!(layout.media_slot.bottom(), 1280);
        assert!(layout.banner.is_none());
    }

    #[test]
    fn test_breaking_news_stacks_banner_and_ticker() {
        let overlay = OverlaySettings::default().with_template(TemplateId::BreakingNews);
        let layout = TemplateLayout::for_overlay(&overlay, 1920, 1080);
        let banner = layout.banner.unwrap();
        let ticker = layout.ticker.unwrap();
        assert_eq!(banner.bottom(), ticker.y);
        assert_eq!(ticker.bottom(), 1080);
        assert_eq!(layout.media_slot.bottom(), banner.y);
    }

    #[test]
    fn test_subtitles_stay_inside_media_slot() {
        for template in [TemplateId::Headline, TemplateId::BreakingNews, TemplateId::Minimal] {
            let overlay = OverlaySettings::default().with_template(template);
            let layout = TemplateLayout::for_overlay(&overlay, 720, 1280);
            assert!(layout.subtitle_band.y >= layout.media_slot.y);
            assert!(layout.subtitle_band.bottom() <= layout.media_slot.bottom());
        }
    }

    #[test]
    fn test_watermark_corners() {
        let layout = TemplateLayout::for_overlay(
            &OverlaySettings::default().with_template(TemplateId::Minimal),
            1000,
            1000,
        );
        assert_eq!(layout.corner_origin(Corner::TopLeft, 100, 20), (40, 40));
        assert_eq!(layout.corner_origin(Corner::BottomRight, 100, 20), (860, 940));
    }
}
