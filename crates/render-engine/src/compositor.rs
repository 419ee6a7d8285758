//! Frame compositor: background, media, template, subtitles, watermark.
//!
//! [`FrameCompositor::compose`] is a pure function of `t` and the media frame
//! for that instant, so frames can be drawn repeatedly and out of order.
//! [`FrameCompositor::draw_frame`] fetches that media frame first.

use image::{Rgba, RgbaImage};
use newscut_common::error::NewscutResult;
use newscut_project_model::{Composition, OverlaySettings, SubtitleTrack, TemplateId};

use crate::layout::{Rect, TemplateLayout};
use crate::media::MediaLibrary;
use crate::paint::{color_or, fill_rect, with_opacity};
use crate::text::{text_width, TextPainter};
use crate::timing::{caption_at, ActiveClip, LaneTimeline};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Resolved colors for one composition.
#[derive(Debug, Clone, Copy)]
struct Palette {
    background: Rgba<u8>,
    accent: Rgba<u8>,
    text: Rgba<u8>,
    highlight: Rgba<u8>,
    plate: Rgba<u8>,
}

impl Palette {
    fn from_overlay(overlay: &OverlaySettings) -> Self {
        Self {
            background: color_or(&overlay.background, Rgba([16, 16, 20, 255])),
            accent: color_or(&overlay.accent, Rgba([214, 40, 40, 255])),
            text: color_or(&overlay.subtitle.color, WHITE),
            highlight: color_or(&overlay.subtitle.highlight_color, Rgba([255, 212, 0, 255])),
            plate: color_or(&overlay.subtitle.plate_color, Rgba([0, 0, 0, 180])),
        }
    }
}

/// Draws complete output frames for one frozen composition.
pub struct FrameCompositor {
    layout: TemplateLayout,
    overlay: OverlaySettings,
    palette: Palette,
    timeline: LaneTimeline,
    subtitles: SubtitleTrack,
    /// Run length; clips starting at or after it are never shown.
    total_secs: f64,
    text: Option<TextPainter>,
}

impl FrameCompositor {
    pub fn new(
        composition: &Composition,
        width: u32,
        height: u32,
        text: Option<TextPainter>,
    ) -> Self {
        let overlay = composition.overlay.clone();
        Self {
            layout: TemplateLayout::for_overlay(&overlay, width, height),
            palette: Palette::from_overlay(&overlay),
            overlay,
            timeline: LaneTimeline::new(&composition.media),
            subtitles: composition.subtitles.clone(),
            total_secs: composition.total_duration(),
            text,
        }
    }

    pub fn layout(&self) -> &TemplateLayout {
        &self.layout
    }

    pub fn timeline(&self) -> &LaneTimeline {
        &self.timeline
    }

    pub fn has_font(&self) -> bool {
        self.text.is_some()
    }

    /// A blank canvas of the output size.
    pub fn new_canvas(&self) -> RgbaImage {
        RgbaImage::new(self.layout.width, self.layout.height)
    }

    /// The clip on screen at `t`.
    pub fn active_clip(&self, t: f64) -> Option<ActiveClip> {
        self.timeline.active_clip_within(t, self.total_secs)
    }

    /// Draw the frame at narration time `t` into `canvas`.
    pub async fn draw_frame(
        &self,
        t: f64,
        media: &mut MediaLibrary,
        canvas: &mut RgbaImage,
    ) -> NewscutResult<()> {
        let frame = match self.active_clip(t) {
            Some(active) => media.frame(active.index, active.offset).await?,
            None => None,
        };
        self.compose(t, frame, canvas);
        Ok(())
    }

    /// Paint every layer for `t` over `media_frame` (background only when `None`).
    pub fn compose(&self, t: f64, media_frame: Option<&RgbaImage>, canvas: &mut RgbaImage) {
        self.draw_background(canvas);
        if let Some(frame) = media_frame {
            let slot = self.layout.media_slot;
            image::imageops::replace(canvas, frame, i64::from(slot.x), i64::from(slot.y));
        }
        self.draw_template(canvas);
        if self.overlay.subtitle.enabled {
            self.draw_subtitles(t, canvas);
        }
        if self.overlay.watermark.visible {
            self.draw_watermark(canvas);
        }
    }

    fn draw_background(&self, canvas: &mut RgbaImage) {
        let background = Rgba([
            self.palette.background[0],
            self.palette.background[1],
            self.palette.background[2],
            255,
        ]);
        for pixel in canvas.pixels_mut() {
            *pixel = background;
        }
    }

    fn draw_template(&self, canvas: &mut RgbaImage) {
        let layout = &self.layout;
        let title_px = layout.title_px;
        let pad = layout.margin as f32;

        match self.overlay.template {
            TemplateId::Headline => {
                if let Some(bar) = layout.headline_bar {
                    fill_rect(canvas, bar, self.palette.accent);
                    let headline = self.overlay.headline.as_str();
                    self.draw_label(canvas, headline, bar, pad, title_px, WHITE);
                }
            }
            TemplateId::BreakingNews => {
                if let Some(banner) = layout.banner {
                    fill_rect(canvas, banner, self.palette.accent);
                    let label = "BREAKING NEWS";
                    let label_w = text_width(self.text.as_ref(), label, title_px * 0.7);
                    let tag = Rect::new(
                        banner.x,
                        banner.y,
                        (label_w + pad * 2.0).round() as u32,
                        banner.h / 2,
                    );
                    fill_rect(canvas, tag, WHITE);
                    let accent = self.palette.accent;
                    self.draw_label(canvas, label, tag, pad, title_px * 0.7, accent);

                    let headline_area = Rect::new(
                        banner.x,
                        banner.y + banner.h / 2,
                        banner.w,
                        banner.h - banner.h / 2,
                    );
                    let headline = self.overlay.headline.as_str();
                    let headline_px = title_px * 0.8;
                    self.draw_label(canvas, headline, headline_area, pad, headline_px, WHITE);
                }
                if let Some(ticker) = layout.ticker {
                    fill_rect(canvas, ticker, BLACK);
                    let ticker_text = self.ticker_text();
                    let ticker_px = title_px * 0.55;
                    self.draw_label(canvas, &ticker_text, ticker, pad, ticker_px, WHITE);
                }
            }
            TemplateId::Minimal => {
                if let Some(line) = layout.accent_line {
                    fill_rect(canvas, line, self.palette.accent);
                }
            }
        }
    }

    fn ticker_text(&self) -> String {
        let transcript = self.subtitles.transcript();
        if transcript.is_empty() {
            self.overlay.headline.to_uppercase()
        } else {
            transcript.to_uppercase()
        }
    }

    fn draw_subtitles(&self, t: f64, canvas: &mut RgbaImage) {
        let style = &self.overlay.subtitle;
        let Some(caption) = caption_at(&self.subtitles, t, style.words_per_caption) else {
            return;
        };

        let px = self.layout.subtitle_px;
        let words: Vec<String> = caption
            .words
            .iter()
            .map(|w| {
                if style.uppercase {
                    w.text.to_uppercase()
                } else {
                    w.text.clone()
                }
            })
            .collect();
        let space = text_width(self.text.as_ref(), " ", px);
        let widths: Vec<f32> = words
            .iter()
            .map(|w| text_width(self.text.as_ref(), w, px))
            .collect();
        let line_w = widths.iter().sum::<f32>() + space * words.len().saturating_sub(1) as f32;

        let band = self.layout.subtitle_band;
        let pad_x = px * 0.5;
        let plate_w = (line_w + pad_x * 2.0).min(self.layout.width as f32).round() as u32;
        let plate_h = (px * 1.5).round() as u32;
        let plate = Rect::new(
            self.layout.width.saturating_sub(plate_w) / 2,
            band.y + band.h.saturating_sub(plate_h) / 2,
            plate_w,
            plate_h,
        );
        fill_rect(canvas, plate, self.palette.plate);

        let Some(painter) = self.text.as_ref() else {
            return;
        };
        let mut x = plate.x as f32 + pad_x;
        let y = plate.y as f32 + (plate_h as f32 - px) / 2.0;
        for (i, (word, width)) in words.iter().zip(&widths).enumerate() {
            let color = if caption.highlight == Some(i) {
                self.palette.highlight
            } else {
                self.palette.text
            };
            painter.draw(canvas, word, x, y, px, color);
            x += width + space;
        }
    }

    fn draw_watermark(&self, canvas: &mut RgbaImage) {
        let watermark = &self.overlay.watermark;
        if watermark.text.trim().is_empty() {
            return;
        }
        let px = (self.layout.subtitle_px * 0.55).max(10.0);
        let pad = px * 0.4;
        let w = (text_width(self.text.as_ref(), &watermark.text, px) + pad * 2.0).round() as u32;
        let h = (px + pad * 2.0).round() as u32;
        let (x, y) = self.layout.corner_origin(watermark.corner, w, h);

        fill_rect(
            canvas,
            Rect::new(x, y, w, h),
            with_opacity(Rgba([0, 0, 0, 160]), watermark.opacity),
        );
        if let Some(painter) = self.text.as_ref() {
            painter.draw(
                canvas,
                &watermark.text,
                x as f32 + pad,
                y as f32 + pad,
                px,
                with_opacity(WHITE, watermark.opacity),
            );
        }
    }

    fn draw_label(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        area: Rect,
        pad: f32,
        px: f32,
        color: Rgba<u8>,
    ) {
        let Some(painter) = self.text.as_ref() else {
            return;
        };
        if text.is_empty() || area.is_empty() {
            return;
        }
        let y = area.y as f32 + (area.h as f32 - px) / 2.0;
        painter.draw(canvas, text, area.x as f32 + pad, y, px, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{FrameSource, StillSource};
    use newscut_project_model::{MediaClip, MediaLane, NarrationTrack, SubtitleWord};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn composition(template: TemplateId) -> Composition {
        let mut composition = Composition::new("Test");
        composition.media = MediaLane::new(vec![MediaClip::image("a", "a.png", 5.0, 0)]).unwrap();
        composition.subtitles = SubtitleTrack::new(vec![
            SubtitleWord::new("Storm", 1.0, 1.5),
            SubtitleWord::new("warning", 1.5, 2.0),
        ])
        .unwrap();
        composition.overlay = OverlaySettings::default()
            .with_template(template)
            .with_headline("Storm warning");
        composition
    }

    fn library(compositor: &FrameCompositor, colors: &[Rgba<u8>]) -> MediaLibrary {
        let slot = compositor.layout().media_slot;
        let sources = colors
            .iter()
            .map(|&color| {
                let image = RgbaImage::from_pixel(4, 4, color);
                Box::new(StillSource::from_image(&image, slot.w, slot.h)) as Box<dyn FrameSource>
            })
            .collect();
        MediaLibrary::from_sources(sources)
    }

    fn red_library(compositor: &FrameCompositor) -> MediaLibrary {
        library(compositor, &[RED])
    }

    async fn render(compositor: &FrameCompositor, media: &mut MediaLibrary, t: f64) -> RgbaImage {
        let mut canvas = compositor.new_canvas();
        compositor.draw_frame(t, media, &mut canvas).await.unwrap();
        canvas
    }

    #[tokio::test]
    async fn test_background_only_without_media_frame() {
        let compositor = FrameCompositor::new(&composition(TemplateId::Minimal), 90, 160, None);
        let mut media = MediaLibrary::default();
        let canvas = render(&compositor, &mut media, 0.0).await;
        assert_eq!(canvas.get_pixel(45, 40), &Rgba([16, 16, 20, 255]));
    }

    #[tokio::test]
    async fn test_media_fills_slot_below_headline_bar() {
        let compositor = FrameCompositor::new(&composition(TemplateId::Headline), 90, 160, None);
        let mut media = red_library(&compositor);
        let canvas = render(&compositor, &mut media, 0.0).await;

        let bar = compositor.layout().headline_bar.unwrap();
        assert_eq!(canvas.get_pixel(1, bar.h / 2), &Rgba([214, 40, 40, 255]));
        assert_eq!(canvas.get_pixel(45, bar.h + 30), &RED);
    }

    #[tokio::test]
    async fn test_subtitle_plate_only_while_caption_visible() {
        let mut no_watermark = composition(TemplateId::Minimal);
        no_watermark.overlay = no_watermark.overlay.with_watermark_visible(false);
        let compositor = FrameCompositor::new(&no_watermark, 90, 160, None);
        let mut media = red_library(&compositor);

        let band = compositor.layout().subtitle_band;
        let spot = (45, band.y + band.h / 2);

        let before = render(&compositor, &mut media, 0.2).await;
        assert_eq!(before.get_pixel(spot.0, spot.1), &RED);

        let during = render(&compositor, &mut media, 1.2).await;
        let plated = during.get_pixel(spot.0, spot.1);
        assert!(plated[0] < 255, "plate should darken the media under it");
    }

    #[tokio::test]
    async fn test_watermark_toggle() {
        let visible = composition(TemplateId::Minimal);
        let mut hidden = visible.clone();
        hidden.overlay = hidden.overlay.with_watermark_visible(false);

        let with_mark = FrameCompositor::new(&visible, 90, 160, None);
        let without_mark = FrameCompositor::new(&hidden, 90, 160, None);
        let (x, y) = with_mark
            .layout()
            .corner_origin(visible.overlay.watermark.corner, 1, 1);

        let a = render(&with_mark, &mut red_library(&with_mark), 0.0).await;
        let b = render(&without_mark, &mut red_library(&without_mark), 0.0).await;
        assert_eq!(b.get_pixel(x, y), &RED);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_frames_are_deterministic_and_order_independent() {
        let composition = composition(TemplateId::BreakingNews);
        let compositor = FrameCompositor::new(&composition, 90, 160, None);
        let mut media = red_library(&compositor);
        let first = render(&compositor, &mut media, 1.7).await;
        let _later = render(&compositor, &mut media, 4.0).await;
        let again = render(&compositor, &mut media, 1.7).await;
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn test_past_lane_end_holds_last_clip() {
        let compositor = FrameCompositor::new(&composition(TemplateId::Minimal), 90, 160, None);
        let mut media = red_library(&compositor);
        let canvas = render(&compositor, &mut media, 30.0).await;
        assert_eq!(canvas.get_pixel(10, 60), &RED);
    }

    #[tokio::test]
    async fn test_final_frame_on_clip_boundary_keeps_media() {
        // Narration ends exactly where the second clip would begin.
        let mut composition = composition(TemplateId::Minimal);
        composition.media = MediaLane::new(vec![
            MediaClip::image("a", "a.png", 6.0, 0),
            MediaClip::image("b", "b.png", 6.0, 1),
        ])
        .unwrap();
        composition.narration = Some(NarrationTrack {
            path: "narration.mp3".into(),
            duration_secs: 6.0,
            voice_id: None,
        });
        let compositor = FrameCompositor::new(&composition, 90, 160, None);
        let reachable = compositor.timeline().reachable_clips(6.0);
        assert_eq!(reachable, 1);
        let mut media = library(&compositor, &[RED, BLUE][..reachable]);

        let before = render(&compositor, &mut media, 5.99).await;
        let at_end = render(&compositor, &mut media, 6.0).await;
        assert_eq!(before.get_pixel(10, 60), &RED);
        assert_eq!(at_end.get_pixel(10, 60), &RED);
        assert!(compositor.active_clip(6.0).unwrap().frozen);
    }

    #[test]
    fn test_compose_without_media_frame_is_background() {
        let compositor = FrameCompositor::new(&composition(TemplateId::Minimal), 90, 160, None);
        let mut canvas = compositor.new_canvas();
        compositor.compose(0.0, None, &mut canvas);
        assert_eq!(canvas.get_pixel(45, 40), &Rgba([16, 16, 20, 255]));
    }
}
