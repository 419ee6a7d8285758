//! Color parsing and pixel blending on RGBA canvases.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;

use crate::layout::Rect;

/// Parse `#rrggbb` or `#rrggbbaa` (leading `#` optional).
pub fn parse_hex_color(value: &str) -> Option<Rgba<u8>> {
    let hex = value.trim().trim_start_matches('#');
    if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Some(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}

/// Parse a color, falling back to `fallback` with a warning.
pub fn color_or(value: &str, fallback: Rgba<u8>) -> Rgba<u8> {
    parse_hex_color(value).unwrap_or_else(|| {
        tracing::warn!(value, "Invalid color, using fallback");
        fallback
    })
}

/// Scale a color's alpha by `opacity` in [0, 1].
pub fn with_opacity(color: Rgba<u8>, opacity: f64) -> Rgba<u8> {
    let alpha = (color[3] as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
    Rgba([color[0], color[1], color[2], alpha])
}

/// Source-over blend of `src` onto an opaque destination pixel.
pub fn blend_pixel(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let alpha = u16::from(src[3]);
    if alpha == 0 {
        return;
    }
    let inv_alpha = 255 - alpha;
    for channel in 0..3 {
        let d = u16::from(dst[channel]);
        let s = u16::from(src[channel]);
        dst[channel] = ((s * alpha + d * inv_alpha + 127) / 255) as u8;
    }
    dst[3] = 255;
}

/// Fill a rectangle, blending when the color is translucent.
pub fn fill_rect(canvas: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let (width, height) = canvas.dimensions();
    let x1 = rect.x.saturating_add(rect.w).min(width);
    let y1 = rect.y.saturating_add(rect.h).min(height);
    if rect.x >= x1 || rect.y >= y1 || color[3] == 0 {
        return;
    }

    if color[3] == 255 {
        let area = imageproc::rect::Rect::at(rect.x as i32, rect.y as i32)
            .of_size(x1 - rect.x, y1 - rect.y);
        draw_filled_rect_mut(canvas, area, color);
        return;
    }

    for y in rect.y..y1 {
        for x in rect.x..x1 {
            blend_pixel(canvas.get_pixel_mut(x, y), color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!(parse_hex_color("#ff8000"), Some(Rgba([255, 128, 0, 255])));
        assert_eq!(parse_hex_color("000000b4"), Some(Rgba([0, 0, 0, 180])));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn test_blend_half_alpha() {
        let mut px = Rgba([200, 200, 200, 255]);
        blend_pixel(&mut px, Rgba([0, 0, 0, 128]));
        assert!((99..=100).contains(&px[0]));
        assert_eq!(px[3], 255);
    }

    #[test]
    fn test_fill_rect_clips_to_canvas() {
        let mut canvas = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        fill_rect(&mut canvas, Rect::new(8, 8, 5, 5), Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(9, 9)[0], 255);
        assert_eq!(canvas.get_pixel(7, 7)[0], 0);

        fill_rect(&mut canvas, Rect::new(0, 0, 2, 2), Rgba([255, 255, 255, 0]));
        assert_eq!(canvas.get_pixel(0, 0)[0], 0);
    }
}
