//! Terminal rendering of generated photos
//!
//! The quiz runs in a terminal, so the 16:9 PNGs coming back from the image
//! model are downscaled to the drawing area and rendered as half-block
//! characters, packing two pixel rows into every cell via foreground and
//! background colors.

use std::path::Path;

use image::imageops::FilterType;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};

/// Render the photo at `path` into a `width` x `height` cell area.
///
/// Each cell shows two vertically stacked pixels with the upper half block,
/// so the image is resampled to `width` x `2 * height` pixels first.
pub fn render_photo(path: &Path, width: u16, height: u16) -> Result<Text<'static>, image::ImageError> {
    let img = image::open(path)?
        .resize_exact(width as u32, height as u32 * 2, FilterType::Triangle)
        .to_rgb8();

    let mut lines = Vec::with_capacity(height as usize);
    for y in 0..height as u32 {
        let mut spans = Vec::with_capacity(width as usize);
        for x in 0..width as u32 {
            let top = img.get_pixel(x, y * 2);
            let bottom = img.get_pixel(x, y * 2 + 1);
            spans.push(Span::styled(
                "▀",
                Style::default()
                    .fg(Color::Rgb(top[0], top[1], top[2]))
                    .bg(Color::Rgb(bottom[0], bottom[1], bottom[2])),
            ));
        }
        lines.push(Line::from(spans));
    }
    Ok(Text::from(lines))
}

/// Fit a photo's 16:9 frame into an available cell area, accounting for the
/// roughly 2:1 cell aspect ratio of terminal fonts. Returns (width, height)
/// in cells, at least 1x1.
pub fn fit_area(avail_width: u16, avail_height: u16) -> (u16, u16) {
    // A cell is about twice as tall as it is wide, so a 16:9 frame wants
    // cells in a 32:9 ratio.
    let width_limited_h = (avail_width as u32 * 9 / 32) as u16;
    if width_limited_h <= avail_height {
        (avail_width.max(1), width_limited_h.max(1))
    } else {
        let width = (avail_height as u32 * 32 / 9).min(avail_width as u32) as u16;
        (width.max(1), avail_height.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_renders_to_the_requested_grid() {
        let mut img = image::RgbImage::new(16, 9);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([120, 80, 40]);
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        img.save(&path).unwrap();

        let text = render_photo(&path, 8, 4).unwrap();
        assert_eq!(text.lines.len(), 4);
        assert_eq!(text.lines[0].spans.len(), 8);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(render_photo(Path::new("does/not/exist.png"), 4, 2).is_err());
    }

    #[test]
    fn fit_area_preserves_the_wide_frame() {
        // Wide area: width-limited
        let (w, h) = fit_area(64, 40);
        assert_eq!((w, h), (64, 18));

        // Short area: height-limited
        let (w, h) = fit_area(200, 9);
        assert_eq!((w, h), (32, 9));

        // Degenerate areas never collapse to zero
        let (w, h) = fit_area(1, 1);
        assert!(w >= 1 && h >= 1);
    }
}
