/// Image utilities for drawing boxes, panels and text on RGB frames
use crate::font::{glyph, text_size, GLYPH_ADVANCE, GLYPH_WIDTH};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_hollow_rect_mut,
    draw_line_segment_mut,
};
use imageproc::rect::Rect;

/// Fill the rectangle spanned by two corners, clipped to the image
pub fn fill_rect(img: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, color: Rgb<u8>) {
    let (left, right) = (x1.min(x2), x1.max(x2));
    let (top, bottom) = (y1.min(y2), y1.max(y2));
    if right <= left || bottom <= top {
        return;
    }

    let rect = Rect::at(left, top).of_size((right - left) as u32, (bottom - top) as u32);
    draw_filled_rect_mut(img, rect, color);
}

/// Draw a thick rectangle outline between two corners
///
/// The border grows outward from the given corners, one pixel per unit of
/// thickness.
pub fn draw_rect(
    img: &mut RgbImage,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    color: Rgb<u8>,
    thickness: i32,
) {
    let (left, right) = (x1.min(x2), x1.max(x2));
    let (top, bottom) = (y1.min(y2), y1.max(y2));
    if right <= left || bottom <= top {
        return;
    }

    // Draw thick border by drawing multiple rectangles
    for offset in 0..thickness.max(1) {
        let expanded_rect = Rect::at(left - offset, top - offset).of_size(
            (right - left + offset * 2) as u32,
            (bottom - top + offset * 2) as u32,
        );
        draw_hollow_rect_mut(img, expanded_rect, color);
    }
}

/// Draw a horizontal line of the given thickness starting at row `y`
pub fn draw_hline(img: &mut RgbImage, x1: i32, x2: i32, y: i32, color: Rgb<u8>, thickness: i32) {
    for offset in 0..thickness.max(1) {
        let row = (y + offset) as f32;
        draw_line_segment_mut(img, (x1 as f32, row), (x2 as f32, row), color);
    }
}

/// Draw a filled dot with a one pixel outline
pub fn draw_dot(
    img: &mut RgbImage,
    cx: i32,
    cy: i32,
    radius: i32,
    fill: Rgb<u8>,
    outline: Rgb<u8>,
) {
    draw_filled_circle_mut(img, (cx, cy), radius, fill);
    draw_hollow_circle_mut(img, (cx, cy), radius, outline);
}

/// Draw text on image using the 5x7 bitmap font
///
/// # Arguments
/// * `img` - The image to draw on
/// * `text` - The text to draw
/// * `x` - X coordinate (top-left)
/// * `y` - Y coordinate (top-left)
/// * `scale` - Integer magnification of the font
/// * `color` - Text color
/// * `bg_color` - Optional background color, padded by one font pixel
pub fn draw_text(
    img: &mut RgbImage,
    text: &str,
    x: i32,
    y: i32,
    scale: u32,
    color: Rgb<u8>,
    bg_color: Option<Rgb<u8>>,
) {
    let scale = scale.max(1) as i32;

    if let Some(bg) = bg_color {
        let (w, h) = text_size(text, scale as u32);
        fill_rect(
            img,
            x - scale,
            y - scale,
            x + w as i32 + scale,
            y + h as i32 + scale,
            bg,
        );
    }

    for (i, ch) in text.chars().enumerate() {
        let char_x = x + i as i32 * GLYPH_ADVANCE * scale;
        let pattern = glyph(ch);

        for (row, &bits) in pattern.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                    put_block(
                        img,
                        char_x + col * scale,
                        y + row as i32 * scale,
                        scale,
                        color,
                    );
                }
            }
        }
    }
}

/// Paint a `size` x `size` block, skipping pixels outside the image
fn put_block(img: &mut RgbImage, x: i32, y: i32, size: i32, color: Rgb<u8>) {
    for dy in 0..size {
        for dx in 0..size {
            let px = x + dx;
            let py = y + dy;
            if px >= 0 && py >= 0 && (px as u32) < img.width() && (py as u32) < img.height() {
                img.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

/// Resize image with aspect ratio preserved (letterboxing)
///
/// Returns the padded square canvas together with the scale and the
/// (x, y) offset of the resized image inside it.
pub fn resize_with_letterbox(
    img: &RgbImage,
    target_size: u32,
    pad_color: Rgb<u8>,
) -> (RgbImage, f32, (u32, u32)) {
    let mut canvas = RgbImage::from_pixel(target_size, target_size, pad_color);

    // Calculate scaling to fit within target size
    let scale =
        (target_size as f32 / img.width() as f32).min(target_size as f32 / img.height() as f32);
    let new_width = ((img.width() as f32 * scale).round() as u32).clamp(1, target_size);
    let new_height = ((img.height() as f32 * scale).round() as u32).clamp(1, target_size);

    let resized = image::imageops::resize(
        img,
        new_width,
        new_height,
        image::imageops::FilterType::Triangle,
    );

    // Calculate centering offsets
    let x_offset = (target_size - new_width) / 2;
    let y_offset = (target_size - new_height) / 2;

    image::imageops::overlay(&mut canvas, &resized, x_offset as i64, y_offset as i64);

    (canvas, scale, (x_offset, y_offset))
}
