use crate::assets::SpriteSheet;

use super::text::{glyph_rows_or_fallback, GLYPH_ADVANCE, GLYPH_WIDTH, TEXT_SCALE};

/// Clipped RGBA drawing on top of a frame buffer.
pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for pixel in self.frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let offset = self.byte_offset(x, y)?;
        let mut color = [0u8; 4];
        color.copy_from_slice(&self.frame[offset..offset + 4]);
        Some(color)
    }

    /// Fills a rectangle; colors with alpha below 255 are blended over the frame.
    pub fn fill_rect(&mut self, x: i32, y: i32, rect_width: i32, rect_height: i32, color: [u8; 4]) {
        if color[3] == 0 {
            return;
        }
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = x.saturating_add(rect_width).min(self.width as i32);
        let end_y = y.saturating_add(rect_height).min(self.height as i32);
        if end_x <= start_x || end_y <= start_y {
            return;
        }

        for py in start_y..end_y {
            for px in start_x..end_x {
                self.blend_pixel(px, py, color);
            }
        }
    }

    pub fn rect_outline(
        &mut self,
        x: i32,
        y: i32,
        rect_width: i32,
        rect_height: i32,
        color: [u8; 4],
    ) {
        if rect_width <= 1 || rect_height <= 1 {
            return;
        }
        self.fill_rect(x, y, rect_width, 1, color);
        self.fill_rect(x, y + rect_height - 1, rect_width, 1, color);
        self.fill_rect(x, y, 1, rect_height, color);
        self.fill_rect(x + rect_width - 1, y, 1, rect_height, color);
    }

    /// Copies one frame of a sheet with its top-left corner at `(x, y)`.
    /// Fully transparent source pixels are skipped. Returns false for an unknown frame.
    pub fn blit_frame(&mut self, sheet: &SpriteSheet, frame_index: u32, x: i32, y: i32) -> bool {
        let Some((src_x, src_y)) = sheet.frame_origin(frame_index) else {
            return false;
        };
        let frame_width = sheet.frame_width() as i32;
        let frame_height = sheet.frame_height() as i32;

        for dy in 0..frame_height {
            let out_y = y + dy;
            if out_y < 0 || out_y >= self.height as i32 {
                continue;
            }
            for dx in 0..frame_width {
                let out_x = x + dx;
                if out_x < 0 || out_x >= self.width as i32 {
                    continue;
                }
                let Some(color) = sheet.pixel(src_x + dx as u32, src_y + dy as u32) else {
                    continue;
                };
                if color[3] == 0 {
                    continue;
                }
                self.blend_pixel(out_x, out_y, color);
            }
        }
        true
    }

    pub fn draw_text(&mut self, mut x: i32, y: i32, text: &str, color: [u8; 4]) {
        for ch in text.chars() {
            self.draw_glyph(x, y, glyph_rows_or_fallback(ch), color);
            x += GLYPH_ADVANCE;
        }
    }

    fn draw_glyph(&mut self, x: i32, y: i32, rows: [u8; 5], color: [u8; 4]) {
        for (row_index, row_bits) in rows.iter().enumerate() {
            let glyph_y = y + row_index as i32 * TEXT_SCALE;
            for col in 0..GLYPH_WIDTH {
                if (row_bits & (1 << (GLYPH_WIDTH - 1 - col))) == 0 {
                    continue;
                }
                let glyph_x = x + col * TEXT_SCALE;
                self.fill_rect(glyph_x, glyph_y, TEXT_SCALE, TEXT_SCALE, color);
            }
        }
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        let Some(offset) = self.byte_offset(x, y) else {
            return;
        };
        let dst = &mut self.frame[offset..offset + 4];
        if color[3] == u8::MAX {
            dst.copy_from_slice(&color);
            return;
        }
        let alpha = color[3] as u32;
        let inv_alpha = 255 - alpha;
        for channel in 0..3 {
            dst[channel] = ((color[channel] as u32 * alpha + dst[channel] as u32 * inv_alpha) / 255) as u8;
        }
        dst[3] = u8::MAX;
    }

    fn byte_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let pixel_offset = (y as usize)
            .checked_mul(self.width as usize)?
            .checked_add(x as usize)?;
        let byte_offset = pixel_offset.checked_mul(4)?;
        if byte_offset.checked_add(4)? > self.frame.len() {
            return None;
        }
        Some(byte_offset)
    }
}
