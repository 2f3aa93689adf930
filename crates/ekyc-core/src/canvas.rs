//! Destination canvas for the scan/crop draw.

use crate::geometry::ScanFrame;

/// RGB24 canvas the scan loop draws into each tick.
///
/// The backing store is resized to the destination rectangle on every
/// draw, not just on resize — scan parameters can change tick-to-tick
/// (camera switch transitions), and exported blobs must be the cropped
/// size, never the full video size.
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGB24 pixel data, `width * height * 3` bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Draw the source rectangle of a native RGB frame into the canvas,
    /// bilinearly scaled to the destination rectangle.
    ///
    /// Returns `false` (leaving the canvas untouched) when the frame is
    /// not ready or the rectangles don't fit the buffer — the caller
    /// retries next tick, never treats this as fatal.
    pub fn draw_frame(&mut self, rgb: &[u8], native_width: u32, native_height: u32, scan: &ScanFrame) -> bool {
        let needed = native_width as usize * native_height as usize * 3;
        if needed == 0 || rgb.len() < needed {
            return false;
        }
        let src = scan.src;
        let dst = scan.dst;
        if src.width == 0
            || src.height == 0
            || dst.width == 0
            || dst.height == 0
            || src.x + src.width > native_width
            || src.y + src.height > native_height
        {
            return false;
        }

        self.width = dst.width;
        self.height = dst.height;
        self.data.clear();
        self.data.resize(dst.width as usize * dst.height as usize * 3, 0);

        let nw = native_width as usize;
        let scale_x = src.width as f32 / dst.width as f32;
        let scale_y = src.height as f32 / dst.height as f32;
        let max_x = (src.x + src.width - 1) as usize;
        let max_y = (src.y + src.height - 1) as usize;

        for dy in 0..dst.height as usize {
            let sy = src.y as f32 + (dy as f32 + 0.5) * scale_y - 0.5;
            let y0 = (sy.floor() as i64).clamp(src.y as i64, max_y as i64) as usize;
            let y1 = (y0 + 1).min(max_y);
            let fy = (sy - sy.floor()).clamp(0.0, 1.0);

            for dx in 0..dst.width as usize {
                let sx = src.x as f32 + (dx as f32 + 0.5) * scale_x - 0.5;
                let x0 = (sx.floor() as i64).clamp(src.x as i64, max_x as i64) as usize;
                let x1 = (x0 + 1).min(max_x);
                let fx = (sx - sx.floor()).clamp(0.0, 1.0);

                let out = (dy * dst.width as usize + dx) * 3;
                for c in 0..3 {
                    let tl = rgb[(y0 * nw + x0) * 3 + c] as f32;
                    let tr = rgb[(y0 * nw + x1) * 3 + c] as f32;
                    let bl = rgb[(y1 * nw + x0) * 3 + c] as f32;
                    let br = rgb[(y1 * nw + x1) * 3 + c] as f32;
                    let val = tl * (1.0 - fx) * (1.0 - fy)
                        + tr * fx * (1.0 - fy)
                        + bl * (1.0 - fx) * fy
                        + br * fx * fy;
                    self.data[out + c] = val.round().clamp(0.0, 255.0) as u8;
                }
            }
        }

        true
    }
}
