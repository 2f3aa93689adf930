//! Overlay border sizing and native↔rendered scan-rectangle mapping.
//!
//! All functions here are total and deterministic: pathological inputs
//! degrade to a near-zero content box instead of failing.

/// Minimum border on either axis, in rendered pixels. Guarantees the
/// corner-bracket decorations always have room without overlapping the
/// content box.
pub const MIN_BORDER_PX: f64 = 5.0;

/// Initial horizontal border per rendered-width breakpoint.
const BORDER_NARROW_PX: f64 = 16.0; // width < 576
const BORDER_MEDIUM_PX: f64 = 32.0; // width < 768
const BORDER_WIDE_PX: f64 = 48.0;

/// Overlay border sizes in rendered pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Borders {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned pixel rectangle (origin + size).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One tick's crop mapping: a source rectangle in video-native pixels and
/// a destination rectangle in canvas pixels. All four width/height values
/// are even — some video encoders refuse odd-dimension input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanFrame {
    pub src: Rect,
    pub dst: Rect,
}

/// Bounds on the destination canvas width, in pixels.
#[derive(Debug, Clone, Copy)]
pub struct CanvasLimits {
    pub min_width: u32,
    pub max_width: u32,
}

/// The guide overlay sized against a rendered video box.
///
/// Recomputed whenever the rendered size changes (resize, orientation
/// flip, camera switch) — cheap enough to recompute every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayGeometry {
    pub border_x: f64,
    pub border_y: f64,
    /// Full overlay width/height == rendered video width/height.
    pub width: f64,
    pub height: f64,
    /// Target content-box ratio (height / width).
    pub ratio: f64,
}

impl OverlayGeometry {
    /// Size the overlay for a rendered video box. Returns `None` when the
    /// ratio is disabled (≤ 0) or the box is degenerate — callers must then
    /// treat the session as "no overlay, no crop".
    pub fn compute(client_width: u32, client_height: u32, ratio: f64) -> Option<Self> {
        if ratio <= 0.0 || client_width == 0 || client_height == 0 {
            return None;
        }
        let width = client_width as f64;
        let height = client_height as f64;
        let borders = compute_overlay_borders(width, height, ratio);
        Some(Self {
            border_x: borders.x,
            border_y: borders.y,
            width,
            height,
            ratio,
        })
    }

    /// Content-box width in rendered pixels (overlay minus side borders).
    pub fn content_width(&self) -> f64 {
        (self.width - 2.0 * self.border_x).max(0.0)
    }

    /// Content-box height in rendered pixels.
    pub fn content_height(&self) -> f64 {
        (self.height - 2.0 * self.border_y).max(0.0)
    }
}

/// Compute overlay border sizes for a rendered video box and target ratio.
///
/// Picks a content width from the breakpoint border, derives the height
/// from the ratio, and shrinks to the limiting dimension when the derived
/// height overflows. Either border falling under [`MIN_BORDER_PX`] clamps
/// to the minimum and recomputes the opposite axis from the now-smaller
/// content box.
pub fn compute_overlay_borders(video_width: f64, video_height: f64, target_ratio: f64) -> Borders {
    let mut border_x = if video_width < 576.0 {
        BORDER_NARROW_PX
    } else if video_width < 768.0 {
        BORDER_MEDIUM_PX
    } else {
        BORDER_WIDE_PX
    };

    let mut width = video_width - 2.0 * border_x;
    let mut height = width * target_ratio;
    if height > video_height {
        height = video_height;
        width = height / target_ratio;
        border_x = (video_width - width) / 2.0;
    }
    let mut border_y = (video_height - height) / 2.0;

    if border_x < MIN_BORDER_PX {
        border_x = MIN_BORDER_PX;
        width = video_width - border_x * 2.0;
        border_y = (video_height - width * target_ratio) / 2.0;
    }
    if border_y < MIN_BORDER_PX {
        border_y = MIN_BORDER_PX;
        height = video_height - border_y * 2.0;
        border_x = (video_width - height / target_ratio) / 2.0;
    }

    // Pathological windows (tiny box, extreme ratio) can still push a
    // border negative after the opposite-axis recompute; the content box
    // degenerates instead of the border.
    Borders {
        x: border_x.max(MIN_BORDER_PX),
        y: border_y.max(MIN_BORDER_PX),
    }
}

/// Force a dimension even by decrementing odd values.
fn force_even(value: u32) -> u32 {
    value & !1
}

/// Map the overlay's content box into video-native pixels and derive the
/// destination canvas rectangle.
///
/// `overlay == None` scans the full frame (overlay disabled). When the
/// rendered video is taller than the overlay box (orientation transitions),
/// the source y-origin gets a centering offset so the crop stays visually
/// centered. `max_canvas_ratio` caps the destination height/width ratio,
/// trimming the source vertically (centered) to match, which bounds
/// recorded resolution independent of overlay shape.
///
/// Returns `None` only for degenerate inputs (a zero native or rendered
/// dimension); callers treat that as "not ready, retry next tick".
pub fn compute_scan_rects(
    native_width: u32,
    native_height: u32,
    client_width: u32,
    client_height: u32,
    overlay: Option<&OverlayGeometry>,
    limits: CanvasLimits,
    max_canvas_ratio: Option<f64>,
) -> Option<ScanFrame> {
    if native_width == 0 || native_height == 0 || client_width == 0 || client_height == 0 {
        return None;
    }

    let width_ratio = native_width as f64 / client_width as f64;
    let height_ratio = native_height as f64 / client_height as f64;

    let (region_width, region_height, border_x, border_y) = match overlay {
        Some(ov) => {
            // Vertical centering when the video overflows the capture area.
            let offset_y = if client_height as f64 > ov.height {
                (client_height as f64 - ov.height) / 2.0
            } else {
                0.0
            };
            (ov.content_width(), ov.content_height(), ov.border_x, ov.border_y + offset_y)
        }
        None => (client_width as f64, client_height as f64, 0.0, 0.0),
    };

    let sx = (border_x * width_ratio).round() as u32;
    let mut sy = (border_y * height_ratio).round() as u32;
    let mut sw = force_even((region_width * width_ratio).round() as u32);
    let mut sh = force_even((region_height * height_ratio).round() as u32);

    // Clamp into the native frame.
    let sx = sx.min(native_width.saturating_sub(2));
    sy = sy.min(native_height.saturating_sub(2));
    sw = force_even(sw.min(native_width - sx));
    sh = force_even(sh.min(native_height - sy));
    if sw == 0 || sh == 0 {
        return None;
    }

    // Destination starts 1:1 with the rendered content box, clamped into
    // the configured width bounds while preserving the source aspect.
    let mut dw = (region_width.round() as u32).clamp(limits.min_width.max(2), limits.max_width.max(2));
    let mut dh = ((dw as f64) * (sh as f64) / (sw as f64)).round() as u32;

    if let Some(cap) = max_canvas_ratio {
        if cap > 0.0 && (dh as f64) > (dw as f64) * cap {
            let capped = (dw as f64) * cap;
            // Trim the source vertically (centered) so the capped canvas
            // is a crop, not a squeeze.
            let new_sh = force_even(((sh as f64) * capped / (dh as f64)).round() as u32).max(2);
            sy += (sh - new_sh) / 2;
            sh = new_sh;
            dh = capped.round() as u32;
        }
    }

    dw = force_even(dw).max(2);
    dh = force_even(dh).max(2);

    Some(ScanFrame {
        src: Rect { x: sx, y: sy, width: sw, height: sh },
        dst: Rect { x: 0, y: 0, width: dw, height: dh },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_LIMITS: CanvasLimits = CanvasLimits { min_width: 2, max_width: 4096 };

    fn content_ratio(video_w: f64, video_h: f64, b: Borders) -> f64 {
        (video_h - 2.0 * b.y) / (video_w - 2.0 * b.x)
    }

    #[test]
    fn test_borders_preserve_ratio_landscape() {
        let b = compute_overlay_borders(640.0, 360.0, 0.5);
        assert!(b.x >= MIN_BORDER_PX && b.y >= MIN_BORDER_PX);
        assert!((content_ratio(640.0, 360.0, b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_borders_shrink_to_height_limit() {
        // 608x340 content at ratio 1.0 would need 608px of height; the
        // height-limited branch must recompute width from height.
        let b = compute_overlay_borders(640.0, 360.0, 1.0);
        assert!(b.x >= MIN_BORDER_PX && b.y >= MIN_BORDER_PX);
        assert!((content_ratio(640.0, 360.0, b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_borders_grid_invariant() {
        // Property 1: borders ≥ minimum, and the ratio holds except in the
        // documented min-border clamp case.
        for &(w, h) in &[(320.0, 240.0), (640.0, 360.0), (800.0, 600.0), (1280.0, 720.0), (360.0, 640.0)] {
            for &ratio in &[0.3, 0.5, 0.6, 1.0, 1.5, 2.0] {
                let b = compute_overlay_borders(w, h, ratio);
                assert!(b.x >= MIN_BORDER_PX, "borderX {} < min for {w}x{h}@{ratio}", b.x);
                assert!(b.y >= MIN_BORDER_PX, "borderY {} < min for {w}x{h}@{ratio}", b.y);
                let clamped = b.x == MIN_BORDER_PX || b.y == MIN_BORDER_PX;
                if !clamped {
                    let got = content_ratio(w, h, b);
                    assert!((got - ratio).abs() < 1e-6, "ratio {got} != {ratio} for {w}x{h}");
                }
            }
        }
    }

    #[test]
    fn test_borders_pathological_input_stays_finite() {
        let b = compute_overlay_borders(12.0, 8.0, 10.0);
        assert!(b.x >= MIN_BORDER_PX && b.y >= MIN_BORDER_PX);
        assert!(b.x.is_finite() && b.y.is_finite());
    }

    #[test]
    fn test_overlay_disabled_for_zero_ratio() {
        assert!(OverlayGeometry::compute(640, 360, 0.0).is_none());
        assert!(OverlayGeometry::compute(640, 360, -1.0).is_none());
        assert!(OverlayGeometry::compute(0, 360, 1.0).is_none());
    }

    #[test]
    fn test_scan_rects_even_dimensions() {
        // Property 2: all width/height values even, across a grid.
        for &(nw, nh) in &[(1280u32, 720u32), (1279, 719), (640, 480), (1921, 1081)] {
            for &(cw, ch) in &[(640u32, 360u32), (639, 361), (333, 777)] {
                let overlay = OverlayGeometry::compute(cw, ch, 0.6);
                let frame =
                    compute_scan_rects(nw, nh, cw, ch, overlay.as_ref(), NO_LIMITS, None).unwrap();
                assert_eq!(frame.src.width % 2, 0);
                assert_eq!(frame.src.height % 2, 0);
                assert_eq!(frame.dst.width % 2, 0);
                assert_eq!(frame.dst.height % 2, 0);
            }
        }
    }

    #[test]
    fn test_scan_rects_maps_into_native_pixels() {
        // 1280x720 native rendered at 640x360 — a 2x ratio per axis.
        let overlay = OverlayGeometry::compute(640, 360, 0.5).unwrap();
        let frame =
            compute_scan_rects(1280, 720, 640, 360, Some(&overlay), NO_LIMITS, None).unwrap();
        assert_eq!(frame.src.x, (overlay.border_x * 2.0).round() as u32);
        assert!(frame.src.x + frame.src.width <= 1280);
        assert!(frame.src.y + frame.src.height <= 720);
        // Source is twice the content box (within even-rounding).
        let expected_sw = force_even((overlay.content_width() * 2.0).round() as u32);
        assert_eq!(frame.src.width, expected_sw);
    }

    #[test]
    fn test_scan_rects_full_frame_without_overlay() {
        let frame = compute_scan_rects(1280, 720, 640, 360, None, NO_LIMITS, None).unwrap();
        assert_eq!(frame.src.x, 0);
        assert_eq!(frame.src.y, 0);
        assert_eq!(frame.src.width, 1280);
        assert_eq!(frame.src.height, 720);
    }

    #[test]
    fn test_scan_rects_canvas_width_clamp() {
        let overlay = OverlayGeometry::compute(640, 360, 0.5).unwrap();
        let limits = CanvasLimits { min_width: 2, max_width: 320 };
        let frame =
            compute_scan_rects(1280, 720, 640, 360, Some(&overlay), limits, None).unwrap();
        assert!(frame.dst.width <= 320);
        // Aspect preserved between source and destination.
        let src_ratio = frame.src.height as f64 / frame.src.width as f64;
        let dst_ratio = frame.dst.height as f64 / frame.dst.width as f64;
        assert!((src_ratio - dst_ratio).abs() < 0.02);
    }

    #[test]
    fn test_scan_rects_max_canvas_ratio_caps_height() {
        // A tall portrait overlay capped at a square canvas.
        let overlay = OverlayGeometry::compute(360, 640, 1.5).unwrap();
        let frame = compute_scan_rects(720, 1280, 360, 640, Some(&overlay), NO_LIMITS, Some(1.0))
            .unwrap();
        assert!(frame.dst.height as f64 <= frame.dst.width as f64 * 1.0 + 2.0);
        assert_eq!(frame.src.height % 2, 0);
    }

    #[test]
    fn test_scan_rects_vertical_centering_offset() {
        // Rendered video taller than the overlay box: source y-origin gets
        // half the overflow added before the border offset.
        let mut overlay = OverlayGeometry::compute(640, 360, 0.5).unwrap();
        overlay.height = 300.0;
        overlay.border_y = compute_overlay_borders(640.0, 300.0, 0.5).y;
        let frame =
            compute_scan_rects(1280, 720, 640, 360, Some(&overlay), NO_LIMITS, None).unwrap();
        let expected_sy = ((overlay.border_y + 30.0) * 2.0).round() as u32;
        assert_eq!(frame.src.y, expected_sy);
    }

    #[test]
    fn test_scan_rects_degenerate_inputs() {
        assert!(compute_scan_rects(0, 720, 640, 360, None, NO_LIMITS, None).is_none());
        assert!(compute_scan_rects(1280, 720, 0, 360, None, NO_LIMITS, None).is_none());
    }
}
