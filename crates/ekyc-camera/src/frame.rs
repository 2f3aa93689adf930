//! Frame type and pixel conversion — YUYV/GREY to RGB, dark detection.

/// A captured RGB24 camera frame.
#[derive(Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
}

impl VideoFrame {
    /// Average pixel brightness (0.0–255.0) over all channels.
    pub fn avg_brightness(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&b| b as f32).sum::<f32>() / self.data.len() as f32
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Convert packed YUYV (4:2:2) to RGB24 using BT.601 coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; U/V are shared by
/// the pixel pair.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength { expected, actual: yuyv.len() });
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for quad in yuyv[..expected].chunks_exact(4) {
        let u = quad[1] as f32 - 128.0;
        let v = quad[3] as f32 - 128.0;
        for &y in &[quad[0], quad[2]] {
            let c = 1.164 * (y as f32 - 16.0);
            let r = (c + 1.596 * v).round().clamp(0.0, 255.0) as u8;
            let g = (c - 0.392 * u - 0.813 * v).round().clamp(0.0, 255.0) as u8;
            let b = (c + 2.017 * u).round().clamp(0.0, 255.0) as u8;
            rgb.extend_from_slice(&[r, g, b]);
        }
    }
    Ok(rgb)
}

/// Expand 8-bit grayscale to RGB24 by channel replication.
pub fn grey_to_rgb(grey: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height) as usize;
    if grey.len() < expected {
        return Err(FrameError::InvalidLength { expected, actual: grey.len() });
    }
    let mut rgb = Vec::with_capacity(expected * 3);
    for &y in &grey[..expected] {
        rgb.extend_from_slice(&[y, y, y]);
    }
    Ok(rgb)
}

/// Check if an RGB frame is dark using a per-pixel brightness bucket.
///
/// Returns true if more than `threshold_pct` of pixels average under 32.
/// Used to discard AGC warmup frames before declaring the camera ready.
pub fn is_dark_frame(rgb: &[u8], threshold_pct: f32) -> bool {
    if rgb.is_empty() {
        return true;
    }
    let dark_count = rgb
        .chunks_exact(3)
        .filter(|px| (px[0] as u16 + px[1] as u16 + px[2] as u16) / 3 < 32)
        .count();
    (dark_count as f32 / (rgb.len() / 3) as f32) > threshold_pct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_grey_pixels() {
        // Y=128, U=V=128 (no chroma) → mid gray on both pixels.
        let yuyv = vec![128, 128, 128, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb.len(), 6);
        for &ch in &rgb {
            assert!((ch as i16 - 130).abs() <= 2, "expected neutral gray, got {ch}");
        }
    }

    #[test]
    fn test_yuyv_black_and_white() {
        // Y=16 → black, Y=235 → white under BT.601.
        let yuyv = vec![16, 128, 235, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert!(rgb[..3].iter().all(|&c| c < 4), "first pixel should be black: {rgb:?}");
        assert!(rgb[3..].iter().all(|&c| c > 250), "second pixel should be white: {rgb:?}");
    }

    #[test]
    fn test_yuyv_invalid_length() {
        assert!(yuyv_to_rgb(&[1, 2], 2, 1).is_err());
    }

    #[test]
    fn test_grey_replicates_channels() {
        let rgb = grey_to_rgb(&[10, 200], 2, 1).unwrap();
        assert_eq!(rgb, vec![10, 10, 10, 200, 200, 200]);
    }

    #[test]
    fn test_dark_frame_all_black() {
        assert!(is_dark_frame(&vec![0u8; 300], 0.95));
    }

    #[test]
    fn test_dark_frame_normal() {
        assert!(!is_dark_frame(&vec![128u8; 300], 0.95));
    }

    #[test]
    fn test_dark_frame_empty() {
        assert!(is_dark_frame(&[], 0.95));
    }

    #[test]
    fn test_dark_frame_mostly_dark() {
        // 96% dark pixels → dark.
        let mut rgb = vec![5u8; 96 * 3];
        rgb.extend(vec![128u8; 4 * 3]);
        assert!(is_dark_frame(&rgb, 0.95));
        // 94% dark pixels → not dark.
        let mut rgb = vec![5u8; 94 * 3];
        rgb.extend(vec![128u8; 6 * 3]);
        assert!(!is_dark_frame(&rgb, 0.95));
    }
}
