//! Option bag and resolved session configuration.
//!
//! Callers hand in a fully-optional `Options` (typically deserialized
//! from JSON); `resolve` normalizes it against per-mode defaults.
//! Invalid values are silently replaced by the documented default, never
//! rejected — an embedder typo must not break the capture flow.

use ekyc_camera::{FacingMode, ImageMime};
use ekyc_core::geometry::CanvasLimits;
use serde::{Deserialize, Serialize};

/// Fallback JPEG/encoder quality.
pub const DEFAULT_QUALITY: f32 = 0.92;
/// Default shading ratio for still capture (wide content box, document-shaped).
pub const DEFAULT_CAPTURE_RATIO: f64 = 0.6;
/// Default shading ratio for recording (square content box, face-shaped).
pub const DEFAULT_RECORD_RATIO: f64 = 1.0;
/// Default recording target when `record_ms` is absent or invalid.
pub const DEFAULT_RECORD_MS: u64 = 6000;
pub const DEFAULT_CANVAS_MIN_WIDTH: u32 = 480;
pub const DEFAULT_CANVAS_MAX_WIDTH: u32 = 1280;
pub const DEFAULT_VIDEO_BITS_PER_SECOND: u32 = 2_500_000;

/// Which flow a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Capture,
    Record,
}

/// Supported video container outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoMime {
    Webm,
    Mp4,
}

impl VideoMime {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "video/webm" => Some(Self::Webm),
            "video/mp4" => Some(Self::Mp4),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Webm => "video/webm",
            Self::Mp4 => "video/mp4",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
        }
    }
}

/// Caller-supplied options. Every field is optional; see `resolve` for
/// the per-mode defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Legacy alias for `shading_ratio`; the newer name wins when both
    /// are present.
    pub aspect_ratio: Option<f64>,
    /// Width/height ratio of the overlay content box. Zero or negative
    /// disables the overlay entirely.
    pub shading_ratio: Option<f64>,
    /// "user" (front) or "environment" (back).
    pub facing_mode: Option<String>,
    pub enable_switch_camera: Option<bool>,
    /// Accepted for embedder compatibility; has no effect in this build.
    pub enable_file_picker: Option<bool>,
    pub enable_validation: Option<bool>,
    pub enable_alert: Option<bool>,
    /// Output mime: image/* for capture, video/* for record.
    pub mime_type: Option<String>,
    /// Encoder quality in [0, 1].
    pub quality: Option<f64>,
    /// Required valid-face duration in milliseconds. Must be >= 1000 and
    /// a multiple of 100.
    pub record_ms: Option<u64>,
    /// Target bitrate for rate-controlled `FrameRecorder` implementations.
    /// The default MJPEG recorder is quality-driven and ignores it.
    pub video_bits_per_second: Option<u32>,
    /// Caps canvas height at `width * ratio`; excess is trimmed centered.
    pub max_canvas_ratio: Option<f64>,
    pub canvas_min_width: Option<u32>,
    pub canvas_max_width: Option<u32>,
}

/// Fully-normalized configuration a session runs with.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub mode: Mode,
    /// 0.0 means the overlay is disabled and scans use the full viewport.
    pub shading_ratio: f64,
    pub facing_mode: FacingMode,
    pub enable_switch_camera: bool,
    pub enable_file_picker: bool,
    pub enable_validation: bool,
    pub enable_alert: bool,
    pub image_mime: ImageMime,
    pub video_mime: VideoMime,
    pub quality: f32,
    pub record_ms: u64,
    /// Advisory for rate-controlled recorders; the MJPEG default ignores it.
    pub video_bits_per_second: u32,
    pub max_canvas_ratio: Option<f64>,
    pub canvas_limits: CanvasLimits,
}

impl Options {
    /// Normalize into a `ResolvedConfig` for the given mode.
    ///
    /// Never errors: every out-of-range or unparseable value falls back
    /// to the mode's default, with a debug log so misconfiguration is at
    /// least visible.
    pub fn resolve(&self, mode: Mode) -> ResolvedConfig {
        let shading_ratio = match self.shading_ratio.or(self.aspect_ratio) {
            // Explicit non-positive ratio is a request to disable the overlay.
            Some(r) if r <= 0.0 => 0.0,
            Some(r) => r,
            None => match mode {
                Mode::Capture => DEFAULT_CAPTURE_RATIO,
                Mode::Record => DEFAULT_RECORD_RATIO,
            },
        };

        let facing_mode = match self.facing_mode.as_deref() {
            Some("user") => FacingMode::User,
            Some("environment") => FacingMode::Environment,
            Some(other) => {
                tracing::debug!(facing_mode = other, "unknown facing mode, using default");
                default_facing(mode)
            }
            None => default_facing(mode),
        };

        let quality = match self.quality {
            Some(q) if (0.0..=1.0).contains(&q) => q as f32,
            Some(q) => {
                tracing::debug!(quality = q, "quality out of [0, 1], using default");
                DEFAULT_QUALITY
            }
            None => DEFAULT_QUALITY,
        };

        let image_mime = self
            .mime_type
            .as_deref()
            .and_then(ImageMime::from_mime)
            .unwrap_or(ImageMime::Png);
        let video_mime = self
            .mime_type
            .as_deref()
            .and_then(VideoMime::from_mime)
            .unwrap_or(VideoMime::Webm);

        let record_ms = match self.record_ms {
            Some(ms) if ms >= 1000 && ms % 100 == 0 => ms,
            Some(ms) => {
                tracing::debug!(record_ms = ms, "invalid record duration, using default");
                DEFAULT_RECORD_MS
            }
            None => DEFAULT_RECORD_MS,
        };

        let mut min_width = self.canvas_min_width.unwrap_or(DEFAULT_CANVAS_MIN_WIDTH);
        let mut max_width = self.canvas_max_width.unwrap_or(DEFAULT_CANVAS_MAX_WIDTH);
        if min_width > max_width {
            std::mem::swap(&mut min_width, &mut max_width);
        }

        let max_canvas_ratio = self.max_canvas_ratio.filter(|r| *r > 0.0);

        ResolvedConfig {
            mode,
            shading_ratio,
            facing_mode,
            enable_switch_camera: self.enable_switch_camera.unwrap_or(true),
            enable_file_picker: self.enable_file_picker.unwrap_or(false),
            enable_validation: self
                .enable_validation
                .unwrap_or(mode == Mode::Record),
            enable_alert: self.enable_alert.unwrap_or(true),
            image_mime,
            video_mime,
            quality,
            record_ms,
            video_bits_per_second: self
                .video_bits_per_second
                .unwrap_or(DEFAULT_VIDEO_BITS_PER_SECOND),
            max_canvas_ratio,
            canvas_limits: CanvasLimits { min_width, max_width },
        }
    }
}

fn default_facing(mode: Mode) -> FacingMode {
    match mode {
        // Documents are shot with the back camera, faces with the front.
        Mode::Capture => FacingMode::Environment,
        Mode::Record => FacingMode::User,
    }
}
