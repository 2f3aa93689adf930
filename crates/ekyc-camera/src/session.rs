//! V4L2 camera session — device discovery, facing modes, stream ownership.

use crate::frame::{self, VideoFrame};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::framesize::FrameSizeEnum;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// Warmup frames discarded unconditionally after opening a stream
/// (camera AGC/AE stabilization) before the dark-frame check may pass.
const WARMUP_FRAMES: usize = 4;
/// Upper bound on warmup grabs while waiting for a non-dark frame.
const WARMUP_MAX_GRABS: usize = 30;
const DARK_THRESHOLD_PCT: f32 = 0.95;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("no camera found for facing mode {0:?}")]
    NoDevice(FacingMode),
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("session is stopped")]
    Stopped,
}

/// Which way the camera points, mirroring the browser facing-mode names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front / selfie camera.
    User,
    /// Rear / document camera.
    Environment,
}

impl FacingMode {
    pub fn flipped(&self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }
}

/// Info about a discovered capture device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    /// Facing mode inferred from the device name; `None` when the name
    /// gives no hint.
    pub facing: Option<FacingMode>,
    /// Largest supported YUYV frame size, when the driver reports one.
    pub max_resolution: Option<(u32, u32)>,
}

/// Stream acquisition constraints: "given constraints, return a live
/// video stream".
#[derive(Debug, Clone)]
pub struct Constraints {
    pub facing_mode: FacingMode,
    /// Upper bound on the negotiated resolution.
    pub max_width: u32,
    pub max_height: u32,
    /// Explicit device override; skips facing-mode selection.
    pub device_path: Option<String>,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            max_width: 1280,
            max_height: 720,
            device_path: None,
        }
    }
}

/// What the controllers see: a video element that is present and playing.
pub trait VideoSource: Send {
    /// True once warmup is done and frames are flowing.
    fn is_ready(&self) -> bool;
    /// Native pixel-buffer size (videoWidth/videoHeight).
    fn native_size(&self) -> (u32, u32);
    /// Grab the current frame as RGB24.
    fn grab(&mut self) -> Result<VideoFrame, CameraError>;
    /// Tear down the current stream and acquire the opposite-facing
    /// camera. On failure the source keeps (or restores) its current
    /// stream state; see the implementation.
    fn switch_camera(&mut self) -> Result<(), CameraError>;
    /// Stop all tracks. Idempotent; `grab` fails afterwards.
    fn stop(&mut self);
    fn is_stopped(&self) -> bool;
}

/// Negotiated pixel format for the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel).
    Yuyv,
    /// 8-bit grayscale (IR document cameras).
    Grey,
}

/// Live camera session. Owns exactly one stream at a time; switching
/// cameras tears down the current device before opening the next.
pub struct CameraSession {
    device: Option<Device>,
    device_path: String,
    facing: FacingMode,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    constraints: Constraints,
    ready: bool,
}

impl CameraSession {
    /// Open a session for the given constraints.
    ///
    /// Picks a device by facing mode (falling back to the first capture
    /// device when no name matches), negotiates YUYV or GREY at the best
    /// supported resolution within the caps, and discards warmup frames
    /// before reporting ready.
    pub fn open(constraints: Constraints) -> Result<Self, CameraError> {
        let path = match &constraints.device_path {
            Some(path) => path.clone(),
            None => pick_device(constraints.facing_mode)?,
        };
        let mut session = Self::open_path(&path, constraints)?;
        session.warm_up();
        Ok(session)
    }

    fn open_path(device_path: &str, constraints: Constraints) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CameraError::DeviceBusy
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device
            .query_caps()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to query capabilities: {e}")))?;
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::CaptureFailed(format!(
                "{device_path} does not support video capture"
            )));
        }

        tracing::info!(device = device_path, card = %caps.card, "opening camera");

        // Negotiate YUYV at the best supported size within the caps;
        // accept GREY when the driver insists (IR cameras).
        let (want_w, want_h) = best_resolution(&device, constraints.max_width, constraints.max_height);

        let mut fmt = device
            .format()
            .map_err(|e| CameraError::FormatNegotiationFailed(format!("failed to get format: {e}")))?;
        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = want_w;
        fmt.height = want_h;

        let negotiated = device
            .set_format(&fmt)
            .map_err(|e| CameraError::FormatNegotiationFailed(format!("failed to set format: {e}")))?;

        let pixel_format = if negotiated.fourcc == FourCC::new(b"YUYV") {
            PixelFormat::Yuyv
        } else if negotiated.fourcc == FourCC::new(b"GREY") {
            PixelFormat::Grey
        } else {
            return Err(CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {:?} (need YUYV or GREY)",
                negotiated.fourcc
            )));
        };

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?negotiated.fourcc,
            "negotiated format"
        );

        Ok(Self {
            device: Some(device),
            device_path: device_path.to_string(),
            facing: constraints.facing_mode,
            width: negotiated.width,
            height: negotiated.height,
            pixel_format,
            constraints,
            ready: false,
        })
    }

    /// Grab frames until the first non-dark one arrives, then mark ready.
    ///
    /// Bounded: a camera that stays dark through [`WARMUP_MAX_GRABS`]
    /// (covered lens, broken AGC) becomes ready anyway with a warning,
    /// leaving frame rejection to the validation gate instead of wedging
    /// the open call.
    fn warm_up(&mut self) {
        for grabs in 1..=WARMUP_MAX_GRABS {
            match self.grab_raw() {
                Ok(frame) => {
                    if warmup_complete(grabs, &frame) {
                        if frame::is_dark_frame(&frame.data, DARK_THRESHOLD_PCT) {
                            tracing::warn!(grabs, "camera stayed dark through warmup");
                        } else {
                            tracing::debug!(grabs, "camera warmed up");
                        }
                        self.ready = true;
                        return;
                    }
                }
                Err(err) => {
                    tracing::debug!(error = %err, grabs, "warmup grab failed");
                }
            }
        }
        tracing::warn!("no usable frame during warmup, reporting ready anyway");
        self.ready = true;
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    /// Tear down the current stream and open the opposite-facing camera.
    /// The old stream is fully released before the new one is acquired —
    /// never two live streams.
    pub fn switch_camera(&mut self) -> Result<(), CameraError> {
        let target = self.facing.flipped();
        tracing::info!(from = ?self.facing, to = ?target, "switching camera");

        self.device = None;
        self.ready = false;

        let mut constraints = self.constraints.clone();
        constraints.facing_mode = target;
        constraints.device_path = None;

        let replacement = Self::open_path(&pick_device(target)?, constraints)?;
        *self = replacement;
        self.warm_up();
        Ok(())
    }

    fn grab_raw(&mut self) -> Result<VideoFrame, CameraError> {
        let device = self.device.as_ref().ok_or(CameraError::Stopped)?;

        let mut stream = MmapStream::with_buffers(device, BufType::VideoCapture, 4)
            .map_err(|e| CameraError::CaptureFailed(format!("failed to create mmap stream: {e}")))?;

        let (buf, meta) = stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;

        let rgb = match self.pixel_format {
            PixelFormat::Yuyv => frame::yuyv_to_rgb(buf, self.width, self.height),
            PixelFormat::Grey => frame::grey_to_rgb(buf, self.width, self.height),
        }
        .map_err(|e| CameraError::CaptureFailed(format!("pixel conversion failed: {e}")))?;

        Ok(VideoFrame {
            data: rgb,
            width: self.width,
            height: self.height,
            timestamp: std::time::Instant::now(),
            sequence: meta.sequence,
        })
    }
}

impl VideoSource for CameraSession {
    fn is_ready(&self) -> bool {
        self.ready && self.device.is_some()
    }

    fn native_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn grab(&mut self) -> Result<VideoFrame, CameraError> {
        let frame = self.grab_raw()?;
        if frame::is_dark_frame(&frame.data, DARK_THRESHOLD_PCT) {
            tracing::debug!(seq = frame.sequence, "dark frame");
        }
        Ok(frame)
    }

    fn switch_camera(&mut self) -> Result<(), CameraError> {
        CameraSession::switch_camera(self)
    }

    fn stop(&mut self) {
        if self.device.take().is_some() {
            tracing::info!(device = %self.device_path, "camera stream stopped");
        }
        self.ready = false;
    }

    fn is_stopped(&self) -> bool {
        self.device.is_none()
    }
}

/// List available capture devices with facing heuristics.
pub fn list_devices() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for i in 0..16 {
        let path = format!("/dev/video{i}");
        if !Path::new(&path).exists() {
            continue;
        }
        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            continue;
        }
        let max_resolution = {
            let (w, h) = best_resolution(&dev, u32::MAX, u32::MAX);
            if w > 0 { Some((w, h)) } else { None }
        };
        devices.push(DeviceInfo {
            facing: infer_facing(&caps.card),
            path,
            name: caps.card.clone(),
            driver: caps.driver.clone(),
            max_resolution,
        });
    }

    devices
}

/// Whether both a front- and a rear-facing camera are present (drives
/// the switch-camera affordance).
pub fn has_both_facings() -> bool {
    let devices = list_devices();
    let front = devices.iter().any(|d| d.facing == Some(FacingMode::User));
    let rear = devices.iter().any(|d| d.facing == Some(FacingMode::Environment));
    front && rear
}

/// Infer facing mode from a device name. Matches the label heuristics
/// users see in browser device lists (front/selfie vs back/rear).
fn infer_facing(name: &str) -> Option<FacingMode> {
    let lower = name.to_lowercase();
    if lower.contains("front") || lower.contains("selfie") || lower.contains("user") {
        Some(FacingMode::User)
    } else if lower.contains("back") || lower.contains("rear") {
        Some(FacingMode::Environment)
    } else {
        None
    }
}

fn pick_device(facing: FacingMode) -> Result<String, CameraError> {
    let devices = list_devices();
    if let Some(dev) = devices.iter().find(|d| d.facing == Some(facing)) {
        return Ok(dev.path.clone());
    }
    // No name matched the facing hint — any capture device beats none.
    devices
        .first()
        .map(|d| d.path.clone())
        .ok_or(CameraError::NoDevice(facing))
}

/// Warmup ready check: the AGC discards must be over, and the frame
/// must be non-dark — unless the grab cap is reached, which forces
/// readiness regardless.
fn warmup_complete(grabs: usize, frame: &VideoFrame) -> bool {
    if grabs < WARMUP_FRAMES {
        return false;
    }
    grabs >= WARMUP_MAX_GRABS || !frame::is_dark_frame(&frame.data, DARK_THRESHOLD_PCT)
}

/// Best supported YUYV frame size within the caps, falling back to
/// 640x480 when the driver enumerates nothing useful.
fn best_resolution(device: &Device, max_width: u32, max_height: u32) -> (u32, u32) {
    let mut best = (0u32, 0u32);
    let area = |w: u32, h: u32| w as u64 * h as u64;

    if let Ok(sizes) = device.enum_framesizes(FourCC::new(b"YUYV")) {
        for fs in sizes {
            match fs.size {
                FrameSizeEnum::Discrete(d) => {
                    if d.width <= max_width
                        && d.height <= max_height
                        && area(d.width, d.height) > area(best.0, best.1)
                    {
                        best = (d.width, d.height);
                    }
                }
                FrameSizeEnum::Stepwise(s) => {
                    let w = s.max_width.min(max_width);
                    let h = s.max_height.min(max_height);
                    if area(w, h) > area(best.0, best.1) {
                        best = (w, h);
                    }
                }
            }
        }
    }

    if best.0 == 0 {
        best = (640.min(max_width), 480.min(max_height));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_facing_from_names() {
        assert_eq!(infer_facing("Integrated Front Camera"), Some(FacingMode::User));
        assert_eq!(infer_facing("Selfie cam"), Some(FacingMode::User));
        assert_eq!(infer_facing("Rear camera"), Some(FacingMode::Environment));
        assert_eq!(infer_facing("USB2.0 Back Camera"), Some(FacingMode::Environment));
        assert_eq!(infer_facing("Generic UVC Webcam"), None);
    }

    #[test]
    fn test_facing_flip() {
        assert_eq!(FacingMode::User.flipped(), FacingMode::Environment);
        assert_eq!(FacingMode::Environment.flipped(), FacingMode::User);
    }

    #[test]
    fn test_default_constraints() {
        let c = Constraints::default();
        assert_eq!(c.facing_mode, FacingMode::Environment);
        assert_eq!((c.max_width, c.max_height), (1280, 720));
        assert!(c.device_path.is_none());
    }

    fn frame_of(value: u8) -> VideoFrame {
        VideoFrame {
            data: vec![value; 16 * 16 * 3],
            width: 16,
            height: 16,
            timestamp: std::time::Instant::now(),
            sequence: 0,
        }
    }

    #[test]
    fn test_warmup_waits_for_first_non_dark_frame() {
        let dark = frame_of(4);
        let bright = frame_of(120);
        // AGC discards first, even for bright frames.
        for grabs in 1..WARMUP_FRAMES {
            assert!(!warmup_complete(grabs, &bright));
        }
        assert!(warmup_complete(WARMUP_FRAMES, &bright));
        // Dark frames keep the session not-ready past the discards.
        assert!(!warmup_complete(WARMUP_FRAMES, &dark));
        assert!(!warmup_complete(WARMUP_MAX_GRABS - 1, &dark));
    }

    #[test]
    fn test_warmup_cap_forces_ready_on_dark_camera() {
        let dark = frame_of(4);
        assert!(warmup_complete(WARMUP_MAX_GRABS, &dark));
    }
}
