//! ekyc-camera — camera session and media I/O for the eKYC toolkit.
//!
//! Owns the live V4L2 stream, facing-mode discovery and switch-camera
//! logic, RGB frame conversion, the frame-recorder capability, and blob
//! encoding. The rest of the workspace only sees "a video source is
//! present and playing".

pub mod encode;
pub mod frame;
pub mod recorder;
pub mod session;

pub use encode::{encode_rgb, EncodeError, ImageMime};
pub use frame::VideoFrame;
pub use recorder::{FrameRecorder, MjpegRecorder, RecorderError};
pub use session::{
    has_both_facings, list_devices, CameraError, CameraSession, Constraints, DeviceInfo,
    FacingMode, VideoSource,
};
