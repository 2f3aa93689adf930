//! ekyc-tools — embeddable identity-verification capture toolkit.
//!
//! Two flows over a live camera: `get_image` crops one still of a
//! document out of the overlay content box, `get_video` records until a
//! face detector has accepted the required duration of frames. Geometry
//! and validation live in `ekyc-core`, device and codec I/O in
//! `ekyc-camera`; this crate owns configuration, the controllers, and
//! the session engine.

pub mod alert;
pub mod capture;
pub mod config;
pub mod record;
pub mod result;
pub mod session;

#[cfg(test)]
mod testutil;

pub use alert::{AlertDebouncer, AlertSink, LogAlertSink};
pub use capture::{CaptureController, CaptureState};
pub use config::{Mode, Options, ResolvedConfig, VideoMime};
pub use record::{RecordController, RecordingAccumulator, RecordingState};
pub use result::{CaptureResult, RecordResult};
pub use session::{CloseFlag, EkycTools, SessionError, SwitchFlag, TICK_MS};

// Re-export the seam types embedders implement or inspect.
pub use ekyc_camera::{FacingMode, FrameRecorder, ImageMime, VideoSource};
pub use ekyc_core::{BoundingBox, FaceEstimator, RejectReason, Verdict};
