//! ekyc-core — capture-region geometry and scan/crop pipeline.
//!
//! Pure logic only: overlay border sizing, native↔rendered coordinate
//! mapping, the canvas crop draw, and the face-position validation gate.
//! Camera and encoder I/O live in `ekyc-camera`.

pub mod canvas;
pub mod gate;
pub mod geometry;
pub mod types;

pub use canvas::Canvas;
pub use gate::{FaceEstimator, RejectReason, ValidationGate, Verdict};
pub use geometry::{OverlayGeometry, Rect, ScanFrame};
pub use types::BoundingBox;
