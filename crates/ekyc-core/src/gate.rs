//! Face-position validation gate.
//!
//! Wraps an injected face-estimator capability and scores the detected
//! face against positional/size thresholds relative to the scanned
//! canvas. Emits one verdict per tick; rejection is normal control flow
//! for the record loop, never an error.

use crate::canvas::Canvas;
use crate::types::BoundingBox;
use serde::Serialize;
use thiserror::Error;

// --- Gate thresholds, as fractions of the scanned canvas width ---
// Load-bearing tuning constants: change values here, never control flow.

/// Faces narrower than this fraction of the canvas are too far away.
pub const MIN_FACE_WIDTH_RATIO: f32 = 0.30;
/// Faces wider than this fraction of the canvas are too close.
pub const MAX_FACE_WIDTH_RATIO: f32 = 0.60;
/// The nose tip must sit inside this central band, both axes.
pub const CENTER_BAND_MIN_RATIO: f32 = 0.35;
pub const CENTER_BAND_MAX_RATIO: f32 = 0.65;

#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("face estimation failed: {0}")]
    Failed(String),
    #[error("estimator not loaded")]
    NotLoaded,
}

/// Injected face-detection capability: given a scanned RGB frame, return
/// zero or more face bounding boxes. The model behind it is a black box.
pub trait FaceEstimator: Send {
    fn estimate_faces(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<BoundingBox>, EstimatorError>;
}

/// Why a frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    NoFace,
    MultipleFaces,
    TooFar,
    TooClose,
    OffCenter,
}

impl RejectReason {
    /// Advisory banner copy shown to the user.
    pub fn advisory(&self) -> &'static str {
        match self {
            RejectReason::NoFace => "No face detected — look at the camera",
            RejectReason::MultipleFaces => "Multiple faces detected — only you in frame, please",
            RejectReason::TooFar => "Move closer to the camera",
            RejectReason::TooClose => "Move back from the camera",
            RejectReason::OffCenter => "Center your face in the frame",
        }
    }
}

/// Per-tick gate output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

impl Verdict {
    pub fn accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Verdict::Accepted => None,
            Verdict::Rejected(reason) => Some(*reason),
        }
    }
}

/// Validation gate over an injected estimator.
pub struct ValidationGate {
    estimator: Box<dyn FaceEstimator>,
}

impl ValidationGate {
    pub fn new(estimator: Box<dyn FaceEstimator>) -> Self {
        Self { estimator }
    }

    /// Surrender the estimator, so a caller that owns it can reuse it
    /// for the next session.
    pub fn into_estimator(self) -> Box<dyn FaceEstimator> {
        self.estimator
    }

    /// Evaluate the just-scanned canvas. Called once per tick.
    ///
    /// An estimator failure rejects with `NoFace`: a broken detector must
    /// not silently permit an unverified capture.
    pub fn evaluate(&mut self, canvas: &Canvas) -> Verdict {
        if canvas.is_empty() {
            return Verdict::Rejected(RejectReason::NoFace);
        }
        let faces = match self
            .estimator
            .estimate_faces(canvas.data(), canvas.width(), canvas.height())
        {
            Ok(faces) => faces,
            Err(err) => {
                tracing::warn!(error = %err, "face estimator failed; rejecting frame");
                return Verdict::Rejected(RejectReason::NoFace);
            }
        };
        evaluate_faces(&faces, canvas.width())
    }
}

/// Apply the positional thresholds to a detection list.
pub fn evaluate_faces(faces: &[BoundingBox], frame_width: u32) -> Verdict {
    let face = match faces {
        [] => return Verdict::Rejected(RejectReason::NoFace),
        [face] => face,
        _ => return Verdict::Rejected(RejectReason::MultipleFaces),
    };

    let w = frame_width as f32;
    if face.width < MIN_FACE_WIDTH_RATIO * w {
        return Verdict::Rejected(RejectReason::TooFar);
    }
    if face.width > MAX_FACE_WIDTH_RATIO * w {
        return Verdict::Rejected(RejectReason::TooClose);
    }

    let (nose_x, nose_y) = face.nose();
    let band = (CENTER_BAND_MIN_RATIO * w)..=(CENTER_BAND_MAX_RATIO * w);
    if !band.contains(&nose_x) || !band.contains(&nose_y) {
        return Verdict::Rejected(RejectReason::OffCenter);
    }

    Verdict::Accepted
}
