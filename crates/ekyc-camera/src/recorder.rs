//! Frame-recorder capability.
//!
//! The record controller only needs "turn a sequence of canvas frames
//! into encoded chunks"; the container/codec behind that is opaque. The
//! default implementation emits one JPEG chunk per frame (MJPEG — a plain
//! concatenation of JPEG images), which keeps the toolkit free of real
//! codec work while still exercising the full start/pause/resume/stop
//! lifecycle.

use crate::encode::{encode_rgb, EncodeError, ImageMime};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("recorder is {actual}, expected {expected}")]
    InvalidState { expected: &'static str, actual: &'static str },
    #[error("chunk encoding failed: {0}")]
    Encode(#[from] EncodeError),
}

/// Opaque media-recorder capability consumed by the record controller.
///
/// Implementations must tolerate `stop` in any state (it is the resource
/// release path) but may reject out-of-order `start`/`pause`/`resume`.
pub trait FrameRecorder: Send {
    fn start(&mut self) -> Result<(), RecorderError>;
    fn pause(&mut self) -> Result<(), RecorderError>;
    fn resume(&mut self) -> Result<(), RecorderError>;
    /// Feed one canvas frame. Ignored while paused.
    fn push_frame(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<(), RecorderError>;
    /// Stop and hand back all accumulated chunks. Idempotent.
    fn stop(&mut self) -> Result<Vec<Vec<u8>>, RecorderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecState {
    Inactive,
    Recording,
    Paused,
}

impl RecState {
    fn name(&self) -> &'static str {
        match self {
            RecState::Inactive => "inactive",
            RecState::Recording => "recording",
            RecState::Paused => "paused",
        }
    }
}

/// Default recorder: one JPEG chunk per pushed frame.
pub struct MjpegRecorder {
    state: RecState,
    chunks: Vec<Vec<u8>>,
    quality: f32,
}

impl MjpegRecorder {
    /// `quality` in [0, 1], applied to each JPEG chunk.
    pub fn new(quality: f32) -> Self {
        Self {
            state: RecState::Inactive,
            chunks: Vec::new(),
            quality: quality.clamp(0.0, 1.0),
        }
    }
}

impl FrameRecorder for MjpegRecorder {
    fn start(&mut self) -> Result<(), RecorderError> {
        if self.state != RecState::Inactive {
            return Err(RecorderError::InvalidState {
                expected: "inactive",
                actual: self.state.name(),
            });
        }
        self.chunks.clear();
        self.state = RecState::Recording;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), RecorderError> {
        if self.state != RecState::Recording {
            return Err(RecorderError::InvalidState {
                expected: "recording",
                actual: self.state.name(),
            });
        }
        self.state = RecState::Paused;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), RecorderError> {
        if self.state != RecState::Paused {
            return Err(RecorderError::InvalidState {
                expected: "paused",
                actual: self.state.name(),
            });
        }
        self.state = RecState::Recording;
        Ok(())
    }

    fn push_frame(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<(), RecorderError> {
        match self.state {
            RecState::Recording => {
                let chunk = encode_rgb(rgb, width, height, ImageMime::Jpeg, self.quality)?;
                self.chunks.push(chunk);
                Ok(())
            }
            RecState::Paused => Ok(()),
            RecState::Inactive => Err(RecorderError::InvalidState {
                expected: "recording",
                actual: "inactive",
            }),
        }
    }

    fn stop(&mut self) -> Result<Vec<Vec<u8>>, RecorderError> {
        self.state = RecState::Inactive;
        Ok(std::mem::take(&mut self.chunks))
    }
}
