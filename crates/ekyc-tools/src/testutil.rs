//! Shared stubs for controller and session tests.

use ekyc_camera::{CameraError, VideoFrame, VideoSource};
use ekyc_core::{BoundingBox, FaceEstimator};
use ekyc_core::gate::EstimatorError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// In-memory video source producing uniform mid-grey frames.
pub struct StubSource {
    width: u32,
    height: u32,
    ready: bool,
    stopped: Arc<AtomicBool>,
    grabs: Arc<AtomicUsize>,
    switches: Arc<AtomicUsize>,
    sequence: u32,
}

impl StubSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ready: true,
            stopped: Arc::new(AtomicBool::new(false)),
            grabs: Arc::new(AtomicUsize::new(0)),
            switches: Arc::new(AtomicUsize::new(0)),
            sequence: 0,
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn grab_count(&self) -> usize {
        self.grabs.load(Ordering::SeqCst)
    }

    pub fn switch_counter(&self) -> Arc<AtomicUsize> {
        self.switches.clone()
    }

    /// Handles that stay observable after the source moves into a session.
    pub fn watchers(&self) -> (Arc<AtomicBool>, Arc<AtomicUsize>) {
        (self.stopped.clone(), self.grabs.clone())
    }
}

impl VideoSource for StubSource {
    fn is_ready(&self) -> bool {
        self.ready && !self.stopped.load(Ordering::SeqCst)
    }

    fn native_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn grab(&mut self) -> Result<VideoFrame, CameraError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(CameraError::Stopped);
        }
        self.grabs.fetch_add(1, Ordering::SeqCst);
        self.sequence += 1;
        Ok(VideoFrame {
            data: vec![120u8; (self.width * self.height * 3) as usize],
            width: self.width,
            height: self.height,
            timestamp: Instant::now(),
            sequence: self.sequence,
        })
    }

    fn switch_camera(&mut self) -> Result<(), CameraError> {
        self.switches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Scripted estimator: each call pops the next accept/reject decision.
/// Accepts produce one well-positioned face for the given frame width;
/// rejects produce no faces. An exhausted script repeats its last entry.
pub struct AcceptSequence {
    script: Vec<bool>,
    cursor: usize,
    calls: Arc<AtomicUsize>,
    /// Side effect to run on the first call, e.g. flipping a close flag.
    pub on_first_call: Option<Box<dyn FnOnce() + Send>>,
}

impl AcceptSequence {
    pub fn new(script: Vec<bool>) -> Self {
        Self {
            script,
            cursor: 0,
            calls: Arc::new(AtomicUsize::new(0)),
            on_first_call: None,
        }
    }

    pub fn always_accept() -> Self {
        Self::new(vec![true])
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl FaceEstimator for AcceptSequence {
    fn estimate_faces(
        &mut self,
        _rgb: &[u8],
        width: u32,
        _height: u32,
    ) -> Result<Vec<BoundingBox>, EstimatorError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            if let Some(hook) = self.on_first_call.take() {
                hook();
            }
        }
        let accepted = *self
            .script
            .get(self.cursor)
            .or(self.script.last())
            .unwrap_or(&false);
        if self.cursor < self.script.len() {
            self.cursor += 1;
        }
        if accepted {
            Ok(vec![centered_face(width)])
        } else {
            Ok(Vec::new())
        }
    }
}

/// A face that passes both the width and the centering checks.
pub fn centered_face(frame_width: u32) -> BoundingBox {
    let w = frame_width as f32;
    BoundingBox {
        x: 0.3 * w,
        y: 0.2 * w,
        width: 0.4 * w,
        height: 0.5 * w,
        confidence: 0.99,
        landmarks: None,
    }
}
