//! Face-verification recording flow.
//!
//! Each tick scans the camera into the canvas, runs the validation gate,
//! and advances the recording accumulator. Rejections pause the recorder
//! instead of resetting it: partial progress is kept, and the counter
//! continues where it left off once the face is acceptable again.

use crate::alert::AlertDebouncer;
use crate::config::ResolvedConfig;
use crate::result::{CaptureResult, RecordResult};
use crate::session::SessionError;
use ekyc_camera::{encode_rgb, FrameRecorder, ImageMime, VideoSource};
use ekyc_core::{geometry, Canvas, FaceEstimator, OverlayGeometry, ValidationGate, Verdict};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Paused,
    Completed,
}

/// Valid-duration bookkeeping over the recorder lifecycle.
///
/// Duration accrues only on ticks spent already in `Recording`; the tick
/// that starts or resumes the recorder buys state, not time. A rejection
/// while recording pauses; while idle or paused it is a no-op.
pub struct RecordingAccumulator {
    state: RecordingState,
    valid_ms: u64,
    target_ms: u64,
    percent: u8,
}

impl RecordingAccumulator {
    pub fn new(target_ms: u64) -> Self {
        Self { state: RecordingState::Idle, valid_ms: 0, target_ms, percent: 0 }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn valid_ms(&self) -> u64 {
        self.valid_ms
    }

    /// Progress toward the target, clamped to [0, 100].
    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn completed(&self) -> bool {
        self.state == RecordingState::Completed
    }

    /// Advance one tick worth `tick_ms` of wall time.
    pub fn tick(
        &mut self,
        accepted: bool,
        tick_ms: u64,
        recorder: &mut dyn FrameRecorder,
    ) -> Result<RecordingState, SessionError> {
        match (accepted, self.state) {
            (true, RecordingState::Idle) => {
                recorder.start()?;
                self.state = RecordingState::Recording;
                tracing::info!("recording started");
            }
            (true, RecordingState::Paused) => {
                recorder.resume()?;
                self.state = RecordingState::Recording;
                tracing::debug!(valid_ms = self.valid_ms, "recording resumed");
            }
            (true, RecordingState::Recording) => {
                self.valid_ms += tick_ms;
                if self.valid_ms >= self.target_ms {
                    self.state = RecordingState::Completed;
                }
            }
            (false, RecordingState::Recording) => {
                recorder.pause()?;
                self.state = RecordingState::Paused;
                tracing::debug!(valid_ms = self.valid_ms, "recording paused");
            }
            (false, RecordingState::Idle | RecordingState::Paused) => {}
            (_, RecordingState::Completed) => {}
        }

        self.percent = ((self.valid_ms.min(self.target_ms) * 100) / self.target_ms.max(1)) as u8;
        Ok(self.state)
    }
}

pub struct RecordController {
    config: ResolvedConfig,
    accumulator: RecordingAccumulator,
    canvas: Canvas,
    recorder: Box<dyn FrameRecorder>,
    gate: Option<ValidationGate>,
    alert: Option<AlertDebouncer>,
    poster: Option<Vec<u8>>,
}

impl RecordController {
    pub fn new(
        config: ResolvedConfig,
        recorder: Box<dyn FrameRecorder>,
        gate: Option<ValidationGate>,
        alert: Option<AlertDebouncer>,
    ) -> Self {
        let target_ms = config.record_ms;
        Self {
            config,
            accumulator: RecordingAccumulator::new(target_ms),
            canvas: Canvas::new(),
            recorder,
            gate,
            alert,
            poster: None,
        }
    }

    pub fn percent(&self) -> u8 {
        self.accumulator.percent()
    }

    pub fn state(&self) -> RecordingState {
        self.accumulator.state()
    }

    /// Run one scan → validate → decide cycle.
    ///
    /// `Ok(None)` means the session continues; `Ok(Some(..))` means the
    /// target duration was reached, the recorder stopped, and the source
    /// released. Errors leave the recorder in an unusable state; the
    /// caller must run `abort` to release resources.
    pub fn tick(
        &mut self,
        source: &mut dyn VideoSource,
        viewport: (u32, u32),
        tick_ms: u64,
    ) -> Result<Option<RecordResult>, SessionError> {
        if !source.is_ready() {
            return Ok(None);
        }

        let frame = source.grab()?;
        let (native_w, native_h) = source.native_size();
        let overlay = OverlayGeometry::compute(viewport.0, viewport.1, self.config.shading_ratio);
        let scan = geometry::compute_scan_rects(
            native_w,
            native_h,
            viewport.0,
            viewport.1,
            overlay.as_ref(),
            self.config.canvas_limits,
            self.config.max_canvas_ratio,
        );
        let Some(scan) = scan else { return Ok(None) };
        if !self.canvas.draw_frame(&frame.data, native_w, native_h, &scan) {
            return Ok(None);
        }

        let verdict = match &mut self.gate {
            Some(gate) => gate.evaluate(&self.canvas),
            // Validation disabled (or no estimator): every frame counts.
            None => Verdict::Accepted,
        };
        if let Some(alert) = &mut self.alert {
            alert.observe(&verdict, Instant::now());
        }

        self.accumulator.tick(verdict.accepted(), tick_ms, self.recorder.as_mut())?;

        if self.accumulator.state() == RecordingState::Recording {
            self.recorder
                .push_frame(self.canvas.data(), self.canvas.width(), self.canvas.height())?;
            if self.poster.is_none() {
                // Poster still from the first recorded frame.
                self.poster = Some(encode_rgb(
                    self.canvas.data(),
                    self.canvas.width(),
                    self.canvas.height(),
                    ImageMime::Png,
                    1.0,
                )?);
            }
        }

        if self.accumulator.completed() {
            return self.finish(source).map(Some);
        }
        Ok(None)
    }

    fn finish(&mut self, source: &mut dyn VideoSource) -> Result<RecordResult, SessionError> {
        let chunks = self.recorder.stop()?;
        source.stop();
        let blob: Vec<u8> = chunks.concat();
        tracing::info!(
            bytes = blob.len(),
            valid_ms = self.accumulator.valid_ms(),
            "recording completed"
        );
        let poster = self.poster.take().map(|b| CaptureResult::image(b, ImageMime::Png));
        Ok(RecordResult { video: CaptureResult::video(blob, self.config.video_mime), poster })
    }

    /// Release the recorder and stream after a close or a failed tick.
    /// Idempotent. The estimator stays recoverable via `take_estimator`.
    pub fn abort(&mut self, source: &mut dyn VideoSource) {
        let _ = self.recorder.stop();
        source.stop();
        if self.accumulator.state() != RecordingState::Completed {
            tracing::info!(valid_ms = self.accumulator.valid_ms(), "recording aborted");
        }
    }

    /// Hand the estimator back so the next session keeps validating.
    pub fn take_estimator(&mut self) -> Option<Box<dyn FaceEstimator>> {
        self.gate.take().map(ValidationGate::into_estimator)
    }
}
