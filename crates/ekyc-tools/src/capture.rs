//! Still-capture flow.
//!
//! Drives a single photo through scan → crop → encode. The controller is
//! a small state machine so a trigger that arrives before the camera is
//! ready, or while an export is already running, is ignored instead of
//! corrupting the flow.

use crate::config::ResolvedConfig;
use crate::result::CaptureResult;
use crate::session::SessionError;
use ekyc_camera::{encode_rgb, VideoSource};
use ekyc_core::{geometry, Canvas, OverlayGeometry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Camera not yet playing. Triggers are no-ops.
    AwaitingCamera,
    Ready,
    Scanning,
    Exporting,
    /// A result has been produced; the session is over.
    Done,
}

pub struct CaptureController {
    config: ResolvedConfig,
    state: CaptureState,
    canvas: Canvas,
}

impl CaptureController {
    pub fn new(config: ResolvedConfig) -> Self {
        Self { config, state: CaptureState::AwaitingCamera, canvas: Canvas::new() }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Mark the video source as playing. Idempotent.
    pub fn camera_ready(&mut self) {
        if self.state == CaptureState::AwaitingCamera {
            self.state = CaptureState::Ready;
        }
    }

    /// Attempt one capture.
    ///
    /// Returns `Ok(None)` when nothing could be produced: the camera
    /// never became ready (terminal "no camera" outcome, not an error),
    /// a capture is already in flight, or this tick's scan geometry was
    /// not yet resolvable (transient; the caller may trigger again).
    pub fn trigger(
        &mut self,
        source: &mut dyn VideoSource,
        viewport: (u32, u32),
    ) -> Result<Option<CaptureResult>, SessionError> {
        match self.state {
            CaptureState::Ready => {}
            CaptureState::AwaitingCamera | CaptureState::Done => return Ok(None),
            CaptureState::Scanning | CaptureState::Exporting => {
                tracing::debug!(state = ?self.state, "trigger ignored, capture in flight");
                return Ok(None);
            }
        }

        self.state = CaptureState::Scanning;
        let frame = match source.grab() {
            Ok(frame) => frame,
            Err(err) => {
                self.state = CaptureState::Ready;
                return Err(err.into());
            }
        };
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
        let Some(scan) = scan else {
            self.state = CaptureState::Ready;
            return Ok(None);
        };
        if !self.canvas.draw_frame(&frame.data, native_w, native_h, &scan) {
            self.state = CaptureState::Ready;
            return Ok(None);
        }

        self.state = CaptureState::Exporting;
        let blob = encode_rgb(
            self.canvas.data(),
            self.canvas.width(),
            self.canvas.height(),
            self.config.image_mime,
            self.config.quality,
        )?;
        self.state = CaptureState::Done;
        tracing::info!(
            bytes = blob.len(),
            width = self.canvas.width(),
            height = self.canvas.height(),
            "capture exported"
        );
        Ok(Some(CaptureResult::image(blob, self.config.image_mime)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, Options};
    use crate::testutil::StubSource;

    fn config(ratio: f64) -> ResolvedConfig {
        let opts = Options {
            shading_ratio: Some(ratio),
            mime_type: Some("image/png".into()),
            ..Default::default()
        };
        opts.resolve(Mode::Capture)
    }

    #[test]
    fn test_trigger_before_ready_is_noop() {
        let mut ctl = CaptureController::new(config(0.5));
        let mut source = StubSource::new(1280, 720);
        let out = ctl.trigger(&mut source, (640, 360)).unwrap();
        assert!(out.is_none());
        assert_eq!(ctl.state(), CaptureState::AwaitingCamera);
        assert_eq!(source.grab_count(), 0);
    }

    #[test]
    fn test_capture_produces_png_result() {
        let mut ctl = CaptureController::new(config(0.5));
        let mut source = StubSource::new(1280, 720);
        ctl.camera_ready();
        let result = ctl.trigger(&mut source, (640, 360)).unwrap().unwrap();
        assert_eq!(result.content_type, "image/png");
        assert!(result.content_length > 0);
        assert_eq!(result.blob.len(), result.content_length);
        assert_eq!(ctl.state(), CaptureState::Done);
    }

    #[test]
    fn test_second_trigger_after_done_is_noop() {
        let mut ctl = CaptureController::new(config(0.5));
        let mut source = StubSource::new(1280, 720);
        ctl.camera_ready();
        assert!(ctl.trigger(&mut source, (640, 360)).unwrap().is_some());
        assert!(ctl.trigger(&mut source, (640, 360)).unwrap().is_none());
        assert_eq!(source.grab_count(), 1);
    }

    #[test]
    fn test_zero_viewport_is_transient() {
        let mut ctl = CaptureController::new(config(0.5));
        let mut source = StubSource::new(1280, 720);
        ctl.camera_ready();
        assert!(ctl.trigger(&mut source, (0, 0)).unwrap().is_none());
        // Controller recovered; a sane viewport succeeds.
        assert!(ctl.trigger(&mut source, (640, 360)).unwrap().is_some());
    }
}
