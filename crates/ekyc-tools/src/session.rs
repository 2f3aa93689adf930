//! Session engine and public entry points.
//!
//! Each `get_image`/`get_video` call runs its flow on a dedicated OS
//! thread driven by a fixed-cadence tick loop: exactly one
//! scan → validate → decide cycle per tick, never overlapped. The
//! caller awaits the outcome over a oneshot channel. `close` flips a
//! shared flag the loop checks between cycles; every exit path stops
//! the stream and any in-flight recorder. The estimator travels back
//! over the result channel so repeated record sessions keep validating.

use crate::alert::{AlertDebouncer, LogAlertSink};
use crate::capture::CaptureController;
use crate::config::{Mode, Options, ResolvedConfig};
use crate::record::RecordController;
use crate::result::{CaptureResult, RecordResult};
use ekyc_camera::{
    CameraError, CameraSession, Constraints, EncodeError, FrameRecorder, MjpegRecorder,
    RecorderError, VideoSource,
};
use ekyc_core::{FaceEstimator, ValidationGate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Cadence of the scan/validate/decide loop.
pub const TICK_MS: u64 = 100;
/// Ticks to wait for the camera to report ready before giving up.
const READY_WAIT_TICKS: u32 = 50;
/// A record session may run this many times its target duration before
/// it is aborted as stuck (gate never accepting again).
const RECORD_TIMEOUT_FACTOR: u64 = 20;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("recorder error: {0}")]
    Recorder(#[from] RecorderError),
    #[error("encoding error: {0}")]
    Encode(#[from] EncodeError),
    #[error("session thread exited unexpectedly")]
    ChannelClosed,
    #[error("failed to spawn session thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Cross-thread close request. Cheap to clone, checked once per tick.
#[derive(Clone, Default)]
pub struct CloseFlag(Arc<AtomicBool>);

impl CloseFlag {
    pub fn close(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Cross-thread camera-switch request. Set by the embedder, consumed by
/// the session loop at its next tick.
#[derive(Clone, Default)]
pub struct SwitchFlag(Arc<AtomicBool>);

impl SwitchFlag {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Consume a pending request, if any.
    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Fixed-cadence pacing for the session loop. Cycles cannot overlap:
/// the loop body runs to completion before the next sleep begins.
struct TickDriver {
    close: CloseFlag,
    period: Duration,
}

impl TickDriver {
    fn new(close: CloseFlag, tick_ms: u64) -> Self {
        Self { close, period: Duration::from_millis(tick_ms) }
    }

    /// Sleep one period. Returns false once the session is closed.
    fn next_tick(&self) -> bool {
        if self.close.is_closed() {
            return false;
        }
        std::thread::sleep(self.period);
        !self.close.is_closed()
    }
}

type SharedViewport = Arc<Mutex<Option<(u32, u32)>>>;

/// Entry point for embedders.
///
/// ```no_run
/// # async fn demo() -> Result<(), ekyc_tools::SessionError> {
/// let mut tools = ekyc_tools::EkycTools::new();
/// let opts: ekyc_tools::Options = Default::default();
/// if let Some(image) = tools.get_image(opts).await? {
///     std::fs::write(&image.content_name, &image.blob)?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct EkycTools {
    close: CloseFlag,
    switch: SwitchFlag,
    viewport: SharedViewport,
    estimator: Option<Box<dyn FaceEstimator>>,
    recorder: Option<Box<dyn FrameRecorder>>,
    alert_sink: Option<Box<dyn crate::alert::AlertSink>>,
}

impl Default for EkycTools {
    fn default() -> Self {
        Self::new()
    }
}

impl EkycTools {
    pub fn new() -> Self {
        Self {
            close: CloseFlag::default(),
            switch: SwitchFlag::default(),
            viewport: Arc::new(Mutex::new(None)),
            estimator: None,
            recorder: None,
            alert_sink: None,
        }
    }

    /// Supply the face detector backing the validation gate. Without
    /// one, validation degrades to always-accept (with a warning).
    pub fn with_face_estimator(mut self, estimator: Box<dyn FaceEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Replace the default MJPEG recorder.
    pub fn with_frame_recorder(mut self, recorder: Box<dyn FrameRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Route rejection advisories somewhere other than the log.
    pub fn with_alert_sink(mut self, sink: Box<dyn crate::alert::AlertSink>) -> Self {
        self.alert_sink = Some(sink);
        self
    }

    /// Rendered size of the embedder's video element. Defaults to the
    /// camera's native size when unset.
    pub fn set_viewport(&self, width: u32, height: u32) {
        if let Ok(mut vp) = self.viewport.lock() {
            *vp = Some((width, height));
        }
    }

    /// Ask the active session to flip to the opposite-facing camera at
    /// its next tick. Ignored when `enable_switch_camera` is off or the
    /// switch fails (the current stream is kept).
    pub fn switch_camera(&self) {
        self.switch.request();
    }

    /// Tear down the active session, if any. Idempotent; safe from any
    /// thread at any point in a flow.
    pub fn close(&self) {
        self.close.close();
    }

    /// Capture one still image.
    ///
    /// `Ok(None)` is the user-facing "no capture" outcome (camera never
    /// became ready, or the session was closed first).
    pub async fn get_image(&self, options: Options) -> Result<Option<CaptureResult>, SessionError> {
        let config = options.resolve(Mode::Capture);
        self.close.reset();
        self.switch.take();
        let close = self.close.clone();
        let switch = self.switch.clone();
        let viewport = self.viewport.clone();

        let (tx, rx) = oneshot::channel();
        std::thread::Builder::new().name("ekyc-capture".into()).spawn(move || {
            let outcome = open_camera(&config).and_then(|source| {
                run_capture(source, &config, &close, &switch, &viewport, TICK_MS)
            });
            let _ = tx.send(outcome);
        })?;
        rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    /// Record until the validation gate has accepted `record_ms` worth
    /// of frames. The injected estimator is handed back when the
    /// session ends, whatever the outcome.
    pub async fn get_video(
        &mut self,
        options: Options,
    ) -> Result<Option<RecordResult>, SessionError> {
        let config = options.resolve(Mode::Record);
        self.close.reset();
        self.switch.take();
        let close = self.close.clone();
        let switch = self.switch.clone();
        let viewport = self.viewport.clone();
        let estimator = self.estimator.take();
        let recorder = self
            .recorder
            .take()
            .unwrap_or_else(|| Box::new(MjpegRecorder::new(config.quality)));
        let alert_sink = self.alert_sink.take();

        let (tx, rx) = oneshot::channel();
        std::thread::Builder::new().name("ekyc-record".into()).spawn(move || {
            let reply = match open_camera(&config) {
                Ok(source) => run_record(
                    source, &config, &close, &switch, &viewport, estimator, recorder, alert_sink,
                    TICK_MS,
                ),
                Err(err) => (Err(err), estimator),
            };
            let _ = tx.send(reply);
        })?;
        let (outcome, estimator) = rx.await.map_err(|_| SessionError::ChannelClosed)?;
        self.estimator = estimator;
        outcome
    }
}

fn open_camera(config: &ResolvedConfig) -> Result<CameraSession, SessionError> {
    let constraints = Constraints {
        facing_mode: config.facing_mode,
        ..Default::default()
    };
    Ok(CameraSession::open(constraints)?)
}

fn effective_viewport(shared: &SharedViewport, source: &dyn VideoSource) -> (u32, u32) {
    shared
        .lock()
        .ok()
        .and_then(|vp| *vp)
        .unwrap_or_else(|| source.native_size())
}

/// Consume a pending switch request. A failed switch keeps the current
/// stream; the session carries on rather than dying mid-flow.
fn service_switch_request(
    source: &mut dyn VideoSource,
    config: &ResolvedConfig,
    switch: &SwitchFlag,
) {
    if !switch.take() {
        return;
    }
    if !config.enable_switch_camera {
        tracing::debug!("switch-camera request ignored (disabled)");
        return;
    }
    if let Err(err) = source.switch_camera() {
        tracing::warn!(error = %err, "camera switch failed, keeping current stream");
    }
}

/// Capture loop: wait for ready, trigger once, release the source.
fn run_capture<S: VideoSource>(
    mut source: S,
    config: &ResolvedConfig,
    close: &CloseFlag,
    switch: &SwitchFlag,
    viewport: &SharedViewport,
    tick_ms: u64,
) -> Result<Option<CaptureResult>, SessionError> {
    let driver = TickDriver::new(close.clone(), tick_ms);
    let mut controller = CaptureController::new(config.clone());

    let mut waited = 0;
    while !source.is_ready() && waited < READY_WAIT_TICKS {
        if !driver.next_tick() {
            source.stop();
            return Ok(None);
        }
        waited += 1;
    }
    if source.is_ready() {
        controller.camera_ready();
    } else {
        tracing::warn!("camera never became ready");
    }

    service_switch_request(&mut source, config, switch);
    let vp = effective_viewport(viewport, &source);
    let result = controller.trigger(&mut source, vp);
    source.stop();
    result
}

/// Record session: build the gate, run the tick loop, and hand the
/// estimator back alongside the outcome.
#[allow(clippy::too_many_arguments)]
fn run_record<S: VideoSource>(
    mut source: S,
    config: &ResolvedConfig,
    close: &CloseFlag,
    switch: &SwitchFlag,
    viewport: &SharedViewport,
    estimator: Option<Box<dyn FaceEstimator>>,
    recorder: Box<dyn FrameRecorder>,
    alert_sink: Option<Box<dyn crate::alert::AlertSink>>,
    tick_ms: u64,
) -> (Result<Option<RecordResult>, SessionError>, Option<Box<dyn FaceEstimator>>) {
    // When validation is off the estimator is not consumed, but it must
    // still survive the session.
    let (gate, spare) = if config.enable_validation {
        match estimator {
            Some(est) => (Some(ValidationGate::new(est)), None),
            None => {
                tracing::warn!(
                    "validation enabled but no estimator supplied, accepting all frames"
                );
                (None, None)
            }
        }
    } else {
        (None, estimator)
    };
    let alert = config
        .enable_alert
        .then(|| AlertDebouncer::new(alert_sink.unwrap_or_else(|| Box::new(LogAlertSink))));

    let mut controller = RecordController::new(config.clone(), recorder, gate, alert);
    let outcome = record_loop(&mut controller, &mut source, config, close, switch, viewport, tick_ms);
    (outcome, controller.take_estimator().or(spare))
}

fn record_loop(
    controller: &mut RecordController,
    source: &mut dyn VideoSource,
    config: &ResolvedConfig,
    close: &CloseFlag,
    switch: &SwitchFlag,
    viewport: &SharedViewport,
    tick_ms: u64,
) -> Result<Option<RecordResult>, SessionError> {
    let driver = TickDriver::new(close.clone(), tick_ms);
    let max_ticks = (config.record_ms / tick_ms.max(1)).max(1) * RECORD_TIMEOUT_FACTOR;

    for _ in 0..max_ticks {
        if !driver.next_tick() {
            controller.abort(source);
            return Ok(None);
        }
        service_switch_request(source, config, switch);
        let vp = effective_viewport(viewport, source);
        match controller.tick(source, vp, tick_ms) {
            Ok(Some(result)) => return Ok(Some(result)),
            Ok(None) => {}
            Err(err) => {
                controller.abort(source);
                return Err(err);
            }
        }
    }

    tracing::warn!(
        percent = controller.percent(),
        "record session timed out before reaching its target"
    );
    controller.abort(source);
    Ok(None)
}
