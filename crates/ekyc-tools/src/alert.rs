//! Rejection-advisory banner logic.
//!
//! The validation gate emits a verdict every tick (10/s); showing each
//! one verbatim would make the banner flicker. The debouncer collapses
//! repeated identical reasons into one persistent display, replaces the
//! content only when the reason changes, clears it on accept, and
//! auto-dismisses a banner whose reason has not been re-observed within
//! the hold period.

use ekyc_core::gate::{RejectReason, Verdict};
use std::time::{Duration, Instant};

/// How long a banner survives without its reason being re-observed.
const ALERT_HOLD: Duration = Duration::from_millis(2200);

/// Where advisories end up. Embedders render these; the headless default
/// logs them.
pub trait AlertSink: Send {
    fn show(&mut self, reason: RejectReason);
    fn dismiss(&mut self);
}

/// Default sink: structured log lines instead of a UI banner.
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn show(&mut self, reason: RejectReason) {
        tracing::info!(advisory = reason.advisory(), "validation alert");
    }

    fn dismiss(&mut self) {
        tracing::debug!("validation alert dismissed");
    }
}

pub struct AlertDebouncer {
    sink: Box<dyn AlertSink>,
    current: Option<RejectReason>,
    last_seen: Instant,
    hold: Duration,
}

impl AlertDebouncer {
    pub fn new(sink: Box<dyn AlertSink>) -> Self {
        Self { sink, current: None, last_seen: Instant::now(), hold: ALERT_HOLD }
    }

    #[cfg(test)]
    fn with_hold(sink: Box<dyn AlertSink>, hold: Duration) -> Self {
        Self { sink, current: None, last_seen: Instant::now(), hold }
    }

    /// Feed one verdict. `now` is taken as a parameter so the tick loop
    /// evaluates time once per cycle.
    pub fn observe(&mut self, verdict: &Verdict, now: Instant) {
        // Stale banner first: the reason stopped arriving (e.g. the gate
        // went quiet) long enough ago that the display should clear.
        if self.current.is_some() && now.duration_since(self.last_seen) >= self.hold {
            self.clear();
        }

        match verdict.reason() {
            Some(reason) => {
                if self.current != Some(reason) {
                    self.sink.show(reason);
                    self.current = Some(reason);
                }
                self.last_seen = now;
            }
            None => {
                if self.current.is_some() {
                    self.clear();
                }
            }
        }
    }

    fn clear(&mut self) {
        self.sink.dismiss();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        shows: Vec<RejectReason>,
        dismissals: usize,
    }

    struct RecordingSink(Arc<Mutex<Recorder>>);

    impl AlertSink for RecordingSink {
        fn show(&mut self, reason: RejectReason) {
            self.0.lock().unwrap().shows.push(reason);
        }
        fn dismiss(&mut self) {
            self.0.lock().unwrap().dismissals += 1;
        }
    }

    fn debouncer() -> (AlertDebouncer, Arc<Mutex<Recorder>>) {
        let rec = Arc::new(Mutex::new(Recorder::default()));
        let deb = AlertDebouncer::with_hold(
            Box::new(RecordingSink(rec.clone())),
            Duration::from_millis(200),
        );
        (deb, rec)
    }

    #[test]
    fn test_repeated_reason_shows_once() {
        let (mut deb, rec) = debouncer();
        let t = Instant::now();
        for i in 0..5 {
            deb.observe(
                &Verdict::Rejected(RejectReason::TooFar),
                t + Duration::from_millis(i * 10),
            );
        }
        assert_eq!(rec.lock().unwrap().shows, vec![RejectReason::TooFar]);
        assert_eq!(rec.lock().unwrap().dismissals, 0);
    }

    #[test]
    fn test_reason_change_replaces_banner() {
        let (mut deb, rec) = debouncer();
        let t = Instant::now();
        deb.observe(&Verdict::Rejected(RejectReason::TooFar), t);
        deb.observe(&Verdict::Rejected(RejectReason::OffCenter), t + Duration::from_millis(10));
        assert_eq!(
            rec.lock().unwrap().shows,
            vec![RejectReason::TooFar, RejectReason::OffCenter]
        );
    }

    #[test]
    fn test_accept_clears_banner() {
        let (mut deb, rec) = debouncer();
        let t = Instant::now();
        deb.observe(&Verdict::Rejected(RejectReason::NoFace), t);
        deb.observe(&Verdict::Accepted, t + Duration::from_millis(10));
        assert_eq!(rec.lock().unwrap().dismissals, 1);
        // Accept with nothing shown does not dismiss again.
        deb.observe(&Verdict::Accepted, t + Duration::from_millis(20));
        assert_eq!(rec.lock().unwrap().dismissals, 1);
    }

    #[test]
    fn test_stale_banner_auto_dismisses() {
        let (mut deb, rec) = debouncer();
        let t = Instant::now();
        deb.observe(&Verdict::Rejected(RejectReason::TooClose), t);
        // Same reason arriving again after the hold: the stale banner is
        // cleared and a fresh one shown.
        deb.observe(
            &Verdict::Rejected(RejectReason::TooClose),
            t + Duration::from_millis(300),
        );
        let rec = rec.lock().unwrap();
        assert_eq!(rec.dismissals, 1);
        assert_eq!(rec.shows.len(), 2);
    }
}
