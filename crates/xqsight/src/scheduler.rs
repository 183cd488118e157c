//! Periodic recognition on a worker thread.
//!
//! The worker owns the [`Orchestrator`] and the capture source. Each tick runs
//! one attempt to completion; ticks that fire meanwhile are dropped, not
//! queued. Readers see the latest state through [`Scheduler::snapshot`] and
//! may also consume reports from [`Scheduler::reports`]; only the newest
//! [`REPORT_BACKLOG`] unread reports are kept.

use crate::capture::ScreenCapture;
use crate::orchestrator::{AttemptReport, Orchestrator};
use crossbeam_channel::{select, tick, Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, info};
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use xqsight_position::PositionRecord;

/// Unread reports kept for [`Scheduler::reports`].
pub const REPORT_BACKLOG: usize = 16;

#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub last_record: Option<PositionRecord>,
    pub last_report: Option<AttemptReport>,
    pub attempts: u64,
    pub skipped_ticks: u64,
}

pub struct Scheduler {
    stop: Option<Sender<()>>,
    trigger: Sender<()>,
    reports: Receiver<AttemptReport>,
    shared: Arc<RwLock<Snapshot>>,
    worker: Option<JoinHandle<(Orchestrator, Box<dyn ScreenCapture>)>>,
}

impl Scheduler {
    /// Start ticking every `interval`. The first attempt runs one interval
    /// after start; use [`Scheduler::trigger`] for an immediate one.
    pub fn start(
        orchestrator: Orchestrator,
        capture: Box<dyn ScreenCapture>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let (trigger_tx, trigger_rx) = crossbeam_channel::bounded::<()>(1);
        let (report_tx, report_rx) = crossbeam_channel::bounded(REPORT_BACKLOG);
        let backlog = report_rx.clone();
        let shared = Arc::new(RwLock::new(Snapshot::default()));

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("xqsight-worker".into())
            .spawn(move || {
                run_worker(
                    orchestrator,
                    capture,
                    interval,
                    stop_rx,
                    trigger_rx,
                    (report_tx, backlog),
                    worker_shared,
                )
            })?;
        info!("scheduler started, interval {interval:?}");

        Ok(Self {
            stop: Some(stop_tx),
            trigger: trigger_tx,
            reports: report_rx,
            shared,
            worker: Some(worker),
        })
    }

    /// Request an attempt now. Ignored if one is already pending.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.read().clone()
    }

    pub fn reports(&self) -> &Receiver<AttemptReport> {
        &self.reports
    }

    /// No further attempts start after this returns. An attempt already in
    /// flight is left to finish.
    pub fn stop(&mut self) {
        if self.stop.take().is_some() {
            info!("scheduler stopping");
        }
    }

    /// Stop and wait for the worker, handing back what it owned.
    pub fn join(mut self) -> Option<(Orchestrator, Box<dyn ScreenCapture>)> {
        self.stop();
        self.worker.take().and_then(|w| w.join().ok())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stopped(stop: &Receiver<()>) -> bool {
    !matches!(stop.try_recv(), Err(TryRecvError::Empty))
}

/// Send without blocking; when nobody reads, the oldest report makes room.
fn publish(tx: &Sender<AttemptReport>, backlog: &Receiver<AttemptReport>, report: AttemptReport) {
    if let Err(TrySendError::Full(report)) = tx.try_send(report) {
        let _ = backlog.try_recv();
        let _ = tx.try_send(report);
    }
}

fn run_worker(
    mut orchestrator: Orchestrator,
    mut capture: Box<dyn ScreenCapture>,
    interval: Duration,
    stop: Receiver<()>,
    trigger: Receiver<()>,
    (reports, backlog): (Sender<AttemptReport>, Receiver<AttemptReport>),
    shared: Arc<RwLock<Snapshot>>,
) -> (Orchestrator, Box<dyn ScreenCapture>) {
    let ticker = tick(interval.max(Duration::from_millis(1)));
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(ticker) -> _ => {}
            recv(trigger) -> _ => {}
        }
        if stopped(&stop) {
            break;
        }

        let report = orchestrator.attempt_capture(capture.as_mut());

        let mut skipped = 0;
        while ticker.try_recv().is_ok() {
            skipped += 1;
        }
        if skipped > 0 {
            debug!("skipped {skipped} tick(s) during the attempt");
        }
        {
            let mut snap = shared.write();
            snap.attempts += 1;
            snap.skipped_ticks += skipped;
            snap.last_record = orchestrator.last_record().cloned();
            snap.last_report = Some(report.clone());
        }
        publish(&reports, &backlog, report);
    }
    debug!("worker exiting");
    (orchestrator, capture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::Recognizer;
    use crate::CaptureError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use xqsight_board::PartitionParams;
    use xqsight_core::ColorImage;
    use xqsight_position::Side;

    struct Slow {
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl ScreenCapture for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        fn capture(&mut self) -> Result<ColorImage, CaptureError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            Err(CaptureError::Empty)
        }
    }

    fn idle() -> Orchestrator {
        Orchestrator::new(Recognizer::new(Vec::new(), PartitionParams::default(), Side::Red))
    }

    fn wait_until(limit: Duration, mut done: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < limit {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn ticks_during_an_attempt_are_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let capture = Slow {
            calls: Arc::clone(&calls),
            delay: Duration::from_millis(60),
        };
        let sched = Scheduler::start(idle(), Box::new(capture), Duration::from_millis(10)).unwrap();
        assert!(wait_until(Duration::from_secs(5), || sched.snapshot().attempts >= 3));
        let snap = sched.snapshot();
        assert!(snap.skipped_ticks >= 1, "{snap:?}");
        // one attempt at a time: never more calls than finished attempts + 1
        assert!(calls.load(Ordering::SeqCst) as u64 <= snap.attempts + 1);
        assert!(sched.join().is_some());
    }

    #[test]
    fn unread_reports_are_capped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let capture = Slow {
            calls: Arc::clone(&calls),
            delay: Duration::ZERO,
        };
        let target = 3 * REPORT_BACKLOG as u64;
        let sched = Scheduler::start(idle(), Box::new(capture), Duration::from_millis(1)).unwrap();
        assert!(wait_until(Duration::from_secs(10), || sched.snapshot().attempts >= target));
        assert!(sched.reports().len() <= REPORT_BACKLOG);
        assert!(sched.reports().try_recv().is_ok());
        assert!(sched.join().is_some());
    }

    #[test]
    fn stop_lets_the_attempt_in_flight_finish() {
        let calls = Arc::new(AtomicUsize::new(0));
        let capture = Slow {
            calls: Arc::clone(&calls),
            delay: Duration::from_millis(100),
        };
        let mut sched = Scheduler::start(idle(), Box::new(capture), Duration::from_secs(60)).unwrap();
        sched.trigger();
        assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) == 1));
        sched.stop();
        let report = sched
            .reports()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert_eq!(report.status_text, "board not found");
        assert!(sched.join().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
