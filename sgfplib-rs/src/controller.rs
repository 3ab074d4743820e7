use crate::capture::CaptureResult;
use crate::errors::{CaptureError, Diagnostic, Status};
use crate::sdk::Sdk;
use crate::session::{Session, SessionState};
use log::{debug, info};
use sgfplib_sys::SG_DEV_AUTO;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvError, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread;
use std::time::Duration;

/// What a capture request does when another one already holds the device.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BusyPolicy {
    /// Fail immediately with `CaptureError::DeviceBusy`.
    Reject,
    /// Wait for the running session to finish, then run.
    Queue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Device class passed to `SGFPM_Init`.
    pub device_name: Status,
    /// Device passed to `SGFPM_OpenDevice`.
    pub device_id: Status,
    /// Fixed wait between switching the LED on and acquiring, giving the user time to
    /// place a finger. The SDK exposes no finger-present signal to wait on instead.
    pub settle_delay: Duration,
    pub busy_policy: BusyPolicy,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            device_name: SG_DEV_AUTO,
            device_id: SG_DEV_AUTO,
            settle_delay: Duration::from_secs(2),
            busy_policy: BusyPolicy::Reject,
        }
    }
}

/// Result of one `capture` call with everything that went wrong along the way.
#[derive(Debug)]
pub struct CaptureOutcome {
    pub result: crate::Result<CaptureResult>,
    /// Failures of best-effort calls. Never affect `result`.
    pub diagnostics: Vec<Diagnostic>,
    /// States the session passed through. Empty when the request was turned away
    /// before a session started.
    pub states: Vec<SessionState>,
}

/// Owns access to the scanner. At most one session runs against the SDK at any time.
pub struct CaptureController<S: Sdk> {
    sdk: Arc<S>,
    config: CaptureConfig,
    device: Mutex<()>,
    // Set while a `DeviceGuard` exists; read by `is_busy` without touching the lock.
    busy: AtomicBool,
}

struct DeviceGuard<'a> {
    _lock: MutexGuard<'a, ()>,
    busy: &'a AtomicBool,
}

impl<'a> DeviceGuard<'a> {
    fn new(lock: MutexGuard<'a, ()>, busy: &'a AtomicBool) -> Self {
        busy.store(true, Ordering::SeqCst);
        DeviceGuard { _lock: lock, busy }
    }
}

impl Drop for DeviceGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// A capture running on its own thread. Dropping it tells a queued request that nobody
/// is waiting any more, so it gives up the device instead of running a session.
pub struct PendingCapture {
    receiver: mpsc::Receiver<crate::Result<CaptureResult>>,
    abandoned: Arc<AtomicBool>,
}

impl PendingCapture {
    pub fn recv(&self) -> Result<crate::Result<CaptureResult>, RecvError> {
        self.receiver.recv()
    }

    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<crate::Result<CaptureResult>, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

impl Drop for PendingCapture {
    fn drop(&mut self) {
        self.abandoned.store(true, Ordering::SeqCst);
    }
}

impl<S: Sdk> CaptureController<S> {
    pub fn new(sdk: Arc<S>, config: CaptureConfig) -> Self {
        CaptureController {
            sdk,
            config,
            device: Mutex::new(()),
            busy: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    /// Whether a session currently holds the device.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Captures one fingerprint. Blocks for the whole session, including the wait for a
    /// finger.
    pub fn capture(&self) -> crate::Result<CaptureResult> {
        self.capture_with_diagnostics().result
    }

    pub fn capture_with_diagnostics(&self) -> CaptureOutcome {
        match self.acquire() {
            Some(_guard) => self.run_session(),
            None => rejected(),
        }
    }

    fn run_session(&self) -> CaptureOutcome {
        let outcome = Session::run(&*self.sdk, &self.config);
        if let Ok(capture) = &outcome.result {
            info!(
                "Captured {}x{} fingerprint from device {}",
                capture.width(),
                capture.height(),
                capture.device().serial
            );
        }
        debug!("Session path: {:?}", outcome.states);

        outcome
    }

    fn acquire(&self) -> Option<DeviceGuard<'_>> {
        let lock = match self.config.busy_policy {
            BusyPolicy::Queue => self.device.lock().unwrap_or_else(PoisonError::into_inner),
            BusyPolicy::Reject => match self.device.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return None,
            },
        };

        Some(DeviceGuard::new(lock, &self.busy))
    }
}

fn rejected() -> CaptureOutcome {
    info!("Rejecting capture request: device busy");
    CaptureOutcome {
        result: Err(CaptureError::DeviceBusy),
        diagnostics: Vec::new(),
        states: Vec::new(),
    }
}

impl<S: Sdk + 'static> CaptureController<S> {
    /// Runs `capture` on a dedicated thread.
    ///
    /// The caller may stop waiting at any time. A session that already started still runs
    /// to completion and releases the device on its own thread; one still queued for the
    /// device when the `PendingCapture` is dropped never starts.
    pub fn spawn_capture(self: &Arc<Self>) -> PendingCapture {
        let (sender, receiver) = mpsc::channel();
        let abandoned = Arc::new(AtomicBool::new(false));
        let controller = Arc::clone(self);
        let requester_gone = Arc::clone(&abandoned);

        thread::spawn(move || {
            let outcome = match controller.acquire() {
                Some(_guard) => {
                    if requester_gone.load(Ordering::SeqCst) {
                        debug!("Skipping queued capture: requester stopped waiting");
                        return;
                    }
                    controller.run_session()
                }
                None => rejected(),
            };
            if sender.send(outcome.result).is_err() {
                debug!("Capture finished after the requester stopped waiting");
            }
        });

        PendingCapture {
            receiver,
            abandoned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Step;
    use crate::mock::MockSdk;
    use std::sync::Barrier;

    fn controller(sdk: MockSdk, busy_policy: BusyPolicy) -> Arc<CaptureController<MockSdk>> {
        let config = CaptureConfig {
            settle_delay: Duration::from_secs(0),
            busy_policy,
            ..CaptureConfig::default()
        };

        Arc::new(CaptureController::new(Arc::new(sdk), config))
    }

    #[test]
    fn default_config_matches_sdk_auto_selection() {
        let config = CaptureConfig::default();

        assert_eq!(config.device_name, SG_DEV_AUTO);
        assert_eq!(config.device_id, SG_DEV_AUTO);
        assert_eq!(config.settle_delay, Duration::from_secs(2));
        assert_eq!(config.busy_policy, BusyPolicy::Reject);
    }

    #[test]
    fn capture_returns_png() {
        let controller = controller(MockSdk::new(), BusyPolicy::Reject);
        let result = controller.capture().unwrap();

        assert!(result.png().starts_with(b"\x89PNG\r\n\x1a\n"));
        assert_eq!(result.device().serial, "MOCK0001");
        assert!(!controller.is_busy());
    }

    #[test]
    fn concurrent_request_is_rejected_while_busy() {
        let sdk = MockSdk::new().with_acquire_delay(Duration::from_millis(300));
        let controller = controller(sdk, BusyPolicy::Reject);

        let first = controller.spawn_capture();
        while controller.sdk().count(Step::Acquire) == 0 {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(controller.is_busy());

        let second = controller.capture_with_diagnostics();
        assert_eq!(second.result.unwrap_err(), CaptureError::DeviceBusy);
        assert!(second.states.is_empty());

        assert!(first.recv().unwrap().is_ok());
        assert_eq!(controller.sdk().count(Step::Create), 1);
        assert_eq!(controller.sdk().max_live_handles(), 1);
    }

    #[test]
    fn queued_requests_never_overlap() {
        let sdk = MockSdk::new().with_acquire_delay(Duration::from_millis(20));
        let controller = controller(sdk, BusyPolicy::Queue);
        let barrier = Arc::new(Barrier::new(4));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let controller = Arc::clone(&controller);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    controller.capture()
                })
            })
            .collect();

        for worker in workers {
            assert!(worker.join().unwrap().is_ok());
        }
        assert_eq!(controller.sdk().count(Step::Create), 4);
        assert_eq!(controller.sdk().count(Step::Terminate), 4);
        assert_eq!(controller.sdk().max_live_handles(), 1);
    }

    #[test]
    fn abandoned_capture_still_releases_device() {
        let sdk = MockSdk::new().with_acquire_delay(Duration::from_millis(200));
        let controller = controller(sdk, BusyPolicy::Reject);

        let receiver = controller.spawn_capture();
        while controller.sdk().count(Step::Acquire) == 0 {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(receiver.recv_timeout(Duration::from_millis(10)).is_err());
        drop(receiver);

        while controller.sdk().count(Step::Terminate) == 0 {
            thread::sleep(Duration::from_millis(5));
        }
        while controller.is_busy() {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(controller.sdk().live_handles(), 0);
        assert!(controller.capture().is_ok());
    }

    #[test]
    fn polling_busy_state_never_turns_a_request_away() {
        let controller = controller(MockSdk::new(), BusyPolicy::Reject);
        let done = Arc::new(AtomicBool::new(false));

        let poller = {
            let controller = Arc::clone(&controller);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    controller.is_busy();
                }
            })
        };

        for _ in 0..50 {
            assert!(controller.capture().is_ok());
        }
        done.store(true, Ordering::SeqCst);
        poller.join().unwrap();
        assert!(!controller.is_busy());
    }

    #[test]
    fn queued_capture_is_skipped_once_abandoned() {
        let sdk = MockSdk::new().with_acquire_delay(Duration::from_millis(200));
        let controller = controller(sdk, BusyPolicy::Queue);

        let first = controller.spawn_capture();
        while controller.sdk().count(Step::Acquire) == 0 {
            thread::sleep(Duration::from_millis(5));
        }
        drop(controller.spawn_capture());

        assert!(first.recv().unwrap().is_ok());
        thread::sleep(Duration::from_millis(100));
        while controller.is_busy() {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(controller.sdk().count(Step::Create), 1);
        assert_eq!(controller.sdk().count(Step::LedOn), 1);
    }
}
