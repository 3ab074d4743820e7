use crate::capture::CaptureResult;
use crate::controller::{CaptureConfig, CaptureOutcome};
use crate::errors::{CaptureError, Diagnostic, Status, Step};
use crate::frame::RawFrame;
use crate::info::DeviceInfo;
use crate::sdk::Sdk;
use chrono::Utc;
use log::{debug, error, warn};
use sgfplib_sys::{
    SGDeviceInfoParam, HSGFPM, SGFDX_ERROR_CREATION_FAILED, SGFDX_ERROR_FUNCTION_FAILED,
    SGFDX_ERROR_NONE,
};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::{mem, ptr, thread};

/// Where a session is in the capture sequence.
///
/// `Failed` absorbs any error before conversion; `Cleaned` is reached exactly once, after
/// teardown, from either `Converted` or `Failed`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SessionState {
    Unstarted,
    HandleCreated,
    Initialized,
    Opened,
    InfoQueried,
    Illuminated,
    Acquired,
    Converted,
    Failed(Step),
    Cleaned,
}

/// One create -> capture -> release cycle against a single SDK handle.
///
/// The handle is released by `teardown`, which the session runs itself on every path out
/// of `run`. `Drop` repeats it only if teardown never started, e.g. while unwinding.
pub(crate) struct Session<'a, S: Sdk + ?Sized> {
    sdk: &'a S,
    handle: HSGFPM,
    created: bool,
    released: bool,
    states: Vec<SessionState>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, S: Sdk + ?Sized> Session<'a, S> {
    fn new(sdk: &'a S) -> Self {
        Session {
            sdk,
            handle: ptr::null_mut(),
            created: false,
            released: false,
            states: vec![SessionState::Unstarted],
            diagnostics: Vec::new(),
        }
    }

    /// Runs a complete session. Panics raised by the SDK are turned into
    /// `CaptureError::Fault` once the handle has been released.
    pub(crate) fn run(sdk: &'a S, config: &CaptureConfig) -> CaptureOutcome {
        let mut session = Session::new(sdk);

        let result = match panic::catch_unwind(AssertUnwindSafe(|| session.capture(config))) {
            Ok(result) => result,
            Err(payload) => Err(CaptureError::Fault(panic_message(payload.as_ref()))),
        };

        if let Err(err) = &result {
            match err.code() {
                Some(code) => error!("{} failed with error code: {}", err.step(), code),
                None => error!("{} failed: {}", err.step(), err),
            }
            session.transition(SessionState::Failed(err.step()));
        }

        session.teardown();

        CaptureOutcome {
            result,
            diagnostics: mem::take(&mut session.diagnostics),
            states: mem::take(&mut session.states),
        }
    }

    fn capture(&mut self, config: &CaptureConfig) -> crate::Result<CaptureResult> {
        self.create()?;

        let status = self.sdk.init(self.handle, config.device_name);
        self.check(Step::Init, status, CaptureError::InitFailed)?;
        self.transition(SessionState::Initialized);

        let status = self.sdk.open_device(self.handle, config.device_id);
        self.check(Step::Open, status, CaptureError::OpenFailed)?;
        self.transition(SessionState::Opened);

        let mut raw = SGDeviceInfoParam::default();
        let status = self.sdk.get_device_info(self.handle, &mut raw);
        self.check(Step::InfoQuery, status, CaptureError::InfoQueryFailed)?;
        let info = DeviceInfo::from(&raw);
        debug!("Device info: {:?}", info);
        self.transition(SessionState::InfoQueried);

        let mut frame = RawFrame::allocate(&info)?;

        let status = self.sdk.set_led_on(self.handle, true);
        self.check(Step::LedOn, status, CaptureError::IlluminationFailed)?;
        self.transition(SessionState::Illuminated);

        if config.settle_delay > std::time::Duration::from_secs(0) {
            debug!("Waiting {:?} for finger placement", config.settle_delay);
            thread::sleep(config.settle_delay);
        }

        let status = self.sdk.get_image(self.handle, frame.as_mut_bytes());
        if status != SGFDX_ERROR_NONE {
            // The acquisition error wins; LED off here is best effort.
            self.best_effort(Step::LedOff, |sdk, handle| sdk.set_led_on(handle, false));
            return Err(CaptureError::AcquisitionFailed(status));
        }
        debug!("{} succeeded.", Step::Acquire);
        self.transition(SessionState::Acquired);

        self.best_effort(Step::LedOff, |sdk, handle| sdk.set_led_on(handle, false));

        let png = frame.encode_png()?;
        self.transition(SessionState::Converted);

        Ok(CaptureResult::new(png, info, Utc::now()))
    }

    fn create(&mut self) -> crate::Result<()> {
        let mut handle: HSGFPM = ptr::null_mut();
        let status = self.sdk.create(&mut handle);
        if status != SGFDX_ERROR_NONE {
            return Err(CaptureError::HandleCreationFailed(status));
        }
        if handle.is_null() {
            return Err(CaptureError::HandleCreationFailed(SGFDX_ERROR_CREATION_FAILED));
        }

        self.handle = handle;
        self.created = true;
        debug!("{} succeeded.", Step::Create);
        self.transition(SessionState::HandleCreated);

        Ok(())
    }

    fn check(
        &self,
        step: Step,
        status: Status,
        error: fn(Status) -> CaptureError,
    ) -> crate::Result<()> {
        if status == SGFDX_ERROR_NONE {
            debug!("{} succeeded.", step);
            Ok(())
        } else {
            Err(error(status))
        }
    }

    fn best_effort(&mut self, step: Step, call: impl FnOnce(&S, HSGFPM) -> Status) {
        let status = call(self.sdk, self.handle);
        if status == SGFDX_ERROR_NONE {
            debug!("{} succeeded.", step);
        } else {
            warn!("{} failed with error code: {}", step, status);
            self.diagnostics.push(Diagnostic { step, code: status });
        }
    }

    fn transition(&mut self, state: SessionState) {
        self.states.push(state);
    }

    /// Closes the device and terminates the handle, once. Close is attempted even when
    /// the device was never opened; the SDK reports that as an ordinary error code.
    ///
    /// A panic in either call is recorded as a diagnostic and never skips terminate.
    fn teardown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if self.created {
            self.release(Step::Close, |sdk, handle| sdk.close_device(handle));
            self.release(Step::Terminate, |sdk, handle| sdk.terminate(handle));
            self.handle = ptr::null_mut();
        }
        self.transition(SessionState::Cleaned);
    }

    fn release(&mut self, step: Step, call: impl FnOnce(&S, HSGFPM) -> Status) {
        let (sdk, handle) = (self.sdk, self.handle);
        match panic::catch_unwind(AssertUnwindSafe(|| call(sdk, handle))) {
            Ok(status) => self.best_effort(step, |_, _| status),
            Err(payload) => {
                warn!("{} faulted: {}", step, panic_message(payload.as_ref()));
                self.diagnostics.push(Diagnostic {
                    step,
                    code: SGFDX_ERROR_FUNCTION_FAILED,
                });
            }
        }
    }
}

impl<S: Sdk + ?Sized> Drop for Session<'_, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
