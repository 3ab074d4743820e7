//! Scripted SDK for exercising capture sessions without a scanner attached.

use crate::errors::{Status, Step};
use crate::sdk::Sdk;
use std::ffi::c_void;
use sgfplib_sys::{SGDeviceInfoParam, HSGFPM, SGFDX_ERROR_NONE, SG_DEV_AUTO};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// A native call as observed by `MockSdk`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Call {
    Create,
    Init(Status),
    OpenDevice(Status),
    GetDeviceInfo,
    SetLedOn(bool),
    /// Carries the length of the buffer handed to the SDK.
    GetImage(usize),
    CloseDevice,
    Terminate,
}

impl Call {
    pub fn step(&self) -> Step {
        match self {
            Call::Create => Step::Create,
            Call::Init(_) => Step::Init,
            Call::OpenDevice(_) => Step::Open,
            Call::GetDeviceInfo => Step::InfoQuery,
            Call::SetLedOn(true) => Step::LedOn,
            Call::SetLedOn(false) => Step::LedOff,
            Call::GetImage(_) => Step::Acquire,
            Call::CloseDevice => Step::Close,
            Call::Terminate => Step::Terminate,
        }
    }
}

type Fill = Box<dyn Fn(usize) -> u8 + Send + Sync>;

/// In-process stand-in for `Sgfplib`.
///
/// Reports a 300x400 device by default and fills frames with a repeating ramp. Individual
/// calls can be scripted to fail with a status code, or to panic.
pub struct MockSdk {
    info: SGDeviceInfoParam,
    failures: HashMap<Step, Status>,
    panic_at: Option<Step>,
    null_handle: bool,
    fill: Fill,
    acquire_delay: Duration,
    calls: Mutex<Vec<Call>>,
    next_handle: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

impl Default for MockSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSdk {
    pub fn new() -> Self {
        let mut info = SGDeviceInfoParam {
            DeviceID: SG_DEV_AUTO,
            ComPort: 0,
            ComSpeed: 0,
            ImageWidth: 300,
            ImageHeight: 400,
            Contrast: 30,
            Brightness: 50,
            Gain: 1,
            ImageDPI: 500,
            FWVersion: 0x0103,
            ..Default::default()
        };
        info.DeviceSN[..8].copy_from_slice(b"MOCK0001");

        MockSdk {
            info,
            failures: HashMap::new(),
            panic_at: None,
            null_handle: false,
            fill: Box::new(|i| (i % 251) as u8),
            acquire_delay: Duration::from_secs(0),
            calls: Mutex::new(Vec::new()),
            next_handle: AtomicUsize::new(1),
            live: AtomicUsize::new(0),
            max_live: AtomicUsize::new(0),
        }
    }

    pub fn with_geometry(mut self, width: u32, height: u32) -> Self {
        self.info.ImageWidth = width;
        self.info.ImageHeight = height;
        self
    }

    /// Makes the call belonging to `step` return `code`.
    pub fn failing(mut self, step: Step, code: Status) -> Self {
        self.failures.insert(step, code);
        self
    }

    pub fn panicking_at(mut self, step: Step) -> Self {
        self.panic_at = Some(step);
        self
    }

    /// `SGFPM_Create` reports success but leaves the handle null.
    pub fn with_null_handle(mut self) -> Self {
        self.null_handle = true;
        self
    }

    /// Pixel value for each byte offset of an acquired frame.
    pub fn with_fill(mut self, fill: impl Fn(usize) -> u8 + Send + Sync + 'static) -> Self {
        self.fill = Box::new(fill);
        self
    }

    /// How long `get_image` blocks, standing in for the wait on a finger.
    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls made for `step`.
    pub fn count(&self, step: Step) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.step() == step)
            .count()
    }

    /// Handles created and not yet terminated.
    pub fn live_handles(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live handles seen so far.
    pub fn max_live_handles(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) -> Status {
        self.calls.lock().unwrap().push(call);

        let step = call.step();
        if self.panic_at == Some(step) {
            panic!("{} crashed", step);
        }

        self.failures
            .get(&step)
            .copied()
            .unwrap_or(SGFDX_ERROR_NONE)
    }
}

impl Sdk for MockSdk {
    fn create(&self, handle: &mut HSGFPM) -> Status {
        let status = self.record(Call::Create);
        if status != SGFDX_ERROR_NONE || self.null_handle {
            return status;
        }

        let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
        *handle = id as *mut c_void;
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);

        status
    }

    fn init(&self, _handle: HSGFPM, device_name: Status) -> Status {
        self.record(Call::Init(device_name))
    }

    fn open_device(&self, _handle: HSGFPM, device_id: Status) -> Status {
        self.record(Call::OpenDevice(device_id))
    }

    fn get_device_info(&self, _handle: HSGFPM, info: &mut SGDeviceInfoParam) -> Status {
        let status = self.record(Call::GetDeviceInfo);
        if status == SGFDX_ERROR_NONE {
            *info = self.info;
        }
        status
    }

    fn set_led_on(&self, _handle: HSGFPM, on: bool) -> Status {
        self.record(Call::SetLedOn(on))
    }

    fn get_image(&self, _handle: HSGFPM, buffer: &mut [u8]) -> Status {
        let status = self.record(Call::GetImage(buffer.len()));
        if !self.acquire_delay.is_zero() {
            thread::sleep(self.acquire_delay);
        }
        if status == SGFDX_ERROR_NONE {
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = (self.fill)(i);
            }
        }
        status
    }

    fn close_device(&self, _handle: HSGFPM) -> Status {
        self.record(Call::CloseDevice)
    }

    fn terminate(&self, _handle: HSGFPM) -> Status {
        let status = self.record(Call::Terminate);
        self.live.fetch_sub(1, Ordering::SeqCst);
        status
    }
}
