use crate::errors::Status;
use sgfplib_sys::{SGDeviceInfoParam, Sgfplib, HSGFPM};

/// The slice of the FDx SDK a capture session drives, one method per native entry point.
///
/// Every method returns the raw native status; interpreting it belongs to the session.
/// `Sgfplib` is the production implementation, `MockSdk` (feature `mock`) the scripted one.
pub trait Sdk: Send + Sync {
    fn create(&self, handle: &mut HSGFPM) -> Status;

    fn init(&self, handle: HSGFPM, device_name: Status) -> Status;

    fn open_device(&self, handle: HSGFPM, device_id: Status) -> Status;

    fn get_device_info(&self, handle: HSGFPM, info: &mut SGDeviceInfoParam) -> Status;

    fn set_led_on(&self, handle: HSGFPM, on: bool) -> Status;

    /// Fills `buffer` with one 8-bit grayscale frame. Blocks until the device delivers
    /// the image or gives up on its own; there is no way to interrupt it.
    fn get_image(&self, handle: HSGFPM, buffer: &mut [u8]) -> Status;

    fn close_device(&self, handle: HSGFPM) -> Status;

    fn terminate(&self, handle: HSGFPM) -> Status;
}

// The session only ever passes a handle obtained from `create` on the same library, and
// sizes the image buffer from `get_device_info` for that handle.
impl Sdk for Sgfplib {
    fn create(&self, handle: &mut HSGFPM) -> Status {
        unsafe { Sgfplib::create(self, handle) }
    }

    fn init(&self, handle: HSGFPM, device_name: Status) -> Status {
        unsafe { Sgfplib::init(self, handle, device_name) }
    }

    fn open_device(&self, handle: HSGFPM, device_id: Status) -> Status {
        unsafe { Sgfplib::open_device(self, handle, device_id) }
    }

    fn get_device_info(&self, handle: HSGFPM, info: &mut SGDeviceInfoParam) -> Status {
        unsafe { Sgfplib::get_device_info(self, handle, info) }
    }

    fn set_led_on(&self, handle: HSGFPM, on: bool) -> Status {
        unsafe { Sgfplib::set_led_on(self, handle, on) }
    }

    fn get_image(&self, handle: HSGFPM, buffer: &mut [u8]) -> Status {
        unsafe { Sgfplib::get_image(self, handle, buffer.as_mut_ptr()) }
    }

    fn close_device(&self, handle: HSGFPM) -> Status {
        unsafe { Sgfplib::close_device(self, handle) }
    }

    fn terminate(&self, handle: HSGFPM) -> Status {
        unsafe { Sgfplib::terminate(self, handle) }
    }
}
