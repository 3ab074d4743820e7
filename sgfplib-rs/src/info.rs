use crate::errors::CaptureError;
use sgfplib_sys::SGDeviceInfoParam;

/// Largest width or height accepted from a device. Real sensors stay well below this;
/// anything larger means the device info is garbage.
pub const MAX_DIMENSION: u32 = 4096;

/// Device geometry and identity, read once per session right after the device is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: u32,
    pub serial: String,
    pub com_port: u32,
    pub com_speed: u32,
    pub width: u32,
    pub height: u32,
    pub contrast: u32,
    pub brightness: u32,
    pub gain: u32,
    pub dpi: u32,
    pub firmware_version: u32,
}

impl DeviceInfo {
    /// Image dimensions as `(width, height)`, rejecting zero and implausibly large values.
    pub fn geometry(&self) -> crate::Result<(u32, u32)> {
        let valid = |dimension: u32| dimension > 0 && dimension <= MAX_DIMENSION;

        if valid(self.width) && valid(self.height) {
            Ok((self.width, self.height))
        } else {
            Err(CaptureError::InvalidGeometry {
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Firmware version the way SecuGen tools print it, e.g. `0x00010203`.
    pub fn firmware(&self) -> String {
        format!("{:#010x}", self.firmware_version)
    }
}

impl From<&SGDeviceInfoParam> for DeviceInfo {
    fn from(raw: &SGDeviceInfoParam) -> Self {
        let serial_len = raw
            .DeviceSN
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or_else(|| raw.DeviceSN.len());

        DeviceInfo {
            device_id: raw.DeviceID,
            serial: String::from_utf8_lossy(&raw.DeviceSN[..serial_len]).into_owned(),
            com_port: raw.ComPort,
            com_speed: raw.ComSpeed,
            width: raw.ImageWidth,
            height: raw.ImageHeight,
            contrast: raw.Contrast,
            brightness: raw.Brightness,
            gain: raw.Gain,
            dpi: raw.ImageDPI,
            firmware_version: raw.FWVersion,
        }
    }
}
