use crate::info::DeviceInfo;
use chrono::{DateTime, Utc};

/// A successfully captured fingerprint, PNG-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    png: Vec<u8>,
    width: u32,
    height: u32,
    device: DeviceInfo,
    captured_at: DateTime<Utc>,
}

impl CaptureResult {
    pub(crate) fn new(png: Vec<u8>, device: DeviceInfo, captured_at: DateTime<Utc>) -> Self {
        CaptureResult {
            png,
            width: device.width,
            height: device.height,
            device,
            captured_at,
        }
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn into_png(self) -> Vec<u8> {
        self.png
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// `fingerprint_<unix seconds>`, the name captures are persisted under.
    pub fn id(&self) -> String {
        format!("fingerprint_{}", self.captured_at.timestamp())
    }

    pub fn file_name(&self) -> String {
        format!("{}.png", self.id())
    }
}
