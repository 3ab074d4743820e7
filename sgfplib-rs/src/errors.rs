use failure::Fail;
use std::fmt;

/// Native status code returned by every SDK entry point. `0` is success.
pub type Status = sgfplib_sys::DWORD;

/// A point in the capture sequence. Errors and diagnostics are tagged with the step
/// they originated from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Step {
    Create,
    Init,
    Open,
    InfoQuery,
    Geometry,
    LedOn,
    Acquire,
    LedOff,
    Convert,
    Close,
    Terminate,
    Session,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let string = match self {
            Step::Create => "SGFPM_Create",
            Step::Init => "SGFPM_Init",
            Step::Open => "SGFPM_OpenDevice",
            Step::InfoQuery => "SGFPM_GetDeviceInfo",
            Step::Geometry => "geometry check",
            Step::LedOn => "SGFPM_SetLedOn (on)",
            Step::Acquire => "SGFPM_GetImage",
            Step::LedOff => "SGFPM_SetLedOn (off)",
            Step::Convert => "image conversion",
            Step::Close => "SGFPM_CloseDevice",
            Step::Terminate => "SGFPM_Terminate",
            Step::Session => "capture session",
        };

        write!(f, "{}", string)
    }
}

#[derive(Debug, Fail, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[fail(display = "SGFPM_Create failed with error code: {}", _0)]
    HandleCreationFailed(Status),
    #[fail(display = "SGFPM_Init failed with error code: {}", _0)]
    InitFailed(Status),
    #[fail(display = "SGFPM_OpenDevice failed with error code: {}", _0)]
    OpenFailed(Status),
    #[fail(display = "SGFPM_GetDeviceInfo failed with error code: {}", _0)]
    InfoQueryFailed(Status),
    #[fail(
        display = "Device reported unusable image geometry {}x{}",
        width, height
    )]
    InvalidGeometry { width: u32, height: u32 },
    #[fail(display = "SGFPM_SetLedOn failed with error code: {}", _0)]
    IlluminationFailed(Status),
    #[fail(display = "SGFPM_GetImage failed with error code: {}", _0)]
    AcquisitionFailed(Status),
    #[fail(
        display = "Raw frame holds {} bytes, geometry requires {}",
        actual, expected
    )]
    BufferSizeMismatch { expected: usize, actual: usize },
    #[fail(display = "Can not encode captured frame: {}", _0)]
    ConversionFailed(String),
    #[fail(display = "Fingerprint device is in use by another capture")]
    DeviceBusy,
    #[fail(display = "Capture session aborted unexpectedly: {}", _0)]
    Fault(String),
}

impl CaptureError {
    /// The step the failure originated from.
    pub fn step(&self) -> Step {
        match self {
            CaptureError::HandleCreationFailed(_) => Step::Create,
            CaptureError::InitFailed(_) => Step::Init,
            CaptureError::OpenFailed(_) => Step::Open,
            CaptureError::InfoQueryFailed(_) => Step::InfoQuery,
            CaptureError::InvalidGeometry { .. } => Step::Geometry,
            CaptureError::IlluminationFailed(_) => Step::LedOn,
            CaptureError::AcquisitionFailed(_) => Step::Acquire,
            CaptureError::BufferSizeMismatch { .. } | CaptureError::ConversionFailed(_) => {
                Step::Convert
            }
            CaptureError::DeviceBusy | CaptureError::Fault(_) => Step::Session,
        }
    }

    /// Native status code, when the failure came from an SDK call.
    pub fn code(&self) -> Option<Status> {
        match *self {
            CaptureError::HandleCreationFailed(code)
            | CaptureError::InitFailed(code)
            | CaptureError::OpenFailed(code)
            | CaptureError::InfoQueryFailed(code)
            | CaptureError::IlluminationFailed(code)
            | CaptureError::AcquisitionFailed(code) => Some(code),
            _ => None,
        }
    }
}

/// A failed best-effort call (LED off, close, terminate). Logged and reported alongside
/// the capture outcome, never in place of it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Diagnostic {
    pub step: Step,
    pub code: Status,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{} failed with error code: {}", self.step, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_failures_carry_step_and_code() {
        let err = CaptureError::OpenFailed(5);

        assert_eq!(err.step(), Step::Open);
        assert_eq!(err.code(), Some(5));
        assert_eq!(
            err.to_string(),
            "SGFPM_OpenDevice failed with error code: 5"
        );
    }

    #[test]
    fn local_failures_have_no_native_code() {
        let geometry = CaptureError::InvalidGeometry {
            width: 0,
            height: 400,
        };
        let mismatch = CaptureError::BufferSizeMismatch {
            expected: 120_000,
            actual: 119_999,
        };

        assert_eq!(geometry.step(), Step::Geometry);
        assert_eq!(geometry.code(), None);
        assert_eq!(mismatch.step(), Step::Convert);
        assert_eq!(mismatch.code(), None);
        assert_eq!(CaptureError::DeviceBusy.step(), Step::Session);
    }
}
