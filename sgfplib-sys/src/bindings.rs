//! Declarations mirroring `sgfplib.h` from the SecuGen FDx SDK Pro.

#![allow(non_upper_case_globals, non_camel_case_types, non_snake_case)]

use libc::{c_uchar, c_void};

pub type DWORD = u32;
pub type BYTE = c_uchar;

/// Opaque handle to an `SGFPM` object.
pub type HSGFPM = *mut c_void;

pub const SGDEV_SN_LEN: usize = 15;

pub const SGFDX_ERROR_NONE: DWORD = 0;
pub const SGFDX_ERROR_CREATION_FAILED: DWORD = 1;
pub const SGFDX_ERROR_FUNCTION_FAILED: DWORD = 2;
pub const SGFDX_ERROR_INVALID_PARAM: DWORD = 3;
pub const SGFDX_ERROR_NOT_USED: DWORD = 4;
pub const SGFDX_ERROR_DLLLOAD_FAILED: DWORD = 5;
pub const SGFDX_ERROR_DLLLOAD_FAILED_DRV: DWORD = 6;
pub const SGFDX_ERROR_DLLLOAD_FAILED_ALGO: DWORD = 7;
pub const SGFDX_ERROR_SYSLOAD_FAILED: DWORD = 51;
pub const SGFDX_ERROR_INITIALIZE_FAILED: DWORD = 52;
pub const SGFDX_ERROR_LINE_DROPPED: DWORD = 53;
pub const SGFDX_ERROR_TIME_OUT: DWORD = 54;
pub const SGFDX_ERROR_DEVICE_NOT_FOUND: DWORD = 55;
pub const SGFDX_ERROR_DRVLOAD_FAILED: DWORD = 56;
pub const SGFDX_ERROR_WRONG_IMAGE: DWORD = 57;
pub const SGFDX_ERROR_LACK_OF_BANDWIDTH: DWORD = 58;
pub const SGFDX_ERROR_DEV_ALREADY_OPEN: DWORD = 59;
pub const SGFDX_ERROR_GETSN_FAILED: DWORD = 60;
pub const SGFDX_ERROR_UNSUPPORTED_DEV: DWORD = 61;

/// Let the SDK pick the device class (for `SGFPM_Init`) or device (for `SGFPM_OpenDevice`).
pub const SG_DEV_AUTO: DWORD = 0xFF;
pub const USB_AUTO_DETECT: DWORD = 0x3BC + 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SGDeviceInfoParam {
    pub DeviceID: DWORD,
    pub DeviceSN: [BYTE; SGDEV_SN_LEN + 1],
    pub ComPort: DWORD,
    pub ComSpeed: DWORD,
    pub ImageWidth: DWORD,
    pub ImageHeight: DWORD,
    pub Contrast: DWORD,
    pub Brightness: DWORD,
    pub Gain: DWORD,
    pub ImageDPI: DWORD,
    pub FWVersion: DWORD,
}

pub type SGFPM_Create = unsafe extern "system" fn(phFpm: *mut HSGFPM) -> DWORD;
pub type SGFPM_Init = unsafe extern "system" fn(hFpm: HSGFPM, devName: DWORD) -> DWORD;
pub type SGFPM_OpenDevice = unsafe extern "system" fn(hFpm: HSGFPM, devId: DWORD) -> DWORD;
pub type SGFPM_GetDeviceInfo =
    unsafe extern "system" fn(hFpm: HSGFPM, pInfo: *mut SGDeviceInfoParam) -> DWORD;
pub type SGFPM_SetLedOn = unsafe extern "system" fn(hFpm: HSGFPM, on: bool) -> DWORD;
pub type SGFPM_GetImage = unsafe extern "system" fn(hFpm: HSGFPM, buffer: *mut BYTE) -> DWORD;
pub type SGFPM_CloseDevice = unsafe extern "system" fn(hFpm: HSGFPM) -> DWORD;
pub type SGFPM_Terminate = unsafe extern "system" fn(hFpm: HSGFPM) -> DWORD;

// 10 DWORDs plus the 16-byte serial.
const _: [(); 56] = [(); std::mem::size_of::<SGDeviceInfoParam>()];
