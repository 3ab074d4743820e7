#![warn(clippy::all)]

mod capture;
mod controller;
mod errors;
mod frame;
mod info;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod sdk;
mod session;

pub use crate::{
    capture::*, controller::*, errors::*, frame::*, info::*, sdk::*, session::SessionState,
};
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::*;
pub use sgfplib_sys::{LoadError, Sgfplib, SG_DEV_AUTO, USB_AUTO_DETECT};

pub type Result<T> = std::result::Result<T, CaptureError>;

/// Loads the FDx SDK from `path`, or from the platform default name when `None`.
///
/// The library is resolved once at start-up; a missing file or entry point is reported
/// here rather than on the first capture.
pub fn load(path: Option<&std::path::Path>) -> std::result::Result<Sgfplib, LoadError> {
    match path {
        Some(path) => Sgfplib::open(path),
        None => Sgfplib::open(Sgfplib::default_path()),
    }
}
