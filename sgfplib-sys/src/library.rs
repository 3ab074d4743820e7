use crate::bindings::*;
use failure::Fail;
use libloading::Library;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Fail)]
pub enum LoadError {
    #[fail(display = "sgfplib not found at path: {}", _0)]
    NotFound(String),
    #[fail(display = "Failed to load sgfplib from {}: {}", path, reason)]
    Library { path: String, reason: String },
    #[fail(display = "Entry point `{}` not exported by sgfplib: {}", symbol, reason)]
    Symbol { symbol: String, reason: String },
}

/// The FDx SDK loaded at runtime, with every entry point the capture flow needs resolved
/// up front. A library missing any of them is rejected by `Sgfplib::open`.
pub struct Sgfplib {
    create: SGFPM_Create,
    init: SGFPM_Init,
    open_device: SGFPM_OpenDevice,
    get_device_info: SGFPM_GetDeviceInfo,
    set_led_on: SGFPM_SetLedOn,
    get_image: SGFPM_GetImage,
    close_device: SGFPM_CloseDevice,
    terminate: SGFPM_Terminate,
    path: PathBuf,
    // Keeps the function pointers above valid.
    _library: Library,
}

impl Sgfplib {
    /// Platform file name of the SDK library, used when no explicit path is configured.
    pub fn default_path() -> &'static str {
        if cfg!(windows) {
            "sgfplib.dll"
        } else if cfg!(target_os = "macos") {
            "libsgfplib.dylib"
        } else {
            "libsgfplib.so"
        }
    }

    /// Loads the SDK from `path` and resolves its entry points.
    ///
    /// A bare file name (no directory component) is handed to the platform loader as is,
    /// so the usual library search path applies. Anything else must exist on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let is_bare_name = path.parent().map_or(true, |p| p.as_os_str().is_empty());
        if !is_bare_name && !path.exists() {
            return Err(LoadError::NotFound(path.display().to_string()));
        }

        let library = unsafe { Library::new(path) }.map_err(|e| LoadError::Library {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        unsafe {
            Ok(Sgfplib {
                create: symbol(&library, b"SGFPM_Create\0")?,
                init: symbol(&library, b"SGFPM_Init\0")?,
                open_device: symbol(&library, b"SGFPM_OpenDevice\0")?,
                get_device_info: symbol(&library, b"SGFPM_GetDeviceInfo\0")?,
                set_led_on: symbol(&library, b"SGFPM_SetLedOn\0")?,
                get_image: symbol(&library, b"SGFPM_GetImage\0")?,
                close_device: symbol(&library, b"SGFPM_CloseDevice\0")?,
                terminate: symbol(&library, b"SGFPM_Terminate\0")?,
                path: path.to_path_buf(),
                _library: library,
            })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub unsafe fn create(&self, handle: *mut HSGFPM) -> DWORD {
        (self.create)(handle)
    }

    pub unsafe fn init(&self, handle: HSGFPM, device_name: DWORD) -> DWORD {
        (self.init)(handle, device_name)
    }

    pub unsafe fn open_device(&self, handle: HSGFPM, device_id: DWORD) -> DWORD {
        (self.open_device)(handle, device_id)
    }

    pub unsafe fn get_device_info(&self, handle: HSGFPM, info: *mut SGDeviceInfoParam) -> DWORD {
        (self.get_device_info)(handle, info)
    }

    pub unsafe fn set_led_on(&self, handle: HSGFPM, on: bool) -> DWORD {
        (self.set_led_on)(handle, on)
    }

    /// `buffer` must hold at least `ImageWidth * ImageHeight` bytes as reported by
    /// `get_device_info` for the same handle.
    pub unsafe fn get_image(&self, handle: HSGFPM, buffer: *mut BYTE) -> DWORD {
        (self.get_image)(handle, buffer)
    }

    pub unsafe fn close_device(&self, handle: HSGFPM) -> DWORD {
        (self.close_device)(handle)
    }

    pub unsafe fn terminate(&self, handle: HSGFPM) -> DWORD {
        (self.terminate)(handle)
    }
}

impl fmt::Debug for Sgfplib {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.debug_struct("Sgfplib").field("path", &self.path).finish()
    }
}

unsafe fn symbol<T: Copy>(library: &Library, name: &'static [u8]) -> Result<T, LoadError> {
    library
        .get::<T>(name)
        .map(|symbol| *symbol)
        .map_err(|e| LoadError::Symbol {
            symbol: String::from_utf8_lossy(&name[..name.len() - 1]).into_owned(),
            reason: e.to_string(),
        })
}
