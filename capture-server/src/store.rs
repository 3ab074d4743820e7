use log::debug;
use sgfplib_rs::CaptureResult;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Subdirectory of the static root holding captures, also the prefix of `image_path`.
pub const FINGERPRINTS_DIR: &str = "fingerprints";

/// Captured images on disk, under `<static root>/fingerprints`.
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    dir: PathBuf,
}

impl FingerprintStore {
    /// Creates the storage directory if needed.
    pub fn open(static_dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = static_dir.as_ref().join(FINGERPRINTS_DIR);
        fs::create_dir_all(&dir)?;

        Ok(FingerprintStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the PNG and returns its path relative to the static root, e.g.
    /// `fingerprints/fingerprint_1700000000.png`. A capture within the same second as
    /// an earlier one replaces it.
    pub fn save(&self, capture: &CaptureResult) -> io::Result<String> {
        let file_name = capture.file_name();
        let path = self.dir.join(&file_name);
        fs::write(&path, capture.png())?;
        debug!("Fingerprint image saved at {}", path.display());

        Ok(format!("{}/{}", FINGERPRINTS_DIR, file_name))
    }

    /// Reads a stored capture by file name. Names that could escape the storage
    /// directory are treated as missing.
    pub fn load(&self, file_name: &str) -> io::Result<Option<Vec<u8>>> {
        if !is_capture_name(file_name) {
            return Ok(None);
        }

        match fs::read(self.dir.join(file_name)) {
            Ok(data) => Ok(Some(data)),
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn is_capture_name(name: &str) -> bool {
    name.ends_with(".png")
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}
