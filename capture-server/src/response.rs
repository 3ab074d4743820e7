use serde::{Deserialize, Serialize};

pub const CAPTURE_FAILED: &str = "An error occurred during fingerprint capture.";
pub const DEVICE_BUSY: &str = "The fingerprint scanner is busy with another capture.";
pub const CAPTURE_TIMED_OUT: &str = "Timed out waiting for a fingerprint.";
pub const NOT_FOUND: &str = "Not found.";
pub const METHOD_NOT_ALLOWED: &str = "Method not allowed.";
pub const INTERNAL_ERROR: &str = "Internal server error.";

/// JSON body of every `/capture` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CaptureResponse {
    Success {
        /// Base64-encoded PNG.
        image: String,
        image_path: String,
    },
    Error {
        message: String,
    },
}

impl CaptureResponse {
    pub fn error(message: &str) -> Self {
        CaptureResponse::Error {
            message: message.to_owned(),
        }
    }
}
