use failure::Fail;
use sgfplib_rs::{BusyPolicy, CaptureConfig};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:5000";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Fail, PartialEq, Eq)]
pub enum ConfigError {
    #[fail(display = "Invalid value `{}` for {}: {}", value, key, reason)]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Start-up settings, read once from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `SGFPLIB_PATH`; the platform library name is used when unset.
    pub library_path: Option<PathBuf>,
    /// `FPCAPTURE_ADDR`
    pub address: String,
    /// `FPCAPTURE_STATIC_DIR`; captures go to its `fingerprints` subdirectory.
    pub static_dir: PathBuf,
    /// `FPCAPTURE_TIMEOUT_SECS`: how long a request waits for a capture before giving up.
    pub request_timeout: Duration,
    /// `FPCAPTURE_SETTLE_MS` and `FPCAPTURE_BUSY_POLICY` (`reject` or `queue`).
    pub capture: CaptureConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            library_path: None,
            address: DEFAULT_ADDRESS.to_owned(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            capture: CaptureConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = get("SGFPLIB_PATH") {
            config.library_path = Some(PathBuf::from(path));
        }
        if let Some(address) = get("FPCAPTURE_ADDR") {
            config.address = address;
        }
        if let Some(dir) = get("FPCAPTURE_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(value) = get("FPCAPTURE_TIMEOUT_SECS") {
            let secs: u64 = parse("FPCAPTURE_TIMEOUT_SECS", &value)?;
            if secs == 0 {
                return Err(invalid("FPCAPTURE_TIMEOUT_SECS", &value, "must be positive"));
            }
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(value) = get("FPCAPTURE_SETTLE_MS") {
            config.capture.settle_delay =
                Duration::from_millis(parse("FPCAPTURE_SETTLE_MS", &value)?);
        }
        if let Some(value) = get("FPCAPTURE_BUSY_POLICY") {
            config.capture.busy_policy = match value.trim().to_ascii_lowercase().as_str() {
                "reject" => BusyPolicy::Reject,
                "queue" => BusyPolicy::Queue,
                _ => {
                    return Err(invalid(
                        "FPCAPTURE_BUSY_POLICY",
                        &value,
                        "expected `reject` or `queue`",
                    ))
                }
            };
        }

        Ok(config)
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_owned(),
        reason: reason.to_owned(),
    }
}
