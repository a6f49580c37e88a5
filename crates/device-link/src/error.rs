use std::io;
use std::time::Duration;

use thiserror::Error;

pub type DeviceResult<T> = Result<T, DeviceError>;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("transport error talking to {addr}: {source}")]
    Transport {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("timed out after {timeout:?} during {stage} with {addr}")]
    Timeout {
        addr: String,
        stage: &'static str,
        timeout: Duration,
    },
    #[error("invalid response at `{path}`: {reason}")]
    Decode {
        raw: String,
        path: String,
        reason: String,
    },
    #[error("device rejected `{request}` with result code {code}")]
    Protocol { request: &'static str, code: i64 },
    #[error("network `{0}` not found in scan results")]
    NetworkNotFound(String),
    #[error("device public key unusable: {0}")]
    Key(String),
    #[error("encryption error: {0}")]
    Encryption(String),
    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl DeviceError {
    /// Transport and timeout failures are worth another connection attempt;
    /// everything else is a statement from (or about) the device.
    pub fn is_transient(&self) -> bool {
        matches!(self, DeviceError::Transport { .. } | DeviceError::Timeout { .. })
    }
}
