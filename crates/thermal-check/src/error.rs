use cloud_sdk::{CloudError, Side};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Cloud(#[from] CloudError),
    #[error("device {device_id} not ready: {reason}")]
    DeviceNotReady { device_id: String, reason: String },
    #[error("{side} heat level reads sentinel {level}")]
    InvalidReading { side: Side, level: f64 },
    #[error("telemetry field {0} missing or not a number")]
    MissingTelemetry(&'static str),
}

pub type CheckResult<T> = Result<T, CheckError>;
