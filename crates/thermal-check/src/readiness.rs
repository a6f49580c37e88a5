use std::time::Duration;

use bounded_retry::{retry, RetryPolicy};
use cloud_sdk::{DeviceState, TelemetryReader};
use time::OffsetDateTime;
use tracing::info;

use crate::error::{CheckError, CheckResult};

/// Why a snapshot does not count as ready, or `None` when it does.
///
/// The device must have reported within `window` of `now` and run exactly
/// `required_firmware`.
pub fn not_ready_reason(
    state: &DeviceState,
    now: OffsetDateTime,
    window: Duration,
    required_firmware: &str,
) -> Option<String> {
    let Some(last_heard) = state.last_heard() else {
        return Some("no lastHeard in telemetry".to_string());
    };
    if now - last_heard > window {
        return Some(format!("last heard at {last_heard}"));
    }
    match state.firmware_version() {
        Some(version) if version == required_firmware => None,
        Some(version) => Some(format!(
            "firmware {version}, expected {required_firmware}"
        )),
        None => Some("no firmwareVersion in telemetry".to_string()),
    }
}

/// Polls telemetry until the device is ready or `policy` runs out, in which
/// case the last failure is returned, normally [`CheckError::DeviceNotReady`].
pub async fn await_ready<R>(
    reader: &R,
    device_id: &str,
    required_firmware: &str,
    window: Duration,
    policy: RetryPolicy,
) -> CheckResult<()>
where
    R: TelemetryReader + ?Sized,
{
    retry(policy, || async {
        let state = reader.device_state(device_id).await?;
        match not_ready_reason(&state, OffsetDateTime::now_utc(), window, required_firmware) {
            None => Ok(()),
            Some(reason) => Err(CheckError::DeviceNotReady {
                device_id: device_id.to_string(),
                reason,
            }),
        }
    })
    .await?;
    info!(device_id, "device ready");
    Ok(())
}
