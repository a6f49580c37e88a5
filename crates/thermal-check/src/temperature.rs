use std::fmt;

use bounded_retry::{retry, RetryPolicy};
use cloud_sdk::state::{HEAT_LEVEL_LEFT, HEAT_LEVEL_RIGHT};
use cloud_sdk::{DeviceState, Side, TelemetryReader};
use tracing::debug;

use crate::error::{CheckError, CheckResult};

const AMBIENT_C: f64 = 27.0;
const COOL_C_PER_LEVEL: f64 = 0.12;
const HEAT_C_PER_LEVEL: f64 = 0.18;

/// Raw levels the firmware reports while a side has no valid reading.
const SENTINELS: [f64; 2] = [-100.0, 100.0];

/// Converts a heat level to degrees Celsius with the piecewise-linear model of
/// the heating element: 0 is ambient, cooling and heating slopes differ.
pub fn convert_temp(level: f64) -> f64 {
    let celsius = if level < 0.0 {
        level * COOL_C_PER_LEVEL + AMBIENT_C
    } else if level > 0.0 {
        level * HEAT_C_PER_LEVEL + AMBIENT_C
    } else {
        AMBIENT_C
    };
    round2(celsius)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideTemperatures {
    pub left_c: f64,
    pub right_c: f64,
}

impl SideTemperatures {
    pub fn side(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.left_c,
            Side::Right => self.right_c,
        }
    }

    /// Reads both sides from a telemetry snapshot.
    pub fn from_state(state: &DeviceState) -> CheckResult<Self> {
        Ok(Self {
            left_c: side_celsius(state, Side::Left)?,
            right_c: side_celsius(state, Side::Right)?,
        })
    }
}

impl fmt::Display for SideTemperatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L {:.2}°C / R {:.2}°C", self.left_c, self.right_c)
    }
}

fn side_celsius(state: &DeviceState, side: Side) -> CheckResult<f64> {
    let field = match side {
        Side::Left => HEAT_LEVEL_LEFT,
        Side::Right => HEAT_LEVEL_RIGHT,
    };
    let level = state
        .heat_level(side)
        .ok_or(CheckError::MissingTelemetry(field))?;
    if SENTINELS.contains(&level) {
        return Err(CheckError::InvalidReading { side, level });
    }
    Ok(convert_temp(level))
}

/// Samples both sides, retrying sentinel readings and cloud failures.
pub async fn sample<R>(
    reader: &R,
    device_id: &str,
    policy: RetryPolicy,
) -> CheckResult<SideTemperatures>
where
    R: TelemetryReader + ?Sized,
{
    let temps = retry(policy, || async {
        let state = reader.device_state(device_id).await?;
        SideTemperatures::from_state(&state)
    })
    .await?;
    debug!(device_id, %temps, "sampled temperatures");
    Ok(temps)
}
