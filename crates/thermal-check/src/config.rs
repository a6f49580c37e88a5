use std::time::Duration;

use bounded_retry::RetryPolicy;

/// Minimum temperature change, in °C, each leg must produce on each side.
pub const MIN_DELTA_C: f64 = 2.0;

/// Pass band for a single temperature delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaThresholds {
    /// Inclusive lower bound.
    pub min_c: f64,
    /// Inclusive upper bound, unchecked when `None`.
    pub max_c: Option<f64>,
}

impl Default for DeltaThresholds {
    fn default() -> Self {
        Self {
            min_c: MIN_DELTA_C,
            max_c: None,
        }
    }
}

impl DeltaThresholds {
    pub fn accepts(&self, delta_c: f64) -> bool {
        delta_c >= self.min_c && self.max_c.map_or(true, |max| delta_c <= max)
    }
}

/// Timing, retry budgets and thresholds of one thermal check.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalTestConfig {
    /// Firmware version the device must report before testing.
    pub required_firmware: String,
    pub thresholds: DeltaThresholds,

    /// How long to wait for the device to report in.
    pub ready_timeout: Duration,
    pub ready_poll: Duration,
    /// Telemetry older than this does not count as the device being online.
    pub last_heard_window: Duration,

    pub prime_settle: Duration,
    pub reset_settle: Duration,

    /// Offset between now and the first event of every posted schedule.
    pub schedule_lead: Duration,
    pub schedule_retry: RetryPolicy,
    pub sample_retry: RetryPolicy,

    pub heat_leg: Duration,
    pub cool_leg: Duration,
    /// Wait after posting the burst before the post-heat sample.
    pub heat_wait: Duration,
    /// Wait after the post-heat sample before the post-cool sample.
    pub cool_wait: Duration,

    /// Budget for whole attempts.
    pub outer_retry: RetryPolicy,
}

impl ThermalTestConfig {
    pub fn new(required_firmware: impl Into<String>) -> Self {
        Self {
            required_firmware: required_firmware.into(),
            thresholds: DeltaThresholds::default(),
            ready_timeout: Duration::from_secs(120),
            ready_poll: Duration::from_secs(1),
            last_heard_window: Duration::from_secs(120),
            prime_settle: Duration::from_secs(120),
            reset_settle: Duration::from_millis(200),
            schedule_lead: Duration::from_secs(2),
            schedule_retry: RetryPolicy::attempts(3),
            sample_retry: RetryPolicy::attempts(8).with_sleep(Duration::from_secs(10)),
            heat_leg: Duration::from_secs(60),
            cool_leg: Duration::from_secs(60),
            heat_wait: Duration::from_secs(90),
            cool_wait: Duration::from_secs(90),
            outer_retry: RetryPolicy::attempts(3).with_sleep(Duration::from_secs(60)),
        }
    }

    pub fn with_max_delta(mut self, max_c: Option<f64>) -> Self {
        self.thresholds.max_c = max_c;
        self
    }

    pub(crate) fn ready_policy(&self) -> RetryPolicy {
        RetryPolicy::deadline(self.ready_timeout).with_sleep(self.ready_poll)
    }
}
