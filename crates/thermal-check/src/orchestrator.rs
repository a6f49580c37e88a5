use std::fmt;
use std::sync::Arc;

use bounded_retry::retry;
use cloud_sdk::{DeviceCloud, Side, StateEvent};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::ThermalTestConfig;
use crate::error::{CheckError, CheckResult};
use crate::evaluate::{evaluate, SideDeltas, TestOutcome, ThermalReport};
use crate::readiness::await_ready;
use crate::results::RunResults;
use crate::schedule::{pump_toggle, thermal_burst, PUMP_TOGGLE_SPAN};
use crate::temperature::{sample, SideTemperatures};

pub const PRIME_FUNCTION: &str = "prime";
pub const RESET_FUNCTION: &str = "reset";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitReady,
    Priming,
    AwaitReadyPostPrime,
    ThermalHeat,
    ThermalCool,
    Evaluate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::AwaitReady => "await-ready",
            Stage::Priming => "priming",
            Stage::AwaitReadyPostPrime => "await-ready-post-prime",
            Stage::ThermalHeat => "thermal-heat",
            Stage::ThermalCool => "thermal-cool",
            Stage::Evaluate => "evaluate",
        })
    }
}

/// An attempt that ended in an error rather than a measurement.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct AttemptError {
    pub stage: Stage,
    #[source]
    pub source: CheckError,
}

fn at(stage: Stage) -> impl FnOnce(CheckError) -> AttemptError {
    move |source| AttemptError { stage, source }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceUnderTest {
    pub serial: String,
    pub device_id: String,
}

impl DeviceUnderTest {
    pub fn new(serial: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            device_id: device_id.into(),
        }
    }
}

/// Why the outer retry should go again.
#[derive(Debug)]
enum AttemptFailure {
    Error(AttemptError),
    BelowThreshold(Box<ThermalReport>),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Error(err) => write!(f, "{err}"),
            AttemptFailure::BelowThreshold(report) => write!(f, "below threshold: {report}"),
        }
    }
}

/// Drives the thermal acceptance sequence for one device at a time.
pub struct ThermalCheck<C: ?Sized> {
    cloud: Arc<C>,
    config: ThermalTestConfig,
}

impl<C> ThermalCheck<C>
where
    C: DeviceCloud + ?Sized,
{
    pub fn new(cloud: Arc<C>, config: ThermalTestConfig) -> Self {
        Self { cloud, config }
    }

    pub fn config(&self) -> &ThermalTestConfig {
        &self.config
    }

    /// Runs attempts until one passes or the outer budget is spent, records
    /// the overall outcome for the unit's serial and returns it.
    ///
    /// Errors never escape: an attempt that errors counts as a failed attempt.
    pub async fn run(&self, unit: &DeviceUnderTest, results: &mut RunResults) -> TestOutcome {
        info!(serial = %unit.serial, device_id = %unit.device_id, "starting thermal check");

        let outcome = retry(self.config.outer_retry, || async {
            match self.run_attempt(unit).await {
                Ok(report) if report.outcome.is_pass() => Ok(report),
                Ok(report) => Err(AttemptFailure::BelowThreshold(Box::new(report))),
                Err(err) => Err(AttemptFailure::Error(err)),
            }
        })
        .await;

        let outcome = match outcome {
            Ok(report) => {
                info!(serial = %unit.serial, %report, "thermal check passed");
                TestOutcome::Pass
            }
            Err(failure) => {
                warn!(serial = %unit.serial, %failure, "thermal check failed");
                TestOutcome::Fail
            }
        };
        results.record(unit.serial.clone(), outcome);
        outcome
    }

    /// One full pass through the sequence.
    ///
    /// A measurement below threshold is an `Ok` report with outcome
    /// [`TestOutcome::Fail`]; only errors are `Err`.
    pub async fn run_attempt(&self, unit: &DeviceUnderTest) -> Result<ThermalReport, AttemptError> {
        let device_id = unit.device_id.as_str();
        let cfg = &self.config;

        self.await_ready(device_id, Stage::AwaitReady).await?;

        info!(serial = %unit.serial, stage = %Stage::Priming, "entering stage");
        if let Err(err) = self.prime(device_id).await {
            warn!(serial = %unit.serial, error = %err, "priming failed, continuing");
        }

        self.await_ready(device_id, Stage::AwaitReadyPostPrime).await?;

        info!(serial = %unit.serial, stage = %Stage::ThermalHeat, "entering stage");
        let initial = self.sample(device_id).await.map_err(at(Stage::ThermalHeat))?;
        let burst = thermal_burst(self.schedule_start(), cfg.heat_leg, cfg.cool_leg);
        self.schedule_both(device_id, &burst)
            .await
            .map_err(at(Stage::ThermalHeat))?;
        sleep(cfg.heat_wait).await;
        let post_heat = self.sample(device_id).await.map_err(at(Stage::ThermalHeat))?;
        let heat = SideDeltas::between(&post_heat, &initial);

        if evaluate(&heat.values(), &cfg.thresholds) == TestOutcome::Fail {
            let report = ThermalReport {
                serial: unit.serial.clone(),
                device_id: unit.device_id.clone(),
                initial,
                post_heat,
                post_cool: None,
                heat,
                cool: None,
                outcome: TestOutcome::Fail,
            };
            warn!(%report, "heat leg below threshold");
            return Ok(report);
        }

        info!(serial = %unit.serial, stage = %Stage::ThermalCool, "entering stage");
        sleep(cfg.cool_wait).await;
        let post_cool = self.sample(device_id).await.map_err(at(Stage::ThermalCool))?;
        let cool = SideDeltas::between(&post_heat, &post_cool);

        let deltas = [heat.values(), cool.values()].concat();
        let report = ThermalReport {
            serial: unit.serial.clone(),
            device_id: unit.device_id.clone(),
            initial,
            post_heat,
            post_cool: Some(post_cool),
            heat,
            cool: Some(cool),
            outcome: evaluate(&deltas, &cfg.thresholds),
        };
        info!(stage = %Stage::Evaluate, %report, "attempt evaluated");
        Ok(report)
    }

    async fn await_ready(&self, device_id: &str, stage: Stage) -> Result<(), AttemptError> {
        info!(device_id, %stage, "entering stage");
        let cfg = &self.config;
        await_ready(
            self.cloud.as_ref(),
            device_id,
            &cfg.required_firmware,
            cfg.last_heard_window,
            cfg.ready_policy(),
        )
        .await
        .map_err(at(stage))
    }

    /// Best effort: the caller logs failures and moves on.
    async fn prime(&self, device_id: &str) -> CheckResult<()> {
        let cfg = &self.config;
        self.cloud.call_function(device_id, PRIME_FUNCTION, true).await?;
        sleep(cfg.prime_settle).await;
        self.cloud.call_function(device_id, RESET_FUNCTION, true).await?;
        sleep(cfg.reset_settle).await;

        self.schedule_both(device_id, &pump_toggle(self.schedule_start()))
            .await?;
        sleep(cfg.schedule_lead + PUMP_TOGGLE_SPAN).await;
        Ok(())
    }

    async fn sample(&self, device_id: &str) -> CheckResult<SideTemperatures> {
        sample(self.cloud.as_ref(), device_id, self.config.sample_retry).await
    }

    /// Posts `events` to both sides concurrently; both must succeed.
    async fn schedule_both(&self, device_id: &str, events: &[StateEvent]) -> CheckResult<()> {
        let policy = self.config.schedule_retry;
        let left = retry(policy, || {
            self.cloud.put_side_events(device_id, Side::Left, events)
        });
        let right = retry(policy, || {
            self.cloud.put_side_events(device_id, Side::Right, events)
        });
        tokio::try_join!(left, right)?;
        Ok(())
    }

    fn schedule_start(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc() + self.config.schedule_lead
    }
}
