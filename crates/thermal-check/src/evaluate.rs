use std::fmt;

use crate::config::DeltaThresholds;
use crate::temperature::{round2, SideTemperatures};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Pass,
    Fail,
}

impl TestOutcome {
    pub fn is_pass(self) -> bool {
        self == TestOutcome::Pass
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TestOutcome::Pass => "PASS",
            TestOutcome::Fail => "FAIL",
        })
    }
}

/// Temperature change of one leg on both sides, in °C.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideDeltas {
    pub left_c: f64,
    pub right_c: f64,
}

impl SideDeltas {
    /// `from` minus `to`, per side.
    pub fn between(from: &SideTemperatures, to: &SideTemperatures) -> Self {
        Self {
            left_c: round2(from.left_c - to.left_c),
            right_c: round2(from.right_c - to.right_c),
        }
    }

    pub fn values(&self) -> [f64; 2] {
        [self.left_c, self.right_c]
    }
}

/// Pass iff every delta lies within `thresholds`.
pub fn evaluate(deltas: &[f64], thresholds: &DeltaThresholds) -> TestOutcome {
    if deltas.iter().all(|delta| thresholds.accepts(*delta)) {
        TestOutcome::Pass
    } else {
        TestOutcome::Fail
    }
}

/// Everything measured in one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalReport {
    pub serial: String,
    pub device_id: String,
    pub initial: SideTemperatures,
    pub post_heat: SideTemperatures,
    /// Not sampled when the heat leg already failed.
    pub post_cool: Option<SideTemperatures>,
    pub heat: SideDeltas,
    pub cool: Option<SideDeltas>,
    pub outcome: TestOutcome,
}

impl fmt::Display for ThermalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} heat ΔL {:.2} ΔR {:.2}",
            self.serial, self.device_id, self.outcome, self.heat.left_c, self.heat.right_c
        )?;
        match self.cool {
            Some(cool) => write!(f, ", cool ΔL {:.2} ΔR {:.2}", cool.left_c, cool.right_c),
            None => f.write_str(", cool not sampled"),
        }
    }
}
