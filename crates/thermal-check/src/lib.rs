//! Thermal acceptance check for a device reachable through the cloud API.
//!
//! [`ThermalCheck`] waits for the device to report in on the expected
//! firmware, primes the coolant loop, runs a heat leg followed by a cool leg
//! and passes the device when every side moved by at least the configured
//! delta. Whole attempts are retried; the final outcome lands in the caller's
//! [`RunResults`].

pub mod burn_in;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod orchestrator;
pub mod readiness;
pub mod results;
pub mod schedule;
pub mod temperature;

pub use burn_in::{post_burn_in, BurnInResult, BURN_IN_RETRY};
pub use config::{DeltaThresholds, ThermalTestConfig, MIN_DELTA_C};
pub use error::{CheckError, CheckResult};
pub use evaluate::{evaluate, SideDeltas, TestOutcome, ThermalReport};
pub use orchestrator::{AttemptError, DeviceUnderTest, Stage, ThermalCheck};
pub use results::RunResults;
pub use temperature::{convert_temp, SideTemperatures};
