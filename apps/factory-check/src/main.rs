mod cli;
mod config;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use device_link::DeviceClient;
use thermal_check::{
    post_burn_in, DeviceUnderTest, RunResults, TestOutcome, ThermalCheck, ThermalTestConfig,
    BURN_IN_RETRY,
};
use time::OffsetDateTime;
use tracing::{error, info};

use crate::cli::{Cli, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    telemetry::init_tracing("info");
    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Command::Pair { ssid, password } => pair(&config, &ssid, &password).await,
        Command::Thermal {
            serial,
            device_id,
            firmware,
            max_delta_c,
        } => {
            let unit = DeviceUnderTest::new(serial, device_id);
            thermal(&config, unit, firmware, max_delta_c).await
        }
        Command::BurnIn {
            device_ids,
            start_in_minutes,
        } => burn_in(&config, &device_ids, start_in_minutes).await,
    }
}

async fn pair(config: &Config, ssid: &str, password: &str) -> Result<ExitCode> {
    let client = DeviceClient::new(config.device_client());
    let device_id = client
        .connect_and_get_id(ssid, password)
        .await
        .with_context(|| format!("pairing device at {}:{}", config.device_host, config.device_port))?;
    println!("{device_id}");
    Ok(ExitCode::SUCCESS)
}

async fn thermal(
    config: &Config,
    unit: DeviceUnderTest,
    firmware: Option<String>,
    max_delta_c: Option<f64>,
) -> Result<ExitCode> {
    let firmware = firmware
        .or_else(|| config.required_firmware.clone())
        .context("no required firmware: pass --firmware or set FACTORY_REQUIRED_FIRMWARE")?;
    let test_config =
        ThermalTestConfig::new(firmware).with_max_delta(max_delta_c.or(config.max_delta_c));

    let check = ThermalCheck::new(Arc::new(config.cloud_client()?), test_config);
    let mut results = RunResults::new();
    let outcome = check.run(&unit, &mut results).await;

    println!("{} {}", unit.serial, outcome);
    Ok(match outcome {
        TestOutcome::Pass => ExitCode::SUCCESS,
        TestOutcome::Fail => ExitCode::FAILURE,
    })
}

async fn burn_in(config: &Config, device_ids: &[String], start_in_minutes: u32) -> Result<ExitCode> {
    let cloud = config.cloud_client()?;
    let start = OffsetDateTime::now_utc() + Duration::from_secs(u64::from(start_in_minutes) * 60);
    info!(devices = device_ids.len(), %start, "posting burn-in schedules");

    let results = post_burn_in(&cloud, device_ids, start, BURN_IN_RETRY).await;
    let mut failed = 0;
    for result in &results {
        match &result.result {
            Ok(()) => println!("{} scheduled", result.device_id),
            Err(err) => {
                failed += 1;
                error!(device_id = %result.device_id, error = %err, "burn-in not scheduled");
                println!("{} failed", result.device_id);
            }
        }
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
