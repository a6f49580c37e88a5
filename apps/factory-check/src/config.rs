use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use cloud_sdk::CloudClient;
use device_link::{DeviceClientConfig, DEFAULT_HOST, DEFAULT_PORT};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub device_host: String,
    pub device_port: u16,
    pub device_timeout_ms: u64,
    pub cloud_url: Option<String>,
    pub cloud_token: Option<String>,
    pub cloud_timeout_ms: u64,
    pub required_firmware: Option<String>,
    pub max_delta_c: Option<f64>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            device_host: lookup("FACTORY_DEVICE_HOST").unwrap_or(defaults.device_host),
            device_port: lookup("FACTORY_DEVICE_PORT")
                .and_then(|val| val.parse().ok())
                .unwrap_or(defaults.device_port),
            device_timeout_ms: lookup("FACTORY_DEVICE_TIMEOUT_MS")
                .and_then(|val| val.parse().ok())
                .unwrap_or(defaults.device_timeout_ms),
            cloud_url: lookup("FACTORY_CLOUD_URL"),
            cloud_token: lookup("FACTORY_CLOUD_TOKEN"),
            cloud_timeout_ms: lookup("FACTORY_CLOUD_TIMEOUT_MS")
                .and_then(|val| val.parse().ok())
                .unwrap_or(defaults.cloud_timeout_ms),
            required_firmware: lookup("FACTORY_REQUIRED_FIRMWARE"),
            max_delta_c: lookup("FACTORY_MAX_DELTA_C").and_then(|val| val.parse().ok()),
        }
    }

    pub fn device_client(&self) -> DeviceClientConfig {
        DeviceClientConfig {
            host: self.device_host.clone(),
            port: self.device_port,
            timeout: Duration::from_millis(self.device_timeout_ms),
            ..DeviceClientConfig::default()
        }
    }

    pub fn cloud_client(&self) -> Result<CloudClient> {
        let url = self
            .cloud_url
            .as_deref()
            .context("FACTORY_CLOUD_URL is not set")?;
        let token = self
            .cloud_token
            .as_deref()
            .context("FACTORY_CLOUD_TOKEN is not set")?;
        CloudClient::with_timeout(url, token, Duration::from_millis(self.cloud_timeout_ms))
            .context("building cloud client")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_host: DEFAULT_HOST.to_string(),
            device_port: DEFAULT_PORT,
            device_timeout_ms: 1000,
            cloud_url: None,
            cloud_token: None,
            cloud_timeout_ms: 5000,
            required_firmware: None,
            max_delta_c: None,
        }
    }
}
