//! Asynchronous client for the device cloud API.
//!
//! The thermal harness only needs three capabilities from the cloud: read a
//! telemetry snapshot, invoke a named device function, and replace the event
//! schedule of one side. Each is a trait so orchestration code can run
//! against in-memory fakes; [`CloudClient`] is the HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

pub mod events;
pub mod state;

pub use events::{ControlOperation, EventData, EventType, HeatLevel, Side, StateEvent};
pub use reqwest::StatusCode;
pub use state::{DeviceState, StateField};

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("heat level {0} outside -100..=100")]
    InvalidHeatLevel(i32),
}

#[async_trait]
pub trait TelemetryReader: Send + Sync {
    async fn device_state(&self, device_id: &str) -> Result<DeviceState, CloudError>;
}

#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn call_function(
        &self,
        device_id: &str,
        function: &str,
        confirm: bool,
    ) -> Result<(), CloudError>;
}

#[async_trait]
pub trait EventScheduler: Send + Sync {
    /// Replaces the pending schedule of `side` with `events`, in order.
    async fn put_side_events(
        &self,
        device_id: &str,
        side: Side,
        events: &[StateEvent],
    ) -> Result<(), CloudError>;
}

/// Everything the thermal orchestrator consumes.
pub trait DeviceCloud: TelemetryReader + FunctionInvoker + EventScheduler {}

impl<T> DeviceCloud for T where T: TelemetryReader + FunctionInvoker + EventScheduler + ?Sized {}

#[derive(Clone)]
pub struct CloudClient {
    http: Client,
    base_url: String,
    token: String,
}

impl CloudClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::from_parts(Client::new(), base_url, token)
    }

    /// Client whose requests fail with [`CloudError::Http`] after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CloudError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::from_parts(http, base_url, token))
    }

    fn from_parts(http: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn check(res: Response) -> Result<Response, CloudError> {
        if res.status().is_success() {
            Ok(res)
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(CloudError::UnexpectedStatus { status, body })
        }
    }
}

#[async_trait]
impl TelemetryReader for CloudClient {
    async fn device_state(&self, device_id: &str) -> Result<DeviceState, CloudError> {
        let url = self.url(&format!("devices/{device_id}/state"));
        debug!(%url, "reading device state");
        let res = self.http.get(url).bearer_auth(&self.token).send().await?;
        Ok(Self::check(res).await?.json::<DeviceState>().await?)
    }
}

#[async_trait]
impl FunctionInvoker for CloudClient {
    async fn call_function(
        &self,
        device_id: &str,
        function: &str,
        confirm: bool,
    ) -> Result<(), CloudError> {
        let url = self.url(&format!("devices/{device_id}/functions/{function}"));
        debug!(%url, confirm, "invoking device function");
        let res = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "confirm": confirm }))
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }
}

#[async_trait]
impl EventScheduler for CloudClient {
    async fn put_side_events(
        &self,
        device_id: &str,
        side: Side,
        events: &[StateEvent],
    ) -> Result<(), CloudError> {
        let url = self.url(&format!("devices/{device_id}/sides/{side}/state-events"));
        debug!(%url, count = events.len(), "scheduling side events");
        let res = self
            .http
            .put(url)
            .bearer_auth(&self.token)
            .json(events)
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }
}
