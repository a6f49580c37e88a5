use std::time::Duration;

use bounded_retry::{retry_when, RetryPolicy};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, trace};

use crate::codec::{decode_response, encode_request, Request};
use crate::crypto::DevicePublicKey;
use crate::error::{DeviceError, DeviceResult};
use crate::messages::{
    ConnectRequest, DecodeResponse, DeviceIdReply, PublicKeyReply, ResultReply, ScanReply,
    WifiCredentialMessage, WifiNetwork, CONFIGURE_AP, CONNECT_AP, DEVICE_ID, PUBLIC_KEY, SCAN_AP,
};

/// Address the device serves while in pairing mode.
pub const DEFAULT_HOST: &str = "192.168.0.1";
pub const DEFAULT_PORT: u16 = 5609;
/// Budget for connecting and for each idle wait on the socket.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone)]
pub struct DeviceClientConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    /// Applied per step of [`DeviceClient::connect_and_get_id`], transient
    /// errors only.
    pub retry: RetryPolicy,
}

impl Default for DeviceClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::attempts(3),
        }
    }
}

/// Pairing-mode client. Holds configuration only: each operation opens its
/// own connection, performs one exchange, and closes it.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    config: DeviceClientConfig,
}

impl DeviceClient {
    pub fn new(config: DeviceClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DeviceClientConfig {
        &self.config
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Device identity, lowercased.
    pub async fn device_id(&self) -> DeviceResult<String> {
        let reply: DeviceIdReply = self.exchange(&Request::new(DEVICE_ID)).await?;
        Ok(reply.id.to_lowercase())
    }

    pub async fn public_key(&self) -> DeviceResult<DevicePublicKey> {
        let reply: PublicKeyReply = self.exchange(&Request::new(PUBLIC_KEY)).await?;
        DevicePublicKey::from_hex(&reply.key_hex)
    }

    /// Networks in the order the device reported them. The order is not
    /// stable between scans.
    pub async fn scan_networks(&self) -> DeviceResult<Vec<WifiNetwork>> {
        let reply: ScanReply = self.exchange(&Request::new(SCAN_AP)).await?;
        Ok(reply.networks)
    }

    /// Selects `network` and hands the device the encrypted password.
    pub async fn send_credentials(
        &self,
        network: &WifiNetwork,
        public_key: &DevicePublicKey,
        password: &str,
    ) -> DeviceResult<()> {
        let message = WifiCredentialMessage::new(network, public_key, password)?;
        let request = Request::with_content(CONFIGURE_AP, &message)?;
        let reply: ResultReply = self.exchange(&request).await?;
        reply.into_result(CONFIGURE_AP)
    }

    /// Asks the device to join the network selected by `send_credentials`.
    pub async fn connect_to_network(&self) -> DeviceResult<()> {
        let request = Request::with_content(CONNECT_AP, &ConnectRequest::default())?;
        let reply: ResultReply = self.exchange(&request).await?;
        reply.into_result(CONNECT_AP)
    }

    /// Full pairing: identify the device, provision `ssid`, and return the id.
    ///
    /// Steps that fail transiently are retried under the configured policy.
    /// Nothing is rolled back when a later step fails.
    pub async fn connect_and_get_id(&self, ssid: &str, password: &str) -> DeviceResult<String> {
        let policy = self.config.retry;

        let device_id = retry_when(policy, DeviceError::is_transient, || self.device_id()).await?;
        info!(device_id = %device_id, "device identified");

        let public_key =
            retry_when(policy, DeviceError::is_transient, || self.public_key()).await?;
        let networks =
            retry_when(policy, DeviceError::is_transient, || self.scan_networks()).await?;
        debug!(count = networks.len(), "scan complete");

        let network = networks
            .into_iter()
            .find(|network| network.ssid == ssid)
            .ok_or_else(|| DeviceError::NetworkNotFound(ssid.to_string()))?;

        // fresh ciphertext on every attempt
        retry_when(policy, DeviceError::is_transient, || {
            self.send_credentials(&network, &public_key, password)
        })
        .await?;
        retry_when(policy, DeviceError::is_transient, || {
            self.connect_to_network()
        })
        .await?;

        info!(device_id = %device_id, ssid, channel = network.channel, "wifi credentials provisioned");
        Ok(device_id)
    }

    async fn exchange<T: DecodeResponse>(&self, request: &Request) -> DeviceResult<T> {
        let raw = self.round_trip(request).await?;
        trace!(request = request.name(), response = %String::from_utf8_lossy(&raw), "device replied");
        decode_response(&raw)
    }

    /// One connection, one frame out, everything until EOF back.
    async fn round_trip(&self, request: &Request) -> DeviceResult<Vec<u8>> {
        let addr = self.addr();
        let budget = self.config.timeout;
        debug!(request = request.name(), %addr, "sending device request");

        let mut stream = match timeout(budget, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(DeviceError::Transport { addr, source }),
            Err(_) => {
                return Err(DeviceError::Timeout {
                    addr,
                    stage: "connect",
                    timeout: budget,
                })
            }
        };

        let frame = encode_request(request);
        match timeout(budget, stream.write_all(&frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(source)) => return Err(DeviceError::Transport { addr, source }),
            Err(_) => {
                return Err(DeviceError::Timeout {
                    addr,
                    stage: "write",
                    timeout: budget,
                })
            }
        }

        let mut response = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match timeout(budget, stream.read(&mut chunk)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(read)) => response.extend_from_slice(&chunk[..read]),
                Ok(Err(source)) => return Err(DeviceError::Transport { addr, source }),
                Err(_) => {
                    return Err(DeviceError::Timeout {
                        addr,
                        stage: "read",
                        timeout: budget,
                    })
                }
            }
        }

        Ok(response)
    }
}
