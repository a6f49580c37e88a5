//! Scripted stand-in for a device in pairing mode.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use bounded_retry::RetryPolicy;
use device_link::DeviceClientConfig;
use rand::rngs::OsRng;
use rsa::pkcs8::EncodePublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub name: String,
    pub declared_len: usize,
    pub content: String,
}

impl ReceivedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.content).expect("request content is json")
    }
}

pub enum Reply {
    /// Write the body and close.
    Json(String),
    /// Write the body in two pieces with a pause between them, then close.
    Split(String),
    /// Accept and never answer.
    Silent,
}

pub struct FakeDevice {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
    task: JoinHandle<()>,
}

impl FakeDevice {
    pub async fn start<F>(script: F) -> Self
    where
        F: Fn(&ReceivedRequest) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake device");
        let addr = listener.local_addr().expect("local addr");
        let script = Arc::new(script);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let task = tokio::spawn({
            let requests = requests.clone();
            async move {
                while let Ok((socket, _)) = listener.accept().await {
                    let script = script.clone();
                    let requests = requests.clone();
                    tokio::spawn(async move {
                        serve_one(socket, script.as_ref(), &requests).await;
                    });
                }
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn client_config(&self) -> DeviceClientConfig {
        DeviceClientConfig {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            timeout: Duration::from_millis(300),
            retry: RetryPolicy::attempts(1),
        }
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn request_names(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.name).collect()
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_one<F>(mut socket: TcpStream, script: &F, requests: &Mutex<Vec<ReceivedRequest>>)
where
    F: Fn(&ReceivedRequest) -> Reply,
{
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    requests.lock().expect("requests lock").push(request.clone());

    match script(&request) {
        Reply::Json(body) => {
            let _ = socket.write_all(body.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
        Reply::Split(body) => {
            let (head, tail) = body.split_at(body.len() / 2);
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = socket.write_all(tail.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
        Reply::Silent => {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }
}

/// The fake trusts the length line so it knows when the request is complete.
async fn read_request(socket: &mut TcpStream) -> Option<ReceivedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(request) = parse_request(&buf) {
            return Some(request);
        }
        let read = socket.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..read]);
    }
}

fn parse_request(buf: &[u8]) -> Option<ReceivedRequest> {
    let text = std::str::from_utf8(buf).ok()?;
    let (header, body) = text.split_once("\n\n")?;
    let (name, len) = header.split_once('\n')?;
    let declared_len: usize = len.parse().ok()?;
    if body.len() < declared_len {
        return None;
    }
    Some(ReceivedRequest {
        name: name.to_string(),
        declared_len,
        content: body.to_string(),
    })
}

pub struct DeviceKeys {
    pub private: RsaPrivateKey,
    /// Hex DER, zero padded the way the firmware sends it.
    pub padded_hex: String,
}

pub fn device_keys() -> &'static DeviceKeys {
    static KEYS: OnceLock<DeviceKeys> = OnceLock::new();
    KEYS.get_or_init(|| {
        let private = RsaPrivateKey::new(&mut OsRng, 1024).expect("generate device key");
        let der = RsaPublicKey::from(&private)
            .to_public_key_der()
            .expect("encode public key");
        let padded_hex = format!("{}{}", hex::encode(der.as_bytes()), "00".repeat(64));
        DeviceKeys {
            private,
            padded_hex,
        }
    })
}

pub fn scan_body() -> String {
    serde_json::json!({
        "scans": [
            { "ssid": "Factory-5G", "sec": 3, "ch": 36, "rssi": -52, "mdr": 433000 },
            { "ssid": "Factory", "sec": 3, "ch": 6, "rssi": -40, "mdr": 54000 }
        ]
    })
    .to_string()
}
