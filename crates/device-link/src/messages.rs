//! Request names and per-response decoders.
//!
//! Each reply type validates the parsed JSON itself and reports the first
//! offending field by path (`scans[0].rssi`). Unknown fields are ignored;
//! missing or mistyped ones are errors, never defaults.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::crypto::DevicePublicKey;
use crate::error::{DeviceError, DeviceResult};

pub const DEVICE_ID: &str = "device-id";
pub const PUBLIC_KEY: &str = "public-key";
pub const SCAN_AP: &str = "scan-ap";
pub const CONFIGURE_AP: &str = "configure-ap";
pub const CONNECT_AP: &str = "connect-ap";

/// The device keeps a single pending network selection, always slot 0.
pub const NETWORK_INDEX: u32 = 0;

const ROOT_PATH: &str = "(root)";

/// Where and why a response failed its shape check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError {
    pub path: String,
    pub reason: String,
}

impl ShapeError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn at_root(reason: impl Into<String>) -> Self {
        Self::new(ROOT_PATH, reason)
    }

    pub fn into_decode_error(self, raw: String) -> DeviceError {
        DeviceError::Decode {
            raw,
            path: self.path,
            reason: self.reason,
        }
    }
}

/// Shape contract for one response type.
pub trait DecodeResponse: Sized {
    fn decode(value: &Value) -> Result<Self, ShapeError>;
}

/// Reply to `device-id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdReply {
    pub id: String,
    /// Optional auxiliary string some firmware revisions include.
    pub c: Option<String>,
}

impl DecodeResponse for DeviceIdReply {
    fn decode(value: &Value) -> Result<Self, ShapeError> {
        let object = Object::root(value)?;
        Ok(Self {
            id: object.required_str("id")?.to_string(),
            c: object.optional_str("c")?.map(str::to_string),
        })
    }
}

/// Reply to `public-key`: hex DER blob, zero padded by the firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyReply {
    pub key_hex: String,
}

impl DecodeResponse for PublicKeyReply {
    fn decode(value: &Value) -> Result<Self, ShapeError> {
        let object = Object::root(value)?;
        let code = object.required_i64("r")?;
        if code != 0 {
            return Err(ShapeError::new(
                object.path_of("r"),
                format!("expected 0, got {code}"),
            ));
        }
        Ok(Self {
            key_hex: object.required_str("b")?.to_string(),
        })
    }
}

/// One access point seen by the device's radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiNetwork {
    pub ssid: String,
    pub security_type: u32,
    pub channel: u32,
    pub rssi: i32,
    pub max_data_rate_kbps: u32,
}

/// Reply to `scan-ap`, in the order the device reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReply {
    pub networks: Vec<WifiNetwork>,
}

impl DecodeResponse for ScanReply {
    fn decode(value: &Value) -> Result<Self, ShapeError> {
        let object = Object::root(value)?;
        let scans = object.required_array("scans")?;
        let networks = scans
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let entry = Object::at(entry, format!("scans[{index}]"))?;
                Ok(WifiNetwork {
                    ssid: entry.required_str("ssid")?.to_string(),
                    security_type: entry.required_int("sec")?,
                    channel: entry.required_int("ch")?,
                    rssi: entry.required_int("rssi")?,
                    max_data_rate_kbps: entry.required_int("mdr")?,
                })
            })
            .collect::<Result<Vec<_>, ShapeError>>()?;
        Ok(Self { networks })
    }
}

/// Generic `{ "r": <code> }` reply used by the configuration requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultReply {
    pub code: i64,
}

impl ResultReply {
    /// A non-zero code is the device refusing the request.
    pub fn into_result(self, request: &'static str) -> DeviceResult<()> {
        if self.code == 0 {
            Ok(())
        } else {
            Err(DeviceError::Protocol {
                request,
                code: self.code,
            })
        }
    }
}

impl DecodeResponse for ResultReply {
    fn decode(value: &Value) -> Result<Self, ShapeError> {
        let object = Object::root(value)?;
        Ok(Self {
            code: object.required_i64("r")?,
        })
    }
}

/// Content of `configure-ap`.
///
/// Built once per send attempt: PKCS#1 v1.5 padding is random, so the
/// ciphertext differs on every call and is never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WifiCredentialMessage {
    #[serde(rename = "idx")]
    pub network_index: u32,
    pub ssid: String,
    #[serde(rename = "sec")]
    pub security_type: u32,
    #[serde(rename = "ch")]
    pub channel: u32,
    #[serde(rename = "pwd")]
    pub encrypted_password: String,
}

impl WifiCredentialMessage {
    pub fn new(
        network: &WifiNetwork,
        public_key: &DevicePublicKey,
        password: &str,
    ) -> DeviceResult<Self> {
        Ok(Self {
            network_index: NETWORK_INDEX,
            ssid: network.ssid.clone(),
            security_type: network.security_type,
            channel: network.channel,
            encrypted_password: public_key.encrypt_hex(password)?,
        })
    }
}

/// Content of `connect-ap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectRequest {
    pub idx: u32,
}

impl Default for ConnectRequest {
    fn default() -> Self {
        Self { idx: NETWORK_INDEX }
    }
}

/// A JSON object together with its path from the response root.
struct Object<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> Object<'a> {
    fn root(value: &'a Value) -> Result<Self, ShapeError> {
        Self::at(value, String::new())
    }

    fn at(value: &'a Value, path: String) -> Result<Self, ShapeError> {
        match value {
            Value::Object(map) => Ok(Self { map, path }),
            other => {
                let path = if path.is_empty() {
                    ROOT_PATH.to_string()
                } else {
                    path
                };
                Err(ShapeError::new(
                    path,
                    format!("expected object, got {}", type_name(other)),
                ))
            }
        }
    }

    fn path_of(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn required(&self, key: &str) -> Result<&'a Value, ShapeError> {
        self.map
            .get(key)
            .ok_or_else(|| ShapeError::new(self.path_of(key), "required field is missing"))
    }

    fn required_str(&self, key: &str) -> Result<&'a str, ShapeError> {
        let value = self.required(key)?;
        value.as_str().ok_or_else(|| self.mistyped(key, "string", value))
    }

    fn optional_str(&self, key: &str) -> Result<Option<&'a str>, ShapeError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(Value::String(text)) => Ok(Some(text)),
            Some(other) => Err(self.mistyped(key, "string", other)),
        }
    }

    fn required_i64(&self, key: &str) -> Result<i64, ShapeError> {
        let value = self.required(key)?;
        value.as_i64().ok_or_else(|| self.mistyped(key, "integer", value))
    }

    fn required_int<T: TryFrom<i64>>(&self, key: &str) -> Result<T, ShapeError> {
        let raw = self.required_i64(key)?;
        T::try_from(raw)
            .map_err(|_| ShapeError::new(self.path_of(key), format!("{raw} is out of range")))
    }

    fn required_array(&self, key: &str) -> Result<&'a Vec<Value>, ShapeError> {
        let value = self.required(key)?;
        value.as_array().ok_or_else(|| self.mistyped(key, "array", value))
    }

    fn mistyped(&self, key: &str, expected: &str, actual: &Value) -> ShapeError {
        ShapeError::new(
            self.path_of(key),
            format!("expected {expected}, got {}", type_name(actual)),
        )
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
