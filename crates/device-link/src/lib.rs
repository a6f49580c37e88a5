//! Client for the appliance's local pairing protocol.
//!
//! The device listens on a plain TCP port while in pairing mode. Every request
//! opens a fresh connection, writes one frame, and reads until the device
//! closes the socket:
//!
//! ```text
//! <name>\n<content length>\n\n<json content>
//! ```
//!
//! Responses are bare JSON. Each response type has its own decoder that checks
//! the shape before anything else sees the value.
//!
//! Wifi passwords never cross the wire in the clear: they are encrypted with
//! the device's RSA public key (PKCS#1 v1.5) and sent hex-encoded.

pub mod client;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod messages;

pub use client::{DeviceClient, DeviceClientConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use codec::{decode_response, encode_request, Request};
pub use crypto::DevicePublicKey;
pub use error::{DeviceError, DeviceResult};
pub use messages::{DecodeResponse, ShapeError, WifiCredentialMessage, WifiNetwork};
