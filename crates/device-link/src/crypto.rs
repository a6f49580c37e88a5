use rand::rngs::OsRng;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};

use crate::error::{DeviceError, DeviceResult};

/// RSA key the device hands out for credential encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePublicKey {
    key: RsaPublicKey,
}

impl DevicePublicKey {
    /// Parses the hex blob from a `public-key` reply.
    ///
    /// The firmware pads the DER SubjectPublicKeyInfo with trailing zero bytes
    /// up to a fixed buffer size; those are stripped before parsing.
    pub fn from_hex(blob: &str) -> DeviceResult<Self> {
        let raw = hex::decode(blob.trim())
            .map_err(|err| DeviceError::Key(format!("invalid hex: {err}")))?;
        let der = trim_trailing_zeros(&raw);
        if der.is_empty() {
            return Err(DeviceError::Key("key blob is empty after trimming".into()));
        }
        Self::from_der(der)
    }

    pub fn from_der(der: &[u8]) -> DeviceResult<Self> {
        let key = RsaPublicKey::from_public_key_der(der)
            .map_err(|err| DeviceError::Key(err.to_string()))?;
        Ok(Self { key })
    }

    /// Encrypts `plaintext` with PKCS#1 v1.5 and returns lowercase hex.
    ///
    /// Padding is random, so two calls never produce the same ciphertext.
    pub fn encrypt_hex(&self, plaintext: &str) -> DeviceResult<String> {
        let ciphertext = self
            .key
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext.as_bytes())
            .map_err(|err| DeviceError::Encryption(err.to_string()))?;
        Ok(hex::encode(ciphertext))
    }
}

/// Drops the zero bytes after the last non-zero byte.
pub fn trim_trailing_zeros(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|byte| *byte != 0)
        .map_or(0, |last| last + 1);
    &bytes[..end]
}
