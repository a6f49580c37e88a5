//! Request framing and response decoding.
//!
//! The length line in a request is informational. The device reads the frame
//! on its side, and responses carry no header at all: the caller drains the
//! socket until the device closes it and hands the whole buffer to
//! [`decode_response`].

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;

use crate::error::{DeviceError, DeviceResult};
use crate::messages::{DecodeResponse, ShapeError};

/// One outbound request. Content is serialized when the request is built so
/// that the frame length is known and field order follows the message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    name: &'static str,
    content: Option<String>,
}

impl Request {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            content: None,
        }
    }

    pub fn with_content<T: Serialize>(name: &'static str, content: &T) -> DeviceResult<Self> {
        Ok(Self {
            name,
            content: Some(to_ascii_json(content)?),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// JSON text of the content, if any.
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

/// Frames `request` as `<name>\n<len>\n\n<json>`.
///
/// A request without content is framed with length 0 and an empty body,
/// which the device treats differently from an empty object.
pub fn encode_request(request: &Request) -> Vec<u8> {
    let body = request.content().unwrap_or("");
    format!("{}\n{}\n\n{}", request.name, body.len(), body).into_bytes()
}

/// Decodes a full response buffer into `T`.
///
/// Any failure (non-ASCII bytes, malformed JSON, wrong shape) becomes
/// [`DeviceError::Decode`] carrying the raw text.
pub fn decode_response<T: DecodeResponse>(bytes: &[u8]) -> DeviceResult<T> {
    let raw = String::from_utf8_lossy(bytes).into_owned();
    if !bytes.is_ascii() {
        return Err(ShapeError::at_root("response is not ASCII").into_decode_error(raw));
    }

    let value: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => return Err(ShapeError::at_root(err.to_string()).into_decode_error(raw)),
    };

    T::decode(&value).map_err(|shape| shape.into_decode_error(raw))
}

fn to_ascii_json<T: Serialize>(content: &T) -> DeviceResult<String> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter);
    content
        .serialize(&mut serializer)
        .map_err(|err| DeviceError::Encode(err.to_string()))?;
    String::from_utf8(out).map_err(|err| DeviceError::Encode(err.to_string()))
}

/// Compact JSON that escapes every non-ASCII character as `\uXXXX`, so the
/// frame is pure ASCII and the length line counts bytes and chars alike.
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..index])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = index + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}
