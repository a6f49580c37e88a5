use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::events::Side;

pub const HEAT_LEVEL_LEFT: &str = "heatLevelL";
pub const HEAT_LEVEL_RIGHT: &str = "heatLevelR";
pub const LAST_HEARD: &str = "lastHeard";
pub const FIRMWARE_VERSION: &str = "firmwareVersion";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateField {
    pub value: Value,
}

/// Telemetry snapshot: field name to last reported value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceState(HashMap<String, StateField>);

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(
            name.into(),
            StateField {
                value: value.into(),
            },
        );
        self
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.0.get(name).map(|field| &field.value)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.value(name).and_then(Value::as_f64)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }

    pub fn heat_level(&self, side: Side) -> Option<f64> {
        match side {
            Side::Left => self.number(HEAT_LEVEL_LEFT),
            Side::Right => self.number(HEAT_LEVEL_RIGHT),
        }
    }

    pub fn firmware_version(&self) -> Option<&str> {
        self.text(FIRMWARE_VERSION)
    }

    /// Accepts an RFC 3339 string or unix epoch milliseconds.
    pub fn last_heard(&self) -> Option<OffsetDateTime> {
        match self.value(LAST_HEARD)? {
            Value::String(text) => OffsetDateTime::parse(text, &Rfc3339).ok(),
            Value::Number(number) => {
                let millis = number.as_i64()?;
                OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
            }
            _ => None,
        }
    }
}
