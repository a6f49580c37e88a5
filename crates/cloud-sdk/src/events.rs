use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::CloudError;

/// Heating zone of the appliance. Each side is scheduled independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    TemperatureControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlOperation {
    On,
    Off,
    Temperature,
}

/// Heat level on the device scale: -100 is maximum cooling, 100 maximum
/// heating, 0 ambient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct HeatLevel(i32);

impl HeatLevel {
    pub const MAX_COOL: HeatLevel = HeatLevel(-100);
    pub const AMBIENT: HeatLevel = HeatLevel(0);
    pub const MAX_HEAT: HeatLevel = HeatLevel(100);

    pub fn new(level: i32) -> Result<Self, CloudError> {
        if (-100..=100).contains(&level) {
            Ok(Self(level))
        } else {
            Err(CloudError::InvalidHeatLevel(level))
        }
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for HeatLevel {
    type Error = CloudError;

    fn try_from(level: i32) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<HeatLevel> for i32 {
    fn from(level: HeatLevel) -> Self {
        level.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    pub value: HeatLevel,
}

/// One entry of a side's schedule. The cloud executes it at `time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub operation: ControlOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EventData>,
}

impl StateEvent {
    pub fn on(time: OffsetDateTime) -> Self {
        Self::control(time, ControlOperation::On, None)
    }

    pub fn off(time: OffsetDateTime) -> Self {
        Self::control(time, ControlOperation::Off, None)
    }

    pub fn temperature(time: OffsetDateTime, level: HeatLevel) -> Self {
        Self::control(
            time,
            ControlOperation::Temperature,
            Some(EventData { value: level }),
        )
    }

    fn control(time: OffsetDateTime, operation: ControlOperation, data: Option<EventData>) -> Self {
        Self {
            time,
            event_type: EventType::TemperatureControl,
            operation,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn temperature_event_wire_shape() {
        let event = StateEvent::temperature(datetime!(2024-03-01 12:00:05 UTC), HeatLevel::MAX_HEAT);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "time": "2024-03-01T12:00:05Z",
                "type": "temperatureControl",
                "operation": "temperature",
                "data": { "value": 100 }
            })
        );
    }

    #[test]
    fn on_off_events_omit_data() {
        let event = StateEvent::off(datetime!(2024-03-01 12:00:00 UTC));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["operation"], "off");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn heat_level_range_is_enforced() {
        assert!(HeatLevel::new(-100).is_ok());
        assert!(HeatLevel::new(100).is_ok());
        assert!(matches!(
            HeatLevel::new(101),
            Err(CloudError::InvalidHeatLevel(101))
        ));
        assert!(serde_json::from_value::<EventData>(json!({ "value": -101 })).is_err());
    }

    #[test]
    fn sides_render_lowercase() {
        assert_eq!(Side::Left.to_string(), "left");
        assert_eq!(serde_json::to_value(Side::Right).unwrap(), json!("right"));
    }
}
