//! In-memory stand-in for the device cloud.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use cloud_sdk::state::{FIRMWARE_VERSION, HEAT_LEVEL_LEFT, HEAT_LEVEL_RIGHT, LAST_HEARD};
use cloud_sdk::{
    CloudError, DeviceState, EventScheduler, FunctionInvoker, Side, StateEvent, StatusCode,
    TelemetryReader,
};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const FIRMWARE: &str = "2.3.1";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    State(String),
    Function(String, String, bool),
    Events(String, Side, Vec<StateEvent>),
}

#[derive(Default)]
pub struct FakeCloud {
    /// Served front to back; the last one repeats forever.
    states: Mutex<VecDeque<DeviceState>>,
    calls: Mutex<Vec<Call>>,
    failing_functions: Mutex<HashSet<String>>,
    failing_schedules: Mutex<HashSet<String>>,
}

impl FakeCloud {
    pub fn with_states(states: impl IntoIterator<Item = DeviceState>) -> Self {
        let cloud = Self::default();
        cloud.states.lock().unwrap().extend(states);
        cloud
    }

    pub fn fail_function(self, name: &str) -> Self {
        self.failing_functions.lock().unwrap().insert(name.to_string());
        self
    }

    pub fn fail_schedules_for(self, device_id: &str) -> Self {
        self.failing_schedules
            .lock()
            .unwrap()
            .insert(device_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn state_reads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::State(_)))
            .count()
    }

    pub fn functions(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Function(_, name, _) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn schedules(&self) -> Vec<(String, Side, Vec<StateEvent>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Events(id, side, events) => Some((id, side, events)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn server_error(body: &str) -> CloudError {
    CloudError::UnexpectedStatus {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: body.to_string(),
    }
}

#[async_trait]
impl TelemetryReader for FakeCloud {
    async fn device_state(&self, device_id: &str) -> Result<DeviceState, CloudError> {
        self.record(Call::State(device_id.to_string()));
        let mut states = self.states.lock().unwrap();
        let state = if states.len() > 1 {
            states.pop_front()
        } else {
            states.front().cloned()
        };
        state.ok_or_else(|| server_error("no telemetry scripted"))
    }
}

#[async_trait]
impl FunctionInvoker for FakeCloud {
    async fn call_function(
        &self,
        device_id: &str,
        function: &str,
        confirm: bool,
    ) -> Result<(), CloudError> {
        self.record(Call::Function(
            device_id.to_string(),
            function.to_string(),
            confirm,
        ));
        if self.failing_functions.lock().unwrap().contains(function) {
            return Err(server_error("function failed"));
        }
        Ok(())
    }
}

#[async_trait]
impl EventScheduler for FakeCloud {
    async fn put_side_events(
        &self,
        device_id: &str,
        side: Side,
        events: &[StateEvent],
    ) -> Result<(), CloudError> {
        self.record(Call::Events(device_id.to_string(), side, events.to_vec()));
        if self.failing_schedules.lock().unwrap().contains(device_id) {
            return Err(server_error("schedule rejected"));
        }
        Ok(())
    }
}

/// Online device on the expected firmware reporting the given heat levels.
pub fn reading(left: i32, right: i32) -> DeviceState {
    let now = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("format now");
    DeviceState::new()
        .with_field(LAST_HEARD, now)
        .with_field(FIRMWARE_VERSION, FIRMWARE)
        .with_field(HEAT_LEVEL_LEFT, left)
        .with_field(HEAT_LEVEL_RIGHT, right)
}

/// Device that last reported ten minutes ago.
pub fn stale() -> DeviceState {
    let then = OffsetDateTime::now_utc() - time::Duration::minutes(10);
    DeviceState::new()
        .with_field(LAST_HEARD, then.unix_timestamp() * 1000)
        .with_field(FIRMWARE_VERSION, FIRMWARE)
        .with_field(HEAT_LEVEL_LEFT, 0)
        .with_field(HEAT_LEVEL_RIGHT, 0)
}

/// Reads served by one attempt that completes: two readiness checks and
/// the initial, post-heat and post-cool samples.
pub fn attempt(initial: (i32, i32), post_heat: (i32, i32), post_cool: (i32, i32)) -> Vec<DeviceState> {
    vec![
        reading(0, 0),
        reading(0, 0),
        reading(initial.0, initial.1),
        reading(post_heat.0, post_heat.1),
        reading(post_cool.0, post_cool.1),
    ]
}
