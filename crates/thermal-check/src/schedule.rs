//! Event schedules posted to the cloud. Builders are pure: they take the
//! absolute start time and return the events in execution order.

use std::time::Duration;

use cloud_sdk::{HeatLevel, StateEvent};
use time::OffsetDateTime;

/// Time from the first to the last pump-toggle event, plus margin.
pub const PUMP_TOGGLE_SPAN: Duration = Duration::from_secs(15);

pub const BURN_IN_DURATION: Duration = Duration::from_secs(60 * 60);

const PUMP_OFF_AFTER: Duration = Duration::from_secs(5);
const PUMP_SECOND_ROUND: Duration = Duration::from_secs(8);

/// Cycles the pump twice at ambient level to clear air from the loop.
pub fn pump_toggle(start: OffsetDateTime) -> Vec<StateEvent> {
    let mut events = Vec::with_capacity(6);
    for round in [start, start + PUMP_SECOND_ROUND] {
        events.push(StateEvent::on(round));
        events.push(StateEvent::temperature(round, HeatLevel::AMBIENT));
        events.push(StateEvent::off(round + PUMP_OFF_AFTER));
    }
    events
}

/// Maximum heat for `heat_leg`, then maximum cooling for `cool_leg`.
pub fn thermal_burst(start: OffsetDateTime, heat_leg: Duration, cool_leg: Duration) -> Vec<StateEvent> {
    let cool_start = start + heat_leg;
    vec![
        StateEvent::on(start),
        StateEvent::temperature(start, HeatLevel::MAX_HEAT),
        StateEvent::off(cool_start),
        StateEvent::on(cool_start),
        StateEvent::temperature(cool_start, HeatLevel::MAX_COOL),
        StateEvent::off(cool_start + cool_leg),
    ]
}

/// One hour at maximum cooling.
pub fn burn_in(start: OffsetDateTime) -> Vec<StateEvent> {
    vec![
        StateEvent::on(start),
        StateEvent::temperature(start, HeatLevel::MAX_COOL),
        StateEvent::off(start + BURN_IN_DURATION),
    ]
}
