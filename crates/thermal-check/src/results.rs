use std::collections::BTreeMap;

use crate::evaluate::TestOutcome;

/// Outcome per device serial for one test session. The caller owns it and
/// decides how long it lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResults {
    outcomes: BTreeMap<String, TestOutcome>,
}

impl RunResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `outcome`, replacing any earlier result for `serial`.
    pub fn record(&mut self, serial: impl Into<String>, outcome: TestOutcome) {
        self.outcomes.insert(serial.into(), outcome);
    }

    pub fn get(&self, serial: &str) -> Option<TestOutcome> {
        self.outcomes.get(serial).copied()
    }

    pub fn passed(&self, serial: &str) -> bool {
        self.get(serial).is_some_and(TestOutcome::is_pass)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TestOutcome)> {
        self.outcomes
            .iter()
            .map(|(serial, outcome)| (serial.as_str(), *outcome))
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
