use chrono::{DateTime, ParseError, Utc};
use serde::Deserialize;

use crate::util::parse_flexible_timestamp;

/// Wire shape of a short-circuit report. `short_circuit.current` is
/// conceptually always present; a missing sub-object decodes to the
/// defaults. `short_circuit.previous` may be absent or null entirely.
#[derive(Debug, Deserialize)]
pub struct FaultPayload {
    pub control_mac: Option<String>,
    pub wifi_mac: Option<String>,
    pub timestamp: Option<String>,
    #[serde(default)]
    pub short_circuit: ShortCircuitBlock,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShortCircuitBlock {
    #[serde(default)]
    pub current: FaultState,
    pub previous: Option<PreviousFaultState>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FaultState {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub duration_seconds: i32,
}

#[derive(Debug, Deserialize)]
pub struct PreviousFaultState {
    #[serde(default)]
    pub active: bool,
    pub timestamp: Option<String>,
    #[serde(default)]
    pub duration_seconds: i32,
}

/// A fault event ready for insertion, timestamps parsed. The three
/// previous_* fields are all set or all unset, never a mix.
#[derive(Debug)]
pub struct NewFault {
    pub control_mac: Option<String>,
    pub wifi_mac: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub current_active: bool,
    pub current_duration_seconds: i32,
    pub previous_active: Option<bool>,
    pub previous_timestamp: Option<DateTime<Utc>>,
    pub previous_duration_seconds: Option<i32>,
}

impl FaultPayload {
    /// Converts wire timestamps, defaulting the event timestamp to `now`.
    pub fn resolve(self, now: DateTime<Utc>) -> Result<NewFault, ParseError> {
        let timestamp = match self.timestamp.as_deref() {
            Some(s) => parse_flexible_timestamp(s)?,
            None => now,
        };

        let current = self.short_circuit.current;
        let (previous_active, previous_timestamp, previous_duration_seconds) =
            match self.short_circuit.previous {
                Some(previous) => {
                    let previous_timestamp = match previous.timestamp.as_deref() {
                        Some(s) => Some(parse_flexible_timestamp(s)?),
                        None => None,
                    };
                    (
                        Some(previous.active),
                        previous_timestamp,
                        Some(previous.duration_seconds),
                    )
                }
                None => (None, None, None),
            };

        Ok(NewFault {
            control_mac: self.control_mac,
            wifi_mac: self.wifi_mac,
            timestamp,
            current_active: current.active,
            current_duration_seconds: current.duration_seconds,
            previous_active,
            previous_timestamp,
            previous_duration_seconds,
        })
    }
}
