use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EnergyDevice {
    pub id: Uuid,
    pub serial_number: String,
    pub firmware_version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EnergyReading {
    pub id: Uuid,
    pub device_id: Uuid,
    /// normal, warning, critical or unknown
    pub alarm_status: String,
    /// Per-phase switch map, e.g. {"L1": false, "L2": false, "L3": false, "N": false}
    pub switch_status: Value,
    pub current_measurements: Value,
    pub power_measurements: Value,
    pub voltage_measurements: Value,
    /// Original payload, kept verbatim even when sub-records failed to parse
    pub raw_data: Value,
    pub created_at: DateTime<Utc>,
}

/// Liveness report. Not related to `EnergyDevice`; the serial number is a
/// plain string copied from the payload.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeviceAlive {
    pub id: Uuid,
    pub device_name: String,
    pub mac_address: String,
    pub serial_number: String,
    /// Seconds the device stayed in its last reported state
    pub state_duration: i32,
    pub timestamp: DateTime<Utc>,
}

/// Short-circuit event. The sequence id doubles as the pagination tie-breaker
/// for rows with identical timestamps.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ShortCircuit {
    pub id: i64,
    pub control_mac: Option<String>,
    pub wifi_mac: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub current_active: bool,
    pub current_duration_seconds: i32,
    pub previous_active: Option<bool>,
    pub previous_timestamp: Option<DateTime<Utc>>,
    pub previous_duration_seconds: Option<i32>,
}
