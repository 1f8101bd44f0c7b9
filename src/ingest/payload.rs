use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::api::errors::AppError;
use crate::util::parse_flexible_timestamp;

/// An inbound telemetry payload, classified by shape before any business
/// logic runs. A top-level `serial_number` key marks a heartbeat; everything
/// else is treated as a sensor reading carrying `stm32_details`.
#[derive(Debug)]
pub enum IngestPayload {
    Heartbeat(HeartbeatPayload),
    Sensor(SensorPayload),
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatPayload {
    pub serial_number: String,
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default = "default_mac_address")]
    pub mac_address: String,
    #[serde(default)]
    pub state_duration: i32,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HeartbeatPayload {
    /// Reported timestamp, falling back to processing time when absent.
    pub fn resolve_timestamp(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
        match self.timestamp.as_deref() {
            Some(s) => parse_flexible_timestamp(s)
                .map_err(|e| AppError::Validation(format!("invalid timestamp '{s}': {e}"))),
            None => Ok(now),
        }
    }
}

fn default_device_name() -> String {
    "Unknown Device".to_owned()
}

fn default_mac_address() -> String {
    "00:00:00:00:00:00".to_owned()
}

/// A sensor reading with its sub-records already extracted. Missing
/// sub-objects default to empty maps; the original payload is always kept in
/// `raw` so a partial extraction never loses data.
#[derive(Debug)]
pub struct SensorPayload {
    pub serial_number: String,
    pub firmware_version: String,
    pub alarm_status: String,
    pub switch_status: Value,
    pub current_measurements: Value,
    pub power_measurements: Value,
    pub voltage_measurements: Value,
    pub raw: Value,
}

impl IngestPayload {
    pub fn classify(payload: Value) -> Result<Self, AppError> {
        if payload.get("serial_number").is_some() {
            let heartbeat: HeartbeatPayload = serde_json::from_value(payload)
                .map_err(|e| AppError::Validation(format!("invalid heartbeat payload: {e}")))?;
            return Ok(IngestPayload::Heartbeat(heartbeat));
        }

        let serial_number = payload
            .pointer("/stm32_details/serial_number")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AppError::Validation("payload does not contain 'serial_number'".to_owned())
            })?
            .to_owned();

        let firmware_version = payload
            .pointer("/stm32_details/firmware_version")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_owned();

        let alarm_status = payload
            .pointer("/alarm_status/status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_owned();

        Ok(IngestPayload::Sensor(SensorPayload {
            serial_number,
            firmware_version,
            alarm_status,
            switch_status: object_or_empty(&payload, "ln_switch_status"),
            current_measurements: object_or_empty(&payload, "currents"),
            power_measurements: object_or_empty(&payload, "measurements"),
            voltage_measurements: object_or_empty(&payload, "voltages"),
            raw: payload,
        }))
    }
}

/// One entry of the defaults table: a top-level sub-record, or `{}` when the
/// key is missing or not an object.
fn object_or_empty(payload: &Value, key: &str) -> Value {
    payload
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .map(Value::Object)
        .unwrap_or_else(|| Value::Object(Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn top_level_serial_number_classifies_as_heartbeat() {
        let payload = json!({
            "serial_number": "SN-42",
            "device_name": "Breaker 3",
            "mac_address": "AA:BB:CC:DD:EE:FF",
            "state_duration": 120,
        });

        match IngestPayload::classify(payload).unwrap() {
            IngestPayload::Heartbeat(hb) => {
                assert_eq!(hb.serial_number, "SN-42");
                assert_eq!(hb.device_name, "Breaker 3");
                assert_eq!(hb.mac_address, "AA:BB:CC:DD:EE:FF");
                assert_eq!(hb.state_duration, 120);
            }
            other => panic!("expected heartbeat, got {other:?}"),
        }
    }

    #[test]
    fn heartbeat_fields_default_when_missing() {
        let payload = json!({ "serial_number": "SN-42" });

        match IngestPayload::classify(payload).unwrap() {
            IngestPayload::Heartbeat(hb) => {
                assert_eq!(hb.device_name, "Unknown Device");
                assert_eq!(hb.mac_address, "00:00:00:00:00:00");
                assert_eq!(hb.state_duration, 0);
                assert!(hb.timestamp.is_none());
            }
            other => panic!("expected heartbeat, got {other:?}"),
        }
    }

    #[test]
    fn heartbeat_timestamp_falls_back_to_processing_time() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let hb = HeartbeatPayload {
            serial_number: "SN-42".into(),
            device_name: "x".into(),
            mac_address: "y".into(),
            state_duration: 0,
            timestamp: None,
        };
        assert_eq!(hb.resolve_timestamp(now).unwrap(), now);

        let hb = HeartbeatPayload {
            timestamp: Some("2024-01-02T03:04:05Z".into()),
            ..hb
        };
        assert_eq!(
            hb.resolve_timestamp(now).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
        );
    }

    #[test]
    fn nested_serial_number_classifies_as_sensor_reading() {
        let payload = json!({
            "stm32_details": { "serial_number": "SN1", "firmware_version": "1.0" },
            "alarm_status": { "status": "warning" },
            "ln_switch_status": { "L1": false, "L2": false, "L3": false, "N": false },
            "currents": { "leakage": 121.24, "L1": 0 },
            "measurements": { "cos_fi": 0, "active_power_w": 0 },
            "voltages": { "L1": 230.1 },
        });

        match IngestPayload::classify(payload.clone()).unwrap() {
            IngestPayload::Sensor(s) => {
                assert_eq!(s.serial_number, "SN1");
                assert_eq!(s.firmware_version, "1.0");
                assert_eq!(s.alarm_status, "warning");
                assert_eq!(s.switch_status, payload["ln_switch_status"]);
                assert_eq!(s.current_measurements, payload["currents"]);
                assert_eq!(s.power_measurements, payload["measurements"]);
                assert_eq!(s.voltage_measurements, payload["voltages"]);
                assert_eq!(s.raw, payload);
            }
            other => panic!("expected sensor reading, got {other:?}"),
        }
    }

    #[test]
    fn sensor_sub_records_default_to_empty_objects() {
        let payload = json!({
            "stm32_details": { "serial_number": "SN1" },
        });

        match IngestPayload::classify(payload.clone()).unwrap() {
            IngestPayload::Sensor(s) => {
                assert_eq!(s.firmware_version, "unknown");
                assert_eq!(s.alarm_status, "unknown");
                assert_eq!(s.switch_status, json!({}));
                assert_eq!(s.current_measurements, json!({}));
                assert_eq!(s.power_measurements, json!({}));
                assert_eq!(s.voltage_measurements, json!({}));
                assert_eq!(s.raw, payload);
            }
            other => panic!("expected sensor reading, got {other:?}"),
        }
    }

    #[test]
    fn malformed_sub_record_still_defaults_and_keeps_raw() {
        let payload = json!({
            "stm32_details": { "serial_number": "SN1" },
            "currents": "not-an-object",
        });

        match IngestPayload::classify(payload.clone()).unwrap() {
            IngestPayload::Sensor(s) => {
                assert_eq!(s.current_measurements, json!({}));
                assert_eq!(s.raw["currents"], json!("not-an-object"));
            }
            other => panic!("expected sensor reading, got {other:?}"),
        }
    }

    #[test]
    fn missing_serial_number_is_a_validation_error() {
        let payload = json!({ "stm32_details": { "firmware_version": "1.0" } });
        let err = IngestPayload::classify(payload).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn empty_serial_number_is_a_validation_error() {
        let payload = json!({ "stm32_details": { "serial_number": "" } });
        let err = IngestPayload::classify(payload).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
