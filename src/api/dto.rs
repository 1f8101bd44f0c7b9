use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::models::{EnergyDevice, EnergyReading, ShortCircuit};
use crate::faults::FaultPage;
use crate::ingest::DeviceWithReadings;

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    /// 1-based page number, default 1
    pub page: Option<i64>,
    /// Page size, default 10, maximum 100
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaveSensorDataResponse {
    pub status: String,
    pub message: String,
    pub record_id: Uuid,
    /// Absent for heartbeat payloads, which never touch the device registry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceListResponse {
    pub status: String,
    pub data: Vec<DeviceWithReadingsDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceWithReadingsDto {
    pub id: Uuid,
    pub serial_number: String,
    pub firmware_version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub energy_readings: Vec<EnergyReadingDto>,
}

/// Reading as served to consumers; omits the raw payload blob, which exists
/// for audit rather than for the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct EnergyReadingDto {
    pub id: Uuid,
    pub device_id: Uuid,
    pub alarm_status: String,
    #[schema(value_type = Object)]
    pub switch_status: Value,
    #[schema(value_type = Object)]
    pub current_measurements: Value,
    #[schema(value_type = Object)]
    pub power_measurements: Value,
    #[schema(value_type = Object)]
    pub voltage_measurements: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FaultCreatedResponse {
    pub status: String,
    pub data: FaultDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FaultDto {
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

#[derive(Debug, Serialize, ToSchema)]
pub struct FaultListResponse {
    pub status: String,
    pub data: Vec<FaultDto>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationDto {
    pub page: i64,
    pub per_page: i64,
    pub total_records: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FaultCountResponse {
    pub status: String,
    pub count: i64,
}

impl From<EnergyReading> for EnergyReadingDto {
    fn from(r: EnergyReading) -> Self {
        Self {
            id: r.id,
            device_id: r.device_id,
            alarm_status: r.alarm_status,
            switch_status: r.switch_status,
            current_measurements: r.current_measurements,
            power_measurements: r.power_measurements,
            voltage_measurements: r.voltage_measurements,
            created_at: r.created_at,
        }
    }
}

impl From<DeviceWithReadings> for DeviceWithReadingsDto {
    fn from(d: DeviceWithReadings) -> Self {
        let EnergyDevice {
            id,
            serial_number,
            firmware_version,
            created_at,
            updated_at,
        } = d.device;
        Self {
            id,
            serial_number,
            firmware_version,
            created_at,
            updated_at,
            energy_readings: d.readings.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<ShortCircuit> for FaultDto {
    fn from(f: ShortCircuit) -> Self {
        Self {
            id: f.id,
            control_mac: f.control_mac,
            wifi_mac: f.wifi_mac,
            timestamp: f.timestamp,
            current_active: f.current_active,
            current_duration_seconds: f.current_duration_seconds,
            previous_active: f.previous_active,
            previous_timestamp: f.previous_timestamp,
            previous_duration_seconds: f.previous_duration_seconds,
        }
    }
}

impl From<FaultPage> for FaultListResponse {
    fn from(p: FaultPage) -> Self {
        Self {
            status: "success".to_owned(),
            data: p.records.into_iter().map(Into::into).collect(),
            pagination: PaginationDto {
                page: p.page,
                per_page: p.per_page,
                total_records: p.total_records,
                total_pages: p.total_pages,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn device_id_is_omitted_when_absent() {
        let response = SaveSensorDataResponse {
            status: "success".to_owned(),
            message: "Sensor data saved successfully".to_owned(),
            record_id: Uuid::nil(),
            device_id: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("device_id").is_none());

        let response = SaveSensorDataResponse {
            device_id: Some(Uuid::nil()),
            ..response
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["device_id"], json!(Uuid::nil().to_string()));
    }

    #[test]
    fn fault_dto_serializes_null_previous_fields() {
        let dto = FaultDto {
            id: 1,
            control_mac: Some("AA:BB:CC:DD:EE:FF".to_owned()),
            wifi_mac: None,
            timestamp: chrono::Utc::now(),
            current_active: true,
            current_duration_seconds: 5,
            previous_active: None,
            previous_timestamp: None,
            previous_duration_seconds: None,
        };
        let value = serde_json::to_value(&dto).unwrap();
        assert_eq!(value["previous_active"], json!(null));
        assert_eq!(value["previous_timestamp"], json!(null));
        assert_eq!(value["previous_duration_seconds"], json!(null));
    }
}
