use std::collections::HashMap;

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::api::errors::AppError;
use crate::db::models::{DeviceAlive, EnergyDevice, EnergyReading};

use super::payload::{HeartbeatPayload, IngestPayload, SensorPayload};

/// Outcome of one ingestion: either a reading tied to a registered device, or
/// a standalone heartbeat row.
#[derive(Debug)]
pub enum IngestOutcome {
    Reading(EnergyReading),
    Heartbeat(DeviceAlive),
}

#[derive(Debug)]
pub struct DeviceWithReadings {
    pub device: EnergyDevice,
    pub readings: Vec<EnergyReading>,
}

#[derive(Clone)]
pub struct IngestService {
    pool: PgPool,
}

impl IngestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persists one classified payload. Sensor readings and the device row
    /// they may create commit in a single transaction; heartbeats are a
    /// single insert with no registry interaction.
    pub async fn ingest(&self, payload: serde_json::Value) -> Result<IngestOutcome, AppError> {
        match IngestPayload::classify(payload)? {
            IngestPayload::Heartbeat(heartbeat) => self
                .save_heartbeat(heartbeat)
                .await
                .map(IngestOutcome::Heartbeat),
            IngestPayload::Sensor(sensor) => self
                .save_sensor_reading(sensor)
                .await
                .map(IngestOutcome::Reading),
        }
    }

    async fn save_sensor_reading(&self, sensor: SensorPayload) -> Result<EnergyReading, AppError> {
        let mut tx = self.pool.begin().await?;

        let device =
            ensure_device(&mut tx, &sensor.serial_number, &sensor.firmware_version).await?;

        let reading = sqlx::query_as::<_, EnergyReading>(
            r#"
            INSERT INTO energy_readings
                (id, device_id, alarm_status, switch_status, current_measurements,
                 power_measurements, voltage_measurements, raw_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(device.id)
        .bind(&sensor.alarm_status)
        .bind(&sensor.switch_status)
        .bind(&sensor.current_measurements)
        .bind(&sensor.power_measurements)
        .bind(&sensor.voltage_measurements)
        .bind(&sensor.raw)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            serial_number = %sensor.serial_number,
            reading_id = %reading.id,
            "Sensor reading persisted"
        );
        Ok(reading)
    }

    async fn save_heartbeat(&self, heartbeat: HeartbeatPayload) -> Result<DeviceAlive, AppError> {
        let timestamp = heartbeat.resolve_timestamp(Utc::now())?;

        let row = sqlx::query_as::<_, DeviceAlive>(
            r#"
            INSERT INTO device_alive
                (id, device_name, mac_address, serial_number, state_duration, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&heartbeat.device_name)
        .bind(&heartbeat.mac_address)
        .bind(&heartbeat.serial_number)
        .bind(heartbeat.state_duration)
        .bind(timestamp)
        .fetch_one(&self.pool)
        .await?;

        info!(serial_number = %row.serial_number, "Heartbeat persisted");
        Ok(row)
    }

    /// Full scan for the diagnostic endpoint: every device with all of its
    /// readings, fetched in two queries instead of one per device. Unpaginated
    /// on purpose; this does not scale past diagnostic use.
    pub async fn list_devices_with_readings(&self) -> Result<Vec<DeviceWithReadings>, AppError> {
        let devices = sqlx::query_as::<_, EnergyDevice>(
            "SELECT * FROM energy_devices ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let readings = sqlx::query_as::<_, EnergyReading>(
            "SELECT * FROM energy_readings ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_device: HashMap<Uuid, Vec<EnergyReading>> = HashMap::new();
        for reading in readings {
            by_device.entry(reading.device_id).or_default().push(reading);
        }

        Ok(devices
            .into_iter()
            .map(|device| {
                let readings = by_device.remove(&device.id).unwrap_or_default();
                DeviceWithReadings { device, readings }
            })
            .collect())
    }
}

/// Find-or-create by serial number, inside the caller's transaction so the
/// new device id is usable before commit. The unique constraint on
/// serial_number arbitrates concurrent registrations: the insert is
/// ON CONFLICT DO NOTHING and the loser falls back to a lookup of the row the
/// winner committed. An existing device is returned unchanged; in particular
/// its firmware_version is not updated from the payload.
async fn ensure_device(
    tx: &mut Transaction<'_, Postgres>,
    serial_number: &str,
    firmware_version: &str,
) -> Result<EnergyDevice, AppError> {
    if let Some(device) =
        sqlx::query_as::<_, EnergyDevice>("SELECT * FROM energy_devices WHERE serial_number = $1")
            .bind(serial_number)
            .fetch_optional(&mut **tx)
            .await?
    {
        return Ok(device);
    }

    if let Some(device) = sqlx::query_as::<_, EnergyDevice>(
        r#"
        INSERT INTO energy_devices (id, serial_number, firmware_version)
        VALUES ($1, $2, $3)
        ON CONFLICT (serial_number) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(serial_number)
    .bind(firmware_version)
    .fetch_optional(&mut **tx)
    .await?
    {
        info!(serial_number = %serial_number, device_id = %device.id, "Registered new device");
        return Ok(device);
    }

    // A concurrent registration won the insert; its row is committed and
    // visible by now.
    sqlx::query_as::<_, EnergyDevice>("SELECT * FROM energy_devices WHERE serial_number = $1")
        .bind(serial_number)
        .fetch_one(&mut **tx)
        .await
        .map_err(Into::into)
}
