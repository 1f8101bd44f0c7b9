pub mod payload;
pub mod service;

pub use payload::{HeartbeatPayload, IngestPayload, SensorPayload};
pub use service::{DeviceWithReadings, IngestOutcome, IngestService};
