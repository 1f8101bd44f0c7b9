use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use utoipa::OpenApi;

use crate::faults::FaultService;
use crate::ingest::{IngestOutcome, IngestService};

use super::dto::{
    DeviceListResponse, DeviceWithReadingsDto, EnergyReadingDto, FaultCountResponse,
    FaultCreatedResponse, FaultDto, FaultListResponse, PageQuery, PaginationDto,
    SaveSensorDataResponse,
};
use super::errors::AppError;

/// Ingest one sensor reading or heartbeat payload, discriminated by shape.
#[utoipa::path(
    post,
    path = "/api/save_sensor_data",
    request_body = Object,
    responses(
        (status = 201, description = "Payload persisted", body = SaveSensorDataResponse),
        (status = 400, description = "Non-JSON body or missing serial number"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "telemetry"
)]
pub async fn save_sensor_data(
    State(pool): State<PgPool>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<SaveSensorDataResponse>), AppError> {
    let Json(payload) =
        payload.map_err(|_| AppError::Validation("Request must be JSON".to_owned()))?;

    let outcome = IngestService::new(pool).ingest(payload).await?;

    let (record_id, device_id) = match outcome {
        IngestOutcome::Reading(reading) => (reading.id, Some(reading.device_id)),
        IngestOutcome::Heartbeat(heartbeat) => (heartbeat.id, None),
    };

    Ok((
        StatusCode::CREATED,
        Json(SaveSensorDataResponse {
            status: "success".to_owned(),
            message: "Sensor data saved successfully".to_owned(),
            record_id,
            device_id,
        }),
    ))
}

/// All devices with their readings nested. Diagnostic endpoint, unpaginated.
#[utoipa::path(
    get,
    path = "/api/sensor_data",
    responses(
        (status = 200, description = "Devices with nested readings", body = DeviceListResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "telemetry"
)]
pub async fn get_sensor_data(
    State(pool): State<PgPool>,
) -> Result<Json<DeviceListResponse>, AppError> {
    let devices = IngestService::new(pool).list_devices_with_readings().await?;

    Ok(Json(DeviceListResponse {
        status: "success".to_owned(),
        data: devices.into_iter().map(Into::into).collect(),
    }))
}

/// Record a short-circuit event.
#[utoipa::path(
    post,
    path = "/api/short-circuit",
    request_body = Object,
    responses(
        (status = 201, description = "Event recorded", body = FaultCreatedResponse),
        (status = 400, description = "No JSON body or missing control_mac"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "short-circuits"
)]
pub async fn create_short_circuit(
    State(pool): State<PgPool>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(_) => {
            return fault_error_response(AppError::Validation(
                "No JSON data received".to_owned(),
            ))
        }
    };

    if payload.get("control_mac").is_none() {
        return fault_error_response(AppError::Validation(
            "The control_mac field is required".to_owned(),
        ));
    }

    match FaultService::new(pool).record_fault(payload).await {
        Ok(fault) => (
            StatusCode::CREATED,
            Json(FaultCreatedResponse {
                status: "success".to_owned(),
                data: FaultDto::from(fault),
            }),
        )
            .into_response(),
        Err(err) => fault_error_response(err),
    }
}

/// Paginated fault listing, most recent first.
#[utoipa::path(
    get,
    path = "/api/short-circuits",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of fault events", body = FaultListResponse),
        (status = 400, description = "Out-of-range pagination parameters"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "short-circuits"
)]
pub async fn get_short_circuits(
    State(pool): State<PgPool>,
    Query(query): Query<PageQuery>,
) -> Response {
    let (page, per_page) = match validate_pagination(&query) {
        Ok(window) => window,
        Err(err) => return fault_error_response(err),
    };

    match FaultService::new(pool).list_faults(page, per_page).await {
        Ok(page) => Json(FaultListResponse::from(page)).into_response(),
        Err(err) => fault_error_response(err),
    }
}

/// Total number of recorded fault events.
#[utoipa::path(
    get,
    path = "/api/short-circuits/count",
    responses(
        (status = 200, description = "Total fault count", body = FaultCountResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "short-circuits"
)]
pub async fn get_short_circuits_count(State(pool): State<PgPool>) -> Response {
    match FaultService::new(pool).count_faults().await {
        Ok(count) => Json(FaultCountResponse {
            status: "success".to_owned(),
            count,
        })
        .into_response(),
        Err(err) => fault_error_response(err),
    }
}

/// Strict pagination policy for the machine-facing API: out-of-range values
/// are rejected. The admin dashboard clamps instead (see `admin`).
fn validate_pagination(query: &PageQuery) -> Result<(i64, i64), AppError> {
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(10);

    if page < 1 {
        return Err(AppError::Validation(
            "page must be greater than or equal to 1".to_owned(),
        ));
    }
    if !(1..=100).contains(&per_page) {
        return Err(AppError::Validation(
            "per_page must be between 1 and 100".to_owned(),
        ));
    }

    Ok((page, per_page))
}

/// Error body for the short-circuit endpoints, which report the message under
/// an `error` key rather than `message`.
fn fault_error_response(err: AppError) -> Response {
    err.log_server_detail();
    let body = Json(json!({
        "status": "error",
        "error": err.public_message(),
    }));
    (err.status_code(), body).into_response()
}

// ---------------------------------------------------------------------------
// OpenAPI spec struct (used in api/mod.rs)
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        save_sensor_data,
        get_sensor_data,
        create_short_circuit,
        get_short_circuits,
        get_short_circuits_count,
    ),
    components(schemas(
        SaveSensorDataResponse,
        DeviceListResponse,
        DeviceWithReadingsDto,
        EnergyReadingDto,
        FaultCreatedResponse,
        FaultDto,
        FaultListResponse,
        PaginationDto,
        FaultCountResponse,
    )),
    tags(
        (name = "telemetry", description = "Sensor reading and heartbeat ingestion"),
        (name = "short-circuits", description = "Short-circuit event recording and queries"),
    ),
    info(
        title = "Energy Telemetry Backend API",
        version = "0.1.0",
        description = "REST API for energy device telemetry"
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<i64>, per_page: Option<i64>) -> PageQuery {
        PageQuery { page, per_page }
    }

    #[test]
    fn absent_params_default_to_first_page_of_ten() {
        assert_eq!(validate_pagination(&query(None, None)).unwrap(), (1, 10));
    }

    #[test]
    fn in_range_params_pass_through() {
        assert_eq!(
            validate_pagination(&query(Some(3), Some(100))).unwrap(),
            (3, 100)
        );
    }

    #[test]
    fn page_below_one_is_rejected() {
        assert!(validate_pagination(&query(Some(0), None)).is_err());
        assert!(validate_pagination(&query(Some(-5), None)).is_err());
    }

    #[test]
    fn per_page_outside_bounds_is_rejected() {
        assert!(validate_pagination(&query(None, Some(0))).is_err());
        assert!(validate_pagination(&query(None, Some(101))).is_err());
    }
}
