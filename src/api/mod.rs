pub mod admin;
pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

pub fn router(pool: PgPool) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/api/save_sensor_data", post(handlers::save_sensor_data))
        .route("/api/sensor_data", get(handlers::get_sensor_data))
        .route("/api/short-circuit", post(handlers::create_short_circuit))
        .route("/api/short-circuits", get(handlers::get_short_circuits))
        .route(
            "/api/short-circuits/count",
            get(handlers::get_short_circuits_count),
        )
        .with_state(pool.clone())
        .split_for_parts();

    let admin = Router::new()
        .route("/admin/short-circuits", get(admin::short_circuits_dashboard))
        .with_state(pool);

    router.merge(admin).route(
        "/api-docs/openapi.json",
        get(move || async move { axum::Json(api) }),
    )
}
