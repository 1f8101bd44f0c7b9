use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or incomplete client input. Always a 400.
    #[error("{0}")]
    Validation(String),

    /// Store-level failure. Detail is logged server-side; clients get a
    /// generic message.
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    /// Anything else that escaped the layers below.
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Database(_) => "Database error".to_owned(),
            AppError::Internal(e) => e.to_string(),
        }
    }

    pub(crate) fn log_server_detail(&self) {
        match self {
            AppError::Validation(msg) => tracing::warn!(error = %msg, "Validation error"),
            AppError::Database(e) => tracing::error!(error = %e, "Database error"),
            AppError::Internal(e) => tracing::error!(error = %e, "Unexpected error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log_server_detail();
        let body = Json(json!({
            "status": "error",
            "message": self.public_message(),
        }));
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = AppError::Validation("missing serial number".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "missing serial number");
    }

    #[test]
    fn database_detail_is_not_exposed() {
        let err = AppError::Database(sqlx::Error::PoolClosed);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Database error");
    }
}
