use anyhow::anyhow;
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use crate::api::errors::AppError;
use crate::db::models::ShortCircuit;

/// One window of the fault listing, shared by the JSON API and the admin
/// dashboard. Both call [`FaultService::list_faults`]; only their parameter
/// policies differ (reject vs. clamp) and those live at the boundary.
#[derive(Debug)]
pub struct FaultPage {
    pub records: Vec<ShortCircuit>,
    pub page: i64,
    pub per_page: i64,
    pub total_records: i64,
    pub total_pages: i64,
}

impl FaultPage {
    /// `per_page` must be >= 1; boundary adapters guarantee this.
    pub fn new(records: Vec<ShortCircuit>, page: i64, per_page: i64, total_records: i64) -> Self {
        let total_pages = (total_records as u64).div_ceil(per_page as u64) as i64;
        Self {
            records,
            page,
            per_page,
            total_records,
            total_pages,
        }
    }
}

#[derive(Clone)]
pub struct FaultService {
    pool: PgPool,
}

impl FaultService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records one short-circuit event. Parse and persistence failures are
    /// returned as values, never panics; a failed insert leaves no partial
    /// state behind.
    pub async fn record_fault(
        &self,
        payload: serde_json::Value,
    ) -> Result<ShortCircuit, AppError> {
        let payload: super::FaultPayload = serde_json::from_value(payload)
            .map_err(|e| AppError::Internal(anyhow!("invalid short-circuit payload: {e}")))?;
        let fault = payload
            .resolve(Utc::now())
            .map_err(|e| AppError::Internal(anyhow!("invalid timestamp: {e}")))?;

        let row = sqlx::query_as::<_, ShortCircuit>(
            r#"
            INSERT INTO short_circuits
                (control_mac, wifi_mac, timestamp, current_active,
                 current_duration_seconds, previous_active, previous_timestamp,
                 previous_duration_seconds)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&fault.control_mac)
        .bind(&fault.wifi_mac)
        .bind(fault.timestamp)
        .bind(fault.current_active)
        .bind(fault.current_duration_seconds)
        .bind(fault.previous_active)
        .bind(fault.previous_timestamp)
        .bind(fault.previous_duration_seconds)
        .fetch_one(&self.pool)
        .await?;

        info!(id = row.id, active = row.current_active, "Short-circuit event recorded");
        Ok(row)
    }

    /// Most recent events first; the sequence id breaks timestamp ties so
    /// page boundaries are deterministic.
    pub async fn list_faults(&self, page: i64, per_page: i64) -> Result<FaultPage, AppError> {
        let offset = (page - 1) * per_page;

        let total_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM short_circuits")
            .fetch_one(&self.pool)
            .await?;

        let records = sqlx::query_as::<_, ShortCircuit>(
            r#"
            SELECT * FROM short_circuits
            ORDER BY timestamp DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(FaultPage::new(records, page, per_page, total_records))
    }

    pub async fn count_faults(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM short_circuits")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(FaultPage::new(vec![], 1, 10, 0).total_pages, 0);
        assert_eq!(FaultPage::new(vec![], 1, 10, 1).total_pages, 1);
        assert_eq!(FaultPage::new(vec![], 1, 10, 10).total_pages, 1);
        assert_eq!(FaultPage::new(vec![], 1, 10, 11).total_pages, 2);
        assert_eq!(FaultPage::new(vec![], 1, 100, 250).total_pages, 3);
    }
}
