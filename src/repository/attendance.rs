//! Attendance repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{AttendanceEvent, AttendanceExportRow, CashierTally},
};

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Append an event and flag the visitor present, in one transaction.
    /// `NotFound` (and nothing written) if the visitor does not exist.
    async fn record(
        &self,
        visitor_telegram_id: i64,
        location: &str,
        marked_by: i64,
        marked_at: DateTime<Utc>,
    ) -> AppResult<AttendanceEvent>;

    /// Every event, newest first, joined with visitor and staff details
    async fn list_export(&self) -> AppResult<Vec<AttendanceExportRow>>;

    /// Event counts per marking staff member in `[start, end)`, largest first
    async fn tallies_by_staff(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Vec<CashierTally>>;
}

#[derive(Clone)]
pub struct AttendanceRepository {
    pool: Pool<Postgres>,
}

impl AttendanceRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for AttendanceRepository {
    async fn record(
        &self,
        visitor_telegram_id: i64,
        location: &str,
        marked_by: i64,
        marked_at: DateTime<Utc>,
    ) -> AppResult<AttendanceEvent> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE visitors SET attended = TRUE, attended_date = $1 WHERE telegram_id = $2",
        )
        .bind(marked_at)
        .bind(visitor_telegram_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // dropping the transaction rolls it back
            return Err(AppError::NotFound("Visitor not found".to_string()));
        }

        let event = sqlx::query_as::<_, AttendanceEvent>(
            r#"
            INSERT INTO attendance_events (visitor_telegram_id, location, marked_by, marked_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(visitor_telegram_id)
        .bind(location)
        .bind(marked_by)
        .bind(marked_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(event)
    }

    async fn list_export(&self) -> AppResult<Vec<AttendanceExportRow>> {
        let rows = sqlx::query_as::<_, AttendanceExportRow>(
            r#"
            SELECT a.id, a.marked_at, a.location, a.visitor_telegram_id,
                   v.first_name, v.phone, a.marked_by, s.full_name AS staff_name
            FROM attendance_events a
            LEFT JOIN visitors v ON v.telegram_id = a.visitor_telegram_id
            LEFT JOIN staff s ON s.telegram_id = a.marked_by
            ORDER BY a.marked_at DESC, a.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn tallies_by_staff(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Vec<CashierTally>> {
        let rows = sqlx::query_as::<_, CashierTally>(
            r#"
            SELECT a.marked_by AS staff_id, s.full_name, s.location, COUNT(*)::bigint AS total
            FROM attendance_events a
            LEFT JOIN staff s ON s.telegram_id = a.marked_by
            WHERE a.marked_at >= $1 AND a.marked_at < $2
            GROUP BY a.marked_by, s.full_name, s.location
            ORDER BY total DESC, staff_id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
