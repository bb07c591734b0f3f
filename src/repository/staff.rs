//! Staff repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{NewStaffMember, StaffMember},
};

#[async_trait]
pub trait StaffStore: Send + Sync {
    async fn get(&self, telegram_id: i64) -> AppResult<Option<StaffMember>>;

    async fn list(&self) -> AppResult<Vec<StaffMember>>;

    /// Insert a staff record; `Conflict` if the identity already holds a role
    async fn create(&self, data: &NewStaffMember) -> AppResult<StaffMember>;

    async fn delete(&self, telegram_id: i64) -> AppResult<()>;
}

#[derive(Clone)]
pub struct StaffRepository {
    pool: Pool<Postgres>,
}

impl StaffRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StaffStore for StaffRepository {
    async fn get(&self, telegram_id: i64) -> AppResult<Option<StaffMember>> {
        let staff = sqlx::query_as::<_, StaffMember>("SELECT * FROM staff WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(staff)
    }

    async fn list(&self) -> AppResult<Vec<StaffMember>> {
        let rows = sqlx::query_as::<_, StaffMember>("SELECT * FROM staff ORDER BY added_at, telegram_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create(&self, data: &NewStaffMember) -> AppResult<StaffMember> {
        sqlx::query_as::<_, StaffMember>(
            r#"
            INSERT INTO staff (telegram_id, role, full_name, location, added_by)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (telegram_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(data.telegram_id)
        .bind(data.role)
        .bind(&data.full_name)
        .bind(&data.location)
        .bind(data.added_by)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Conflict(format!("{} is already a staff member.", data.telegram_id)))
    }

    async fn delete(&self, telegram_id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM staff WHERE telegram_id = $1")
            .bind(telegram_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Staff member {} not found", telegram_id)));
        }
        Ok(())
    }
}
