//! Visitors repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{Gender, NewVisitor, Recipient, SourceCount, Visitor, VisitorStats},
};

use super::escape_like;

#[async_trait]
pub trait VisitorStore: Send + Sync {
    async fn get_by_telegram_id(&self, telegram_id: i64) -> AppResult<Option<Visitor>>;

    /// Lookup by internal record id
    async fn get_by_id(&self, id: i64) -> AppResult<Option<Visitor>>;

    /// Case-insensitive exact handle match, without the leading `@`
    async fn get_by_username(&self, username: &str) -> AppResult<Option<Visitor>>;

    async fn get_by_phone(&self, phone: &str) -> AppResult<Option<Visitor>>;

    async fn exists(&self, telegram_id: i64) -> AppResult<bool>;

    /// Insert a visitor; `Conflict` if the chat identity is already registered
    async fn create(&self, data: &NewVisitor) -> AppResult<Visitor>;

    async fn set_gender(&self, telegram_id: i64, gender: Gender) -> AppResult<()>;

    /// Substring search on phone, handle and name
    async fn search(&self, query: &str, limit: i64) -> AppResult<Vec<Visitor>>;

    async fn list(&self) -> AppResult<Vec<Visitor>>;

    async fn recipients(&self, gender: Option<Gender>) -> AppResult<Vec<Recipient>>;

    /// Totals, visitors marked present in `[day_start, day_end)`, counts per source
    async fn stats(&self, day_start: DateTime<Utc>, day_end: DateTime<Utc>) -> AppResult<VisitorStats>;
}

#[derive(Clone)]
pub struct VisitorsRepository {
    pool: Pool<Postgres>,
}

impl VisitorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VisitorStore for VisitorsRepository {
    async fn get_by_telegram_id(&self, telegram_id: i64) -> AppResult<Option<Visitor>> {
        let visitor = sqlx::query_as::<_, Visitor>("SELECT * FROM visitors WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(visitor)
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Option<Visitor>> {
        let visitor = sqlx::query_as::<_, Visitor>("SELECT * FROM visitors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(visitor)
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<Visitor>> {
        let visitor = sqlx::query_as::<_, Visitor>(
            "SELECT * FROM visitors WHERE LOWER(username) = LOWER($1) ORDER BY id LIMIT 1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(visitor)
    }

    async fn get_by_phone(&self, phone: &str) -> AppResult<Option<Visitor>> {
        let visitor = sqlx::query_as::<_, Visitor>(
            "SELECT * FROM visitors WHERE phone = $1 ORDER BY id LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(visitor)
    }

    async fn exists(&self, telegram_id: i64) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM visitors WHERE telegram_id = $1)")
                .bind(telegram_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create(&self, data: &NewVisitor) -> AppResult<Visitor> {
        sqlx::query_as::<_, Visitor>(
            r#"
            INSERT INTO visitors (telegram_id, first_name, username, phone, source, profile_photo)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (telegram_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(data.telegram_id)
        .bind(&data.first_name)
        .bind(&data.username)
        .bind(&data.phone)
        .bind(&data.source)
        .bind(&data.profile_photo)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Conflict("You are already registered.".to_string()))
    }

    async fn set_gender(&self, telegram_id: i64, gender: Gender) -> AppResult<()> {
        let result = sqlx::query("UPDATE visitors SET gender = $1 WHERE telegram_id = $2")
            .bind(gender)
            .bind(telegram_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Visitor not found".to_string()));
        }
        Ok(())
    }

    async fn search(&self, query: &str, limit: i64) -> AppResult<Vec<Visitor>> {
        let pattern = format!("%{}%", escape_like(query));
        let rows = sqlx::query_as::<_, Visitor>(
            r#"
            SELECT * FROM visitors
            WHERE phone ILIKE $1 OR username ILIKE $1 OR first_name ILIKE $1
            ORDER BY registered_at DESC
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list(&self) -> AppResult<Vec<Visitor>> {
        let rows = sqlx::query_as::<_, Visitor>("SELECT * FROM visitors ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn recipients(&self, gender: Option<Gender>) -> AppResult<Vec<Recipient>> {
        let rows = sqlx::query_as::<_, Recipient>(
            r#"
            SELECT telegram_id, first_name FROM visitors
            WHERE $1::text IS NULL OR gender = $1
            ORDER BY id
            "#,
        )
        .bind(gender)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn stats(&self, day_start: DateTime<Utc>, day_end: DateTime<Utc>) -> AppResult<VisitorStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*)::bigint FROM visitors")
            .fetch_one(&self.pool)
            .await?;

        let attended_today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::bigint FROM visitors WHERE attended_date >= $1 AND attended_date < $2",
        )
        .bind(day_start)
        .bind(day_end)
        .fetch_one(&self.pool)
        .await?;

        let by_source = sqlx::query_as::<_, SourceCount>(
            r#"
            SELECT source, COUNT(*)::bigint AS count
            FROM visitors
            GROUP BY source
            ORDER BY count DESC, source
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(VisitorStats {
            total,
            attended_today,
            by_source,
        })
    }
}
