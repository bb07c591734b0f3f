//! Source keys repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::SourceKey};

#[async_trait]
pub trait SourceKeyStore: Send + Sync {
    async fn list(&self) -> AppResult<Vec<SourceKey>>;

    /// Keys in issue order, used as location labels
    async fn labels(&self) -> AppResult<Vec<String>>;

    /// Log a key; an already-issued key is returned unchanged
    async fn create(&self, key: &str, created_by: i64) -> AppResult<SourceKey>;
}

#[derive(Clone)]
pub struct SourceKeysRepository {
    pool: Pool<Postgres>,
}

impl SourceKeysRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceKeyStore for SourceKeysRepository {
    async fn list(&self) -> AppResult<Vec<SourceKey>> {
        let rows = sqlx::query_as::<_, SourceKey>("SELECT * FROM source_keys ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn labels(&self) -> AppResult<Vec<String>> {
        let rows: Vec<String> = sqlx::query_scalar("SELECT key FROM source_keys ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create(&self, key: &str, created_by: i64) -> AppResult<SourceKey> {
        let inserted = sqlx::query_as::<_, SourceKey>(
            r#"
            INSERT INTO source_keys (key, created_by)
            VALUES ($1, $2)
            ON CONFLICT (key) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(key)
        .bind(created_by)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok(row),
            None => {
                let existing = sqlx::query_as::<_, SourceKey>("SELECT * FROM source_keys WHERE key = $1")
                    .bind(key)
                    .fetch_one(&self.pool)
                    .await?;
                Ok(existing)
            }
        }
    }
}
